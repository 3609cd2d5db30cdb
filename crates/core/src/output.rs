//! Line-oriented output sink for the structural dump.
//!
//! Everything the dumper prints about the container and its streams goes
//! through [`Output`], so a single switch can mute the structural dump while
//! text extraction keeps running.

use crate::Result;
use std::io::Write;

/// Width of the `=` and `-` rules framing each section.
pub const RULE_WIDTH: usize = 68;

/// Bytes rendered on each line of a hex dump.
const BYTES_PER_LINE: usize = 16;

/// Writer wrapper with a mute switch and hex dump helpers.
pub struct Output<'a> {
    writer: &'a mut dyn Write,
    muted: bool,
}

impl<'a> Output<'a> {
    /// Create an unmuted sink writing to `writer`.
    pub fn new(writer: &'a mut dyn Write) -> Self {
        Self {
            writer,
            muted: false,
        }
    }

    /// Set whether output is discarded.
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Write text without a trailing newline.
    pub fn output(&mut self, text: &str) -> Result<()> {
        if !self.muted {
            self.writer.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    /// Write text followed by a newline.
    pub fn outputln(&mut self, text: &str) -> Result<()> {
        if !self.muted {
            self.writer.write_all(text.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write a full-width rule made of `ch`.
    pub fn rule(&mut self, ch: char) -> Result<()> {
        self.outputln(&ch.to_string().repeat(RULE_WIDTH))
    }

    /// Write a section title between an `=` rule and a `-` rule.
    pub fn section(&mut self, title: &str) -> Result<()> {
        self.outputln("")?;
        self.rule('=')?;
        self.outputln(title)?;
        self.rule('-')
    }

    /// Hex dump `bytes`, sixteen to a line, each line labelled with its offset.
    ///
    /// With `sub_divide`, a blank line separates every `sub_divide` bytes.
    pub fn dump_bytes(&mut self, bytes: &[u8], sub_divide: Option<usize>) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let label_width = (bytes.len() - 1).to_string().len();
        let lines_per_block = sub_divide.map(|n| (n / BYTES_PER_LINE).max(1));

        for (line_no, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
            let mut line = format!("{:0width$}: ", line_no * BYTES_PER_LINE, width = label_width);
            for (i, byte) in chunk.iter().enumerate() {
                line.push_str(&format!("{:02X} ", byte));
                if (i + 1) % 4 == 0 {
                    line.push(' ');
                }
            }
            self.outputln(&line)?;

            if chunk.len() == BYTES_PER_LINE {
                if let Some(block) = lines_per_block {
                    if (line_no + 1) % block == 0 {
                        self.outputln("")?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Render a directory entry name for display.
///
/// Control characters (below 0x20, and DEL) are shown as `\xNN` so names
/// such as `\x05DocumentSummaryInformation` stay readable.
pub fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for c in name.chars() {
        if (c as u32) < 0x20 || c == '\u{7F}' {
            encoded.push_str(&format!("\\x{:02X}", c as u32));
        } else {
            encoded.push(c);
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Output) -> Result<()>) -> String {
        let mut buf = Vec::new();
        {
            let mut out = Output::new(&mut buf);
            f(&mut out).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_outputln() {
        let text = render(|out| {
            out.output("a")?;
            out.outputln("b")
        });
        assert_eq!(text, "ab\n");
    }

    #[test]
    fn test_muted_output_writes_nothing() {
        let mut buf = Vec::new();
        {
            let mut out = Output::new(&mut buf).with_muted(true);
            assert!(out.is_muted());
            out.outputln("hidden").unwrap();
            out.dump_bytes(&[1, 2, 3], None).unwrap();
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_section() {
        let text = render(|out| out.section("Header"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "=".repeat(68));
        assert_eq!(lines[2], "Header");
        assert_eq!(lines[3], "-".repeat(68));
    }

    #[test]
    fn test_dump_bytes_layout() {
        let bytes: Vec<u8> = (0..20).collect();
        let text = render(|out| out.dump_bytes(&bytes, None));
        assert_eq!(
            text,
            "00: 00 01 02 03  04 05 06 07  08 09 0A 0B  0C 0D 0E 0F  \n\
             16: 10 11 12 13  \n"
        );
    }

    #[test]
    fn test_dump_bytes_empty() {
        assert_eq!(render(|out| out.dump_bytes(&[], Some(512))), "");
    }

    #[test]
    fn test_dump_bytes_sub_divide() {
        let bytes = vec![0xAB; 1040];
        let text = render(|out| out.dump_bytes(&bytes, Some(512)));
        let lines: Vec<&str> = text.lines().collect();

        // 65 data lines plus a blank line after each full 512-byte block.
        assert_eq!(lines.len(), 67);
        assert_eq!(lines[32], "");
        assert!(lines[33].starts_with("0512: "));
        assert_eq!(lines[65], "");
        assert_eq!(lines[66], "1024: AB AB AB AB  AB AB AB AB  AB AB AB AB  AB AB AB AB  ");
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("Current User"), "Current User");
        assert_eq!(
            encode_name("\u{5}DocumentSummaryInformation"),
            "\\x05DocumentSummaryInformation"
        );
        assert_eq!(encode_name("a\u{7F}b"), "a\\x7Fb");
        assert_eq!(encode_name(""), "");
    }
}
