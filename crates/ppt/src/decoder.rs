//! PowerPoint record stream disassembler.
//!
//! Walks the record tree of a `PowerPoint Document` or `Current User` stream,
//! printing one line per record header. Container records (recVer 0xF) are
//! entered recursively; a handful of well-known atoms have their fields
//! decoded, every other atom is hex dumped.
//!
//! Text atoms are also appended to the session's [`TextAccumulator`], whether
//! or not the text dump was requested.

use crate::records::{record_types, RecordHeader, HEADER_SIZE};
use ppt_dump_core::binary::{read_u16_le, read_u32_le};
use ppt_dump_core::{encode_name, DumpConfig, Error, Output, Result, TextAccumulator};
use std::fmt::Display;

/// Nesting limit for container records.
const MAX_DEPTH: usize = 64;

/// `headerToken` of an unencrypted CurrentUserAtom.
const HEADER_TOKEN_PLAIN: u32 = 0xE391_C05F;

/// `headerToken` of an encrypted CurrentUserAtom.
const HEADER_TOKEN_ENCRYPTED: u32 = 0xF3D1_C4DF;

/// Text types from RT_TextHeaderAtom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextType {
    Title = 0,
    Body = 1,
    Notes = 2,
    NotUsed = 3,
    Other = 4,
    CenterBody = 5,
    CenterTitle = 6,
    HalfBody = 7,
    QuarterBody = 8,
}

impl TextType {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(TextType::Title),
            1 => Some(TextType::Body),
            2 => Some(TextType::Notes),
            3 => Some(TextType::NotUsed),
            4 => Some(TextType::Other),
            5 => Some(TextType::CenterBody),
            6 => Some(TextType::CenterTitle),
            7 => Some(TextType::HalfBody),
            8 => Some(TextType::QuarterBody),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TextType::Title => "title",
            TextType::Body => "body",
            TextType::Notes => "notes",
            TextType::NotUsed => "not used",
            TextType::Other => "other",
            TextType::CenterBody => "center body",
            TextType::CenterTitle => "center title",
            TextType::HalfBody => "half body",
            TextType::QuarterBody => "quarter body",
        }
    }
}

/// Disassembler for one record stream.
pub struct RecordStream<'a> {
    bytes: &'a [u8],
    debug: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(bytes: &'a [u8], config: &DumpConfig) -> Self {
        Self {
            bytes,
            debug: config.debug,
        }
    }

    /// Disassemble every record in the stream.
    ///
    /// Fails with [`Error::RecordDecodeError`] when a record overruns its
    /// parent, trailing bytes cannot hold a header, or a decoded atom is too
    /// short for its fields. Output written before the failure is kept.
    pub fn read_records(&self, out: &mut Output, text: &mut TextAccumulator) -> Result<()> {
        self.read_level(out, text, 0, self.bytes.len(), 0)
    }

    /// Read the records between `start` and `end`, recursing into containers.
    fn read_level(
        &self,
        out: &mut Output,
        text: &mut TextAccumulator,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::RecordDecodeError(format!(
                "Containers nested deeper than {} levels at offset {}",
                MAX_DEPTH, start
            )));
        }

        let mut pos = start;
        while pos < end {
            if end - pos < HEADER_SIZE {
                return Err(Error::RecordDecodeError(format!(
                    "{} trailing bytes at offset {} are too short for a record header",
                    end - pos,
                    pos
                )));
            }

            let header = RecordHeader::parse(self.bytes, pos).ok_or_else(|| {
                Error::RecordDecodeError(format!("Unreadable record header at offset {}", pos))
            })?;

            let content_start = pos + HEADER_SIZE;
            let content_end = content_start
                .checked_add(header.length as usize)
                .filter(|&e| e <= end)
                .ok_or_else(|| {
                    Error::RecordDecodeError(format!(
                        "{} record at offset {} claims {} bytes but only {} remain",
                        header.name(),
                        pos,
                        header.length,
                        end - content_start
                    ))
                })?;

            if self.debug {
                log::debug!(
                    "record 0x{:04X} ({}) at offset {}, depth {}, {} bytes",
                    header.rec_type,
                    header.name(),
                    pos,
                    depth,
                    header.length
                );
            }

            out.outputln(&format!(
                "{}{} (type: 0x{:04X}, ver: 0x{:X}, instance: 0x{:03X}, size: {}, offset: {})",
                indent(depth),
                header.name(),
                header.rec_type,
                header.version,
                header.instance,
                header.length,
                pos
            ))?;

            if header.is_container() {
                self.read_level(out, text, content_start, content_end, depth + 1)?;
            } else {
                let body = &self.bytes[content_start..content_end];
                self.read_atom(out, text, &header, body, depth + 1)?;
            }

            pos = content_end;
        }

        Ok(())
    }

    /// Print the body of an atom record.
    fn read_atom(
        &self,
        out: &mut Output,
        text: &mut TextAccumulator,
        header: &RecordHeader,
        body: &[u8],
        depth: usize,
    ) -> Result<()> {
        match header.rec_type {
            record_types::RT_TEXT_CHARS_ATOM => {
                match extract_unicode_text(body) {
                    Some(chars) => {
                        print_field(out, depth, "text", format!("\"{}\"", encode_name(&chars)))?;
                        text.append(format!("{}\n", chars));
                    }
                    None => out.dump_bytes(body, None)?,
                }
            }

            record_types::RT_TEXT_BYTES_ATOM => {
                match extract_ansi_text(body) {
                    Some(chars) => {
                        print_field(out, depth, "text", format!("\"{}\"", encode_name(&chars)))?;
                        text.append(format!("{}\n", chars));
                    }
                    None => out.dump_bytes(body, None)?,
                }
            }

            record_types::RT_CSTRING => {
                // CStrings hold names and metadata, not slide text.
                let value = extract_unicode_text(body).unwrap_or_default();
                print_field(out, depth, "string", format!("\"{}\"", encode_name(&value)))?;
            }

            record_types::RT_TEXT_HEADER_ATOM => {
                let mut atom = AtomReader::new(header, body);
                let value = atom.u32()?;
                let kind = TextType::from_u32(value).map_or("unknown", TextType::name);
                print_field(out, depth, "text type", format!("{} ({})", value, kind))?;
            }

            record_types::RT_SLIDE_PERSIST_ATOM => {
                let mut atom = AtomReader::new(header, body);
                print_field(out, depth, "persist id ref", atom.u32()?)?;
                print_field(out, depth, "flags", format!("0x{:08X}", atom.u32()?))?;
                print_field(out, depth, "number of texts", atom.u32()? as i32)?;
                print_field(out, depth, "slide id", atom.u32()?)?;
            }

            record_types::RT_DOCUMENT_ATOM => {
                let mut atom = AtomReader::new(header, body);
                let (slide_x, slide_y) = (atom.u32()? as i32, atom.u32()? as i32);
                let (notes_x, notes_y) = (atom.u32()? as i32, atom.u32()? as i32);
                let (zoom_num, zoom_den) = (atom.u32()? as i32, atom.u32()? as i32);
                print_field(out, depth, "slide size", format!("{} x {}", slide_x, slide_y))?;
                print_field(out, depth, "notes size", format!("{} x {}", notes_x, notes_y))?;
                print_field(out, depth, "server zoom", format!("{}/{}", zoom_num, zoom_den))?;
                print_field(out, depth, "notes master persist id ref", atom.u32()?)?;
                print_field(out, depth, "handout master persist id ref", atom.u32()?)?;
                print_field(out, depth, "first slide number", atom.u16()?)?;
                print_field(out, depth, "slide size type", atom.u16()?)?;
                print_field(out, depth, "save with fonts", atom.u8()? != 0)?;
                print_field(out, depth, "omit title place", atom.u8()? != 0)?;
                print_field(out, depth, "right to left", atom.u8()? != 0)?;
                print_field(out, depth, "show comments", atom.u8()? != 0)?;
            }

            record_types::RT_USER_EDIT_ATOM => {
                let mut atom = AtomReader::new(header, body);
                print_field(out, depth, "last slide id ref", atom.u32()?)?;
                print_field(out, depth, "version", atom.u16()?)?;
                print_field(out, depth, "minor version", atom.u8()?)?;
                print_field(out, depth, "major version", atom.u8()?)?;
                print_field(out, depth, "offset last edit", atom.u32()?)?;
                print_field(out, depth, "offset persist directory", atom.u32()?)?;
                print_field(out, depth, "document persist id ref", atom.u32()?)?;
                print_field(out, depth, "persist id seed", atom.u32()?)?;
                print_field(out, depth, "last view", atom.u16()?)?;
            }

            record_types::RT_CURRENT_USER_ATOM => {
                self.read_current_user(out, header, body, depth)?;
            }

            _ => out.dump_bytes(body, None)?,
        }

        Ok(())
    }

    /// Decode a CurrentUserAtom, the only record of the `Current User` stream.
    fn read_current_user(
        &self,
        out: &mut Output,
        header: &RecordHeader,
        body: &[u8],
        depth: usize,
    ) -> Result<()> {
        let mut atom = AtomReader::new(header, body);
        let size = atom.u32()?;
        let token = atom.u32()?;
        let offset_to_current_edit = atom.u32()?;
        let user_name_len = atom.u16()? as usize;
        let doc_file_version = atom.u16()?;
        let major_version = atom.u8()?;
        let minor_version = atom.u8()?;
        atom.u16()?;
        let ansi_user_name = atom.bytes(user_name_len)?;

        let token_desc = match token {
            HEADER_TOKEN_PLAIN => "not encrypted",
            HEADER_TOKEN_ENCRYPTED => "encrypted",
            _ => "unknown",
        };

        print_field(out, depth, "size", size)?;
        print_field(out, depth, "header token", format!("0x{:08X} ({})", token, token_desc))?;
        print_field(out, depth, "offset to current edit", offset_to_current_edit)?;
        print_field(out, depth, "user name length", user_name_len)?;
        print_field(out, depth, "document file version", format!("0x{:04X}", doc_file_version))?;
        print_field(out, depth, "major version", major_version)?;
        print_field(out, depth, "minor version", minor_version)?;
        let ansi = extract_ansi_text(ansi_user_name).unwrap_or_default();
        print_field(out, depth, "user name (ANSI)", format!("\"{}\"", encode_name(&ansi)))?;

        // The release version and Unicode name are optional trailers.
        if let Ok(release_version) = atom.u32() {
            print_field(out, depth, "release version", release_version)?;
            if let Ok(unicode) = atom.bytes(user_name_len * 2) {
                let name = extract_unicode_text(unicode).unwrap_or_default();
                let shown = format!("\"{}\"", encode_name(&name));
                print_field(out, depth, "user name (Unicode)", shown)?;
            }
        }

        Ok(())
    }
}

/// Sequential field reader over an atom body.
struct AtomReader<'a> {
    header: &'a RecordHeader,
    body: &'a [u8],
    pos: usize,
}

impl<'a> AtomReader<'a> {
    fn new(header: &'a RecordHeader, body: &'a [u8]) -> Self {
        Self {
            header,
            body,
            pos: 0,
        }
    }

    fn too_short(&self, wanted: usize) -> Error {
        Error::RecordDecodeError(format!(
            "{} body is {} bytes, too short to read {} bytes at offset {}",
            self.header.name(),
            self.body.len(),
            wanted,
            self.pos
        ))
    }

    fn u8(&mut self) -> Result<u8> {
        let value = *self.body.get(self.pos).ok_or_else(|| self.too_short(1))?;
        self.pos += 1;
        Ok(value)
    }

    fn u16(&mut self) -> Result<u16> {
        let value = read_u16_le(self.body, self.pos).ok_or_else(|| self.too_short(2))?;
        self.pos += 2;
        Ok(value)
    }

    fn u32(&mut self) -> Result<u32> {
        let value = read_u32_le(self.body, self.pos).ok_or_else(|| self.too_short(4))?;
        self.pos += 4;
        Ok(value)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let body = self.body;
        let slice = body
            .get(self.pos..self.pos + len)
            .ok_or_else(|| self.too_short(len))?;
        self.pos += len;
        Ok(slice)
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn print_field(out: &mut Output, depth: usize, label: &str, value: impl Display) -> Result<()> {
    out.outputln(&format!("{}{}: {}", indent(depth), label, value))
}

/// Extract Unicode (UTF-16LE) text from a record body.
fn extract_unicode_text(data: &[u8]) -> Option<String> {
    if data.is_empty() || data.len() % 2 != 0 {
        return None;
    }

    let u16_chars: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    // Decode UTF-16, stopping at null terminator if present
    let text: String = char::decode_utf16(u16_chars.iter().copied())
        .take_while(|r| r.as_ref().map(|&c| c != '\0').unwrap_or(true))
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract ANSI text from a record body (Windows-1252 encoding assumed).
fn extract_ansi_text(data: &[u8]) -> Option<String> {
    // Find null terminator if present
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let slice = &data[..end];

    let text: String = slice.iter().map(|&b| windows_1252_char(b)).collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Map a Windows-1252 byte to its character.
fn windows_1252_char(b: u8) -> char {
    match b {
        0x80 => '€',
        0x82 => '‚',
        0x83 => 'ƒ',
        0x84 => '„',
        0x85 => '…',
        0x86 => '†',
        0x87 => '‡',
        0x88 => 'ˆ',
        0x89 => '‰',
        0x8A => 'Š',
        0x8B => '‹',
        0x8C => 'Œ',
        0x8E => 'Ž',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x98 => '˜',
        0x99 => '™',
        0x9A => 'š',
        0x9B => '›',
        0x9C => 'œ',
        0x9E => 'ž',
        0x9F => 'Ÿ',
        // Undefined in 1252; keep the C1 code point.
        _ => char::from(b),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode one record: header followed by `body`.
    pub(crate) fn record(ver_instance: u16, rec_type: u16, body: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_SIZE + body.len());
        data.extend_from_slice(&ver_instance.to_le_bytes());
        data.extend_from_slice(&rec_type.to_le_bytes());
        data.extend_from_slice(&(body.len() as u32).to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    /// A CurrentUserAtom for user `name`.
    pub(crate) fn current_user_atom(name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0x14u32.to_le_bytes());
        body.extend_from_slice(&HEADER_TOKEN_PLAIN.to_le_bytes());
        body.extend_from_slice(&0x1234u32.to_le_bytes());
        body.extend_from_slice(&(name.len() as u16).to_le_bytes());
        body.extend_from_slice(&0x03F4u16.to_le_bytes());
        body.push(3);
        body.push(0);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&8u32.to_le_bytes());
        for unit in name.encode_utf16() {
            body.extend_from_slice(&unit.to_le_bytes());
        }
        record(0x0000, record_types::RT_CURRENT_USER_ATOM, &body)
    }

    /// A Document container holding a TextHeaderAtom and the given text atoms.
    pub(crate) fn document_with_text(chars: &str, bytes: &str) -> Vec<u8> {
        let utf16: Vec<u8> = chars.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let mut children = record(0x0000, record_types::RT_TEXT_HEADER_ATOM, &1u32.to_le_bytes());
        children.extend(record(0x0000, record_types::RT_TEXT_CHARS_ATOM, &utf16));
        children.extend(record(0x0000, record_types::RT_TEXT_BYTES_ATOM, bytes.as_bytes()));
        record(0x000F, record_types::RT_DOCUMENT, &children)
    }

    fn disassemble(data: &[u8]) -> (Result<()>, String, TextAccumulator) {
        let mut buf = Vec::new();
        let mut text = TextAccumulator::new();
        let result = {
            let mut out = Output::new(&mut buf);
            RecordStream::new(data, &DumpConfig::new()).read_records(&mut out, &mut text)
        };
        (result, String::from_utf8(buf).unwrap(), text)
    }

    #[test]
    fn test_extract_ansi_text() {
        let result = extract_ansi_text(b"Hello World\0garbage");
        assert_eq!(result, Some("Hello World".to_string()));
    }

    #[test]
    fn test_extract_ansi_text_windows_1252() {
        let result = extract_ansi_text(&[0x93, b'H', b'i', 0x94, 0x85]);
        assert_eq!(result, Some("\u{201C}Hi\u{201D}…".to_string()));
    }

    #[test]
    fn test_extract_unicode_text() {
        // "Hi" in UTF-16LE
        let data = [0x48, 0x00, 0x69, 0x00];
        assert_eq!(extract_unicode_text(&data), Some("Hi".to_string()));
        assert_eq!(extract_unicode_text(&data[..3]), None);
        assert_eq!(extract_unicode_text(&[0x00, 0x00]), None);
    }

    #[test]
    fn test_text_type_conversion() {
        assert_eq!(TextType::from_u32(0), Some(TextType::Title));
        assert_eq!(TextType::from_u32(1), Some(TextType::Body));
        assert_eq!(TextType::from_u32(4), Some(TextType::Other));
        assert_eq!(TextType::from_u32(99), None);
        assert_eq!(TextType::CenterTitle.name(), "center title");
    }

    #[test]
    fn test_empty_stream_is_ok() {
        let (result, output, text) = disassemble(&[]);
        assert!(result.is_ok());
        assert!(output.is_empty());
        assert!(text.is_empty());
    }

    #[test]
    fn test_document_container_and_text() {
        let data = document_with_text("Amazing grace\rHow sweet", "the sound");
        let (result, output, text) = disassemble(&data);

        assert!(result.is_ok());
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("Document (type: 0x03E8, ver: 0xF"));
        assert!(lines[1].starts_with("  TextHeaderAtom (type: 0x0F9F"));
        assert_eq!(lines[2], "    text type: 1 (body)");
        assert!(output.contains("  TextCharsAtom (type: 0x0FA0"));
        assert!(output.contains("    text: \"Amazing grace\\x0DHow sweet\""));
        assert!(output.contains("    text: \"the sound\""));

        assert_eq!(text.contents(), "Amazing grace\rHow sweet\nthe sound\n");
        assert_eq!(text.normalized(), "Amazing grace\nHow sweet\nthe sound\n");
    }

    #[test]
    fn test_unknown_atom_is_hex_dumped() {
        let data = record(0x0000, 0x1234, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let (result, output, _) = disassemble(&data);
        assert!(result.is_ok());
        assert!(output.starts_with("Unknown (type: 0x1234"));
        assert!(output.contains("0: DE AD BE EF  "));
    }

    #[test]
    fn test_undecodable_text_atoms_are_hex_dumped() {
        let mut data = record(0x0000, record_types::RT_TEXT_CHARS_ATOM, &[0x41, 0x00, 0x42]);
        data.extend(record(0x0000, record_types::RT_TEXT_BYTES_ATOM, &[0x00, 0x48, 0x69]));
        let (result, output, text) = disassemble(&data);

        assert!(result.is_ok());
        assert!(output.contains("\n0: 41 00 42"));
        assert!(output.contains("\n0: 00 48 69"));
        assert!(!output.contains("text: "));
        assert!(text.is_empty());
    }

    #[test]
    fn test_current_user_atom() {
        let data = current_user_atom("ethan");
        let (result, output, text) = disassemble(&data);

        assert!(result.is_ok());
        assert!(output.starts_with("CurrentUserAtom (type: 0x0FF6"));
        assert!(output.contains("header token: 0xE391C05F (not encrypted)"));
        assert!(output.contains("offset to current edit: 4660"));
        assert!(output.contains("user name (ANSI): \"ethan\""));
        assert!(output.contains("release version: 8"));
        assert!(output.contains("user name (Unicode): \"ethan\""));
        assert!(text.is_empty());
    }

    #[test]
    fn test_record_overrun_is_error() {
        let mut data = record(0x0000, record_types::RT_TEXT_BYTES_ATOM, b"Test");
        // Claim 100 bytes of body.
        data[4] = 100;
        let (result, _, _) = disassemble(&data);
        assert!(matches!(result, Err(Error::RecordDecodeError(_))));
    }

    #[test]
    fn test_child_overrunning_container_is_error() {
        let child = record(0x0000, record_types::RT_TEXT_BYTES_ATOM, b"Test");
        let mut data = record(0x000F, record_types::RT_DOCUMENT, &child);
        // Child claims 5 bytes while its container only holds 4.
        data[12] = 5;
        data.push(0);
        let (result, output, _) = disassemble(&data);
        assert!(matches!(result, Err(Error::RecordDecodeError(_))));
        // The container header was printed before the failure.
        assert!(output.starts_with("Document"));
    }

    #[test]
    fn test_trailing_bytes_are_error() {
        let mut data = record(0x0000, record_types::RT_TEXT_BYTES_ATOM, b"Test");
        data.extend_from_slice(&[0x00, 0x00, 0x01]);
        let (result, _, text) = disassemble(&data);
        assert!(matches!(result, Err(Error::RecordDecodeError(_))));
        // Text decoded before the failure is kept.
        assert_eq!(text.contents(), "Test\n");
    }

    #[test]
    fn test_short_atom_is_error() {
        let data = record(0x0000, record_types::RT_SLIDE_PERSIST_ATOM, &[0x01, 0x00]);
        let (result, _, _) = disassemble(&data);
        assert!(matches!(result, Err(Error::RecordDecodeError(_))));
    }

    #[test]
    fn test_slide_persist_atom() {
        let mut body = Vec::new();
        for value in [5u32, 4, 2, 256] {
            body.extend_from_slice(&value.to_le_bytes());
        }
        let data = record(0x0000, record_types::RT_SLIDE_PERSIST_ATOM, &body);
        let (result, output, _) = disassemble(&data);

        assert!(result.is_ok());
        assert!(output.contains("persist id ref: 5"));
        assert!(output.contains("flags: 0x00000004"));
        assert!(output.contains("number of texts: 2"));
        assert!(output.contains("slide id: 256"));
    }

    #[test]
    fn test_excessive_nesting_is_error() {
        let mut data = Vec::new();
        for _ in 0..=MAX_DEPTH + 1 {
            data = record(0x000F, record_types::RT_DOCUMENT, &data);
        }
        let (result, _, _) = disassemble(&data);
        assert!(matches!(result, Err(Error::RecordDecodeError(_))));
    }
}
