//! OLE property set stream decoder.
//!
//! Prints the header, section table and typed property values of
//! `\x05SummaryInformation`-style streams. Only the common value types are
//! rendered; anything else is reported by type and skipped.

use ppt_dump_core::binary::{decode_utf16le, format_guid, read_u16_le, read_u32_le, read_u64_le};
use ppt_dump_core::{Error, Output, Result};

/// Size of the fixed property set stream header.
const HEADER_SIZE: usize = 28;

/// Size of one FMTID + offset pair in the section table.
const SECTION_ENTRY_SIZE: usize = 20;

/// Upper bound on properties listed per section.
const MAX_PROPERTIES: usize = 1000;

/// Property value types.
mod vt {
    pub const VT_EMPTY: u16 = 0;
    pub const VT_NULL: u16 = 1;
    pub const VT_I2: u16 = 2;
    pub const VT_I4: u16 = 3;
    pub const VT_BOOL: u16 = 11;
    pub const VT_UI4: u16 = 19;
    pub const VT_LPSTR: u16 = 30;
    pub const VT_LPWSTR: u16 = 31;
    pub const VT_FILETIME: u16 = 64;
    pub const VT_BLOB: u16 = 65;
    pub const VT_CLSID: u16 = 72;
    pub const VT_VECTOR: u16 = 0x1000;
}

/// FMTID of the SummaryInformation property set.
pub const FMTID_SUMMARY_INFORMATION: [u8; 16] = [
    0xE0, 0x85, 0x9F, 0xF2, 0xF9, 0x4F, 0x68, 0x10, 0xAB, 0x91, 0x08, 0x00, 0x2B, 0x27, 0xB3, 0xD9,
];

/// FMTID of the DocumentSummaryInformation property set.
pub const FMTID_DOC_SUMMARY_INFORMATION: [u8; 16] = [
    0x02, 0xD5, 0xCD, 0xD5, 0x9C, 0x2E, 0x1B, 0x10, 0x93, 0x97, 0x08, 0x00, 0x2B, 0x2C, 0xF9, 0xAE,
];

/// FMTID of the user-defined properties section.
pub const FMTID_USER_DEFINED_PROPERTIES: [u8; 16] = [
    0x05, 0xD5, 0xCD, 0xD5, 0x9C, 0x2E, 0x1B, 0x10, 0x93, 0x97, 0x08, 0x00, 0x2B, 0x2C, 0xF9, 0xAE,
];

/// Decoder for a single property set stream.
pub struct PropertySetStream<'a> {
    bytes: &'a [u8],
}

impl<'a> PropertySetStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Decode and print the whole stream.
    pub fn read(&self, out: &mut Output) -> Result<()> {
        let data = self.bytes;
        if data.len() < HEADER_SIZE {
            return Err(Error::PropertySetDecodeError(format!(
                "Stream too short for a property set header ({} bytes, need {})",
                data.len(),
                HEADER_SIZE
            )));
        }

        let byte_order = read_u16_le(data, 0).unwrap_or(0);
        if byte_order != 0xFFFE {
            return Err(Error::PropertySetDecodeError(format!(
                "Invalid byte order mark 0x{:04X}",
                byte_order
            )));
        }

        let version = read_u16_le(data, 2).unwrap_or(0);
        let system_id = read_u32_le(data, 4).unwrap_or(0);
        let clsid = guid_at(data, 8).unwrap_or([0u8; 16]);
        let num_sets = read_u32_le(data, 24).unwrap_or(0) as usize;

        out.outputln(&format!("Byte order: 0x{:04X}", byte_order))?;
        out.outputln(&format!("Version: {}", version))?;
        out.outputln(&format!(
            "System identifier: 0x{:08X} ({})",
            system_id,
            system_name(system_id)
        ))?;
        out.outputln(&format!("CLSID: {}", format_guid(&clsid)))?;
        out.outputln(&format!("Number of property sets: {}", num_sets))?;

        let table_end = num_sets
            .checked_mul(SECTION_ENTRY_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                Error::PropertySetDecodeError(format!(
                    "Section table for {} property sets runs past the end of the stream",
                    num_sets
                ))
            })?;
        log::debug!("Property set section table ends at offset {}", table_end);

        for index in 0..num_sets {
            let pos = HEADER_SIZE + index * SECTION_ENTRY_SIZE;
            let fmtid = guid_at(data, pos).unwrap_or([0u8; 16]);
            let offset = read_u32_le(data, pos + 16).unwrap_or(0) as usize;

            out.outputln("")?;
            out.outputln(&format!(
                "Property set {}: {} ({}), offset {}",
                index,
                format_guid(&fmtid),
                fmtid_name(&fmtid),
                offset
            ))?;
            self.read_section(out, &fmtid, offset)?;
        }

        Ok(())
    }

    /// Decode one section: its size, property table and values.
    fn read_section(&self, out: &mut Output, fmtid: &[u8; 16], offset: usize) -> Result<()> {
        let data = self.bytes;
        let (size, count) = match (read_u32_le(data, offset), read_u32_le(data, offset + 4)) {
            (Some(size), Some(count)) => (size, count as usize),
            _ => {
                return Err(Error::PropertySetDecodeError(format!(
                    "Section header at offset {} runs past the end of the stream",
                    offset
                )));
            }
        };

        let table_fits = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(offset + 8))
            .is_some_and(|end| end <= data.len());
        if !table_fits {
            return Err(Error::PropertySetDecodeError(format!(
                "Property table of {} entries at offset {} runs past the end of the stream",
                count, offset
            )));
        }

        out.outputln(&format!("  Section size: {} bytes", size))?;
        out.outputln(&format!("  Number of properties: {}", count))?;

        if count > MAX_PROPERTIES {
            log::warn!(
                "Section declares {} properties, listing the first {}",
                count,
                MAX_PROPERTIES
            );
        }

        for i in 0..count.min(MAX_PROPERTIES) {
            let entry = offset + 8 + i * 8;
            let id = read_u32_le(data, entry).unwrap_or(0);
            let value_offset = read_u32_le(data, entry + 4).unwrap_or(0) as usize;

            let value = if id == 0 {
                "(dictionary)".to_string()
            } else {
                offset
                    .checked_add(value_offset)
                    .and_then(|pos| self.read_value(pos))
                    .unwrap_or_else(|| "(value out of range)".to_string())
            };

            out.outputln(&format!(
                "  {:>10} {:<20} {}",
                format!("0x{:08X}", id),
                property_name(fmtid, id),
                value
            ))?;
        }

        Ok(())
    }

    /// Render the typed value at `pos`, or `None` if it is truncated.
    fn read_value(&self, pos: usize) -> Option<String> {
        let data = self.bytes;
        let value_type = read_u16_le(data, pos)?;
        let body = pos + 4;

        let rendered = match value_type {
            vt::VT_EMPTY | vt::VT_NULL => "(empty)".to_string(),
            vt::VT_I2 => format!("{}", read_u16_le(data, body)? as i16),
            vt::VT_I4 => format!("{}", read_u32_le(data, body)? as i32),
            vt::VT_UI4 => format!("{}", read_u32_le(data, body)?),
            vt::VT_BOOL => {
                if read_u16_le(data, body)? != 0 {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            vt::VT_LPSTR => {
                let len = read_u32_le(data, body)? as usize;
                let bytes = data.get(body + 4..(body + 4).checked_add(len)?)?;
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let text: String = bytes[..end].iter().map(|&b| b as char).collect();
                format!("\"{}\"", text)
            }
            vt::VT_LPWSTR => {
                let chars = read_u32_le(data, body)? as usize;
                let bytes = data.get(body + 4..(body + 4).checked_add(chars.checked_mul(2)?)?)?;
                format!("\"{}\"", decode_utf16le(bytes))
            }
            vt::VT_FILETIME => format!("FILETIME 0x{:016X}", read_u64_le(data, body)?),
            vt::VT_BLOB => format!("(blob, {} bytes)", read_u32_le(data, body)?),
            vt::VT_CLSID => format_guid(&guid_at(data, body)?),
            t if t & vt::VT_VECTOR != 0 => format!(
                "(vector of type 0x{:04X}, {} elements)",
                t & !vt::VT_VECTOR,
                read_u32_le(data, body)?
            ),
            t => format!("(unsupported type 0x{:04X})", t),
        };

        Some(rendered)
    }
}

fn guid_at(data: &[u8], pos: usize) -> Option<[u8; 16]> {
    let bytes = data.get(pos..pos.checked_add(16)?)?;
    let mut guid = [0u8; 16];
    guid.copy_from_slice(bytes);
    Some(guid)
}

fn system_name(system_id: u32) -> &'static str {
    match system_id >> 16 {
        0 => "Win16",
        1 => "Macintosh",
        2 => "Win32",
        _ => "unknown",
    }
}

fn fmtid_name(fmtid: &[u8; 16]) -> &'static str {
    match *fmtid {
        FMTID_SUMMARY_INFORMATION => "SummaryInformation",
        FMTID_DOC_SUMMARY_INFORMATION => "DocumentSummaryInformation",
        FMTID_USER_DEFINED_PROPERTIES => "UserDefinedProperties",
        _ => "unknown",
    }
}

/// Well-known property name for `id` within the set identified by `fmtid`.
pub fn property_name(fmtid: &[u8; 16], id: u32) -> &'static str {
    match id {
        0 => return "Dictionary",
        1 => return "CodePage",
        0x8000_0000 => return "Locale",
        0x8000_0003 => return "Behavior",
        _ => {}
    }

    match *fmtid {
        FMTID_SUMMARY_INFORMATION => match id {
            2 => "Title",
            3 => "Subject",
            4 => "Author",
            5 => "Keywords",
            6 => "Comments",
            7 => "Template",
            8 => "LastAuthor",
            9 => "RevNumber",
            10 => "EditTime",
            11 => "LastPrinted",
            12 => "CreateDateTime",
            13 => "LastSaveDateTime",
            14 => "PageCount",
            15 => "WordCount",
            16 => "CharCount",
            17 => "Thumbnail",
            18 => "AppName",
            19 => "DocSecurity",
            _ => "",
        },
        FMTID_DOC_SUMMARY_INFORMATION => match id {
            2 => "Category",
            3 => "PresentationTarget",
            4 => "Bytes",
            5 => "Lines",
            6 => "Paragraphs",
            7 => "Slides",
            8 => "Notes",
            9 => "HiddenSlides",
            10 => "MMClips",
            11 => "ScaleCrop",
            12 => "HeadingPairs",
            13 => "TitlesOfParts",
            14 => "Manager",
            15 => "Company",
            16 => "LinksUpToDate",
            _ => "",
        },
        _ => "",
    }
}
