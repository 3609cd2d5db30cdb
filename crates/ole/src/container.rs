//! Access to the directory and streams of a compound file.
//!
//! [`Container`] is the seam the directory walker works against; the
//! production implementation, [`CfbContainer`], opens the in-memory file with
//! the `cfb` crate and snapshots its directory once.

use crate::directory::{read_directory, ObjectType, RawDirEntry};
use crate::header::{CfbHeader, SectorTable};
use cfb::CompoundFile;
use ppt_dump_core::binary::format_guid;
use ppt_dump_core::{encode_name, DumpConfig, Error, Output, Result};
use std::io::{Cursor, Read};
use std::path::PathBuf;

/// A named stream retrieved from the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Entry name as stored in the directory (may contain control characters).
    pub name: String,
    /// Stream payload.
    pub bytes: Vec<u8>,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Read access to a compound document, as needed by the directory walker.
pub trait Container {
    /// Print a summary of the container file.
    fn print_stream_info(&self, out: &mut Output) -> Result<()>;

    /// Print the container header.
    fn print_header(&self, out: &mut Output) -> Result<()>;

    /// Print the directory listing.
    fn print_directory(&self, out: &mut Output) -> Result<()>;

    /// Names of all directory entries, in container order.
    fn directory_names(&self) -> Vec<String>;

    /// Look up an entry by exact name and read its payload.
    ///
    /// Fails with [`Error::StreamLookupError`] when the entry cannot be
    /// resolved or read.
    fn stream_by_name(&mut self, name: &str) -> Result<DirectoryEntry>;
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Root,
    Storage,
    Stream,
    /// Free slot in the directory table.
    Unused,
}

impl EntryType {
    fn label(self) -> &'static str {
        match self {
            EntryType::Root => "root",
            EntryType::Storage => "storage",
            EntryType::Stream => "stream",
            EntryType::Unused => "unused",
        }
    }
}

/// Directory entry metadata captured when the container is opened.
#[derive(Debug, Clone)]
struct EntryInfo {
    id: u32,
    name: String,
    path: Option<PathBuf>,
    entry_type: EntryType,
    len: u64,
    clsid: Option<String>,
    state_bits: u32,
}

impl EntryInfo {
    fn from_raw(raw: RawDirEntry) -> Self {
        let entry_type = match raw.object_type {
            ObjectType::Root => EntryType::Root,
            ObjectType::Storage => EntryType::Storage,
            ObjectType::Stream => EntryType::Stream,
            ObjectType::Unused | ObjectType::Unknown(_) => EntryType::Unused,
        };

        Self {
            id: raw.id,
            name: raw.name,
            path: raw.path,
            entry_type,
            len: raw.size,
            clsid: (raw.clsid != [0u8; 16]).then(|| format_guid(&raw.clsid)),
            state_bits: raw.state_bits,
        }
    }

    /// Build from the `cfb` tree walk; `id` is the walk position.
    fn from_entry(id: u32, entry: &cfb::Entry) -> Self {
        let entry_type = if entry.is_root() {
            EntryType::Root
        } else if entry.is_storage() {
            EntryType::Storage
        } else {
            EntryType::Stream
        };
        let clsid = entry.clsid();

        Self {
            id,
            name: entry.name().to_string(),
            path: Some(entry.path().to_path_buf()),
            entry_type,
            len: entry.len(),
            clsid: (!clsid.is_nil()).then(|| clsid.to_string()),
            state_bits: entry.state_bits(),
        }
    }
}

/// A compound file held fully in memory.
pub struct CfbContainer {
    cfb: CompoundFile<Cursor<Vec<u8>>>,
    header: CfbHeader,
    sectors: Option<SectorTable>,
    entries: Vec<EntryInfo>,
    file_size: usize,
    show_sector_chain: bool,
}

impl CfbContainer {
    /// Open a compound file from its complete contents.
    ///
    /// Entries are listed in directory table order. When the raw tables
    /// cannot be read the `cfb` tree walk order is used instead.
    pub fn from_bytes(data: Vec<u8>, config: &DumpConfig) -> Result<Self> {
        let header = CfbHeader::parse(&data)?;
        let sectors = load_sectors(&data, &header);
        let raw_entries = sectors
            .as_ref()
            .and_then(|sectors| match read_directory(&data, &header, sectors) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    log::warn!("Directory table unreadable: {}", e);
                    None
                }
            });
        let file_size = data.len();

        let cfb = CompoundFile::open(Cursor::new(data))
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        let entries: Vec<EntryInfo> = match raw_entries {
            Some(raw) => raw.into_iter().map(EntryInfo::from_raw).collect(),
            None => {
                log::warn!("Listing directory entries in tree order");
                cfb.walk()
                    .enumerate()
                    .map(|(i, entry)| EntryInfo::from_entry(i as u32, &entry))
                    .collect()
            }
        };

        log::debug!(
            "Opened compound file: {} bytes, version {}, {} directory entries",
            file_size,
            header.major_version,
            entries.len()
        );

        Ok(Self {
            cfb,
            header,
            sectors,
            entries,
            file_size,
            show_sector_chain: config.show_sector_chain,
        })
    }

    /// Number of directory entries, root and unused slots included.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Load the sector tables; they only feed diagnostics, so failures degrade.
fn load_sectors(data: &[u8], header: &CfbHeader) -> Option<SectorTable> {
    match SectorTable::load(data, header) {
        Ok(sectors) => Some(sectors),
        Err(e) => {
            log::warn!("Sector tables unavailable: {}", e);
            None
        }
    }
}

impl Container for CfbContainer {
    fn print_stream_info(&self, out: &mut Output) -> Result<()> {
        out.section("Compound Document")?;
        out.outputln(&format!("File size: {} bytes", self.file_size))?;
        out.outputln(&format!("Sector size: {} bytes", self.header.sector_size()))?;
        out.outputln(&format!(
            "Number of sectors: {}",
            self.header.sector_count(self.file_size)
        ))?;
        out.outputln(&format!("Directory entries: {}", self.entry_count()))?;
        Ok(())
    }

    fn print_header(&self, out: &mut Output) -> Result<()> {
        self.header.print(out)?;
        if self.show_sector_chain {
            match &self.sectors {
                Some(sectors) => sectors.print_chains(&self.header, out)?,
                None => {
                    out.section("Sector Chains")?;
                    out.outputln("(unavailable)")?;
                }
            }
        }
        Ok(())
    }

    fn print_directory(&self, out: &mut Output) -> Result<()> {
        out.section("Directory")?;
        for entry in &self.entries {
            let shown = match &entry.path {
                Some(path) => path.to_string_lossy().into_owned(),
                None => entry.name.clone(),
            };
            let mut line = format!(
                "{:3}: {:<7} {:>10} bytes  {}",
                entry.id,
                entry.entry_type.label(),
                entry.len,
                encode_name(&shown)
            );
            if let Some(clsid) = &entry.clsid {
                line.push_str(&format!("  clsid: {}", clsid));
            }
            if entry.state_bits != 0 {
                line.push_str(&format!("  state: 0x{:08X}", entry.state_bits));
            }
            out.outputln(line.trim_end())?;
        }
        Ok(())
    }

    fn directory_names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    fn stream_by_name(&mut self, name: &str) -> Result<DirectoryEntry> {
        let info = self
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| {
                Error::StreamLookupError(format!(
                    "No directory entry named '{}'",
                    encode_name(name)
                ))
            })?;

        match (info.entry_type, &info.path) {
            // Storages carry no stream data of their own.
            (EntryType::Root | EntryType::Storage | EntryType::Unused, _) => {
                Ok(DirectoryEntry::new(name, Vec::new()))
            }
            (EntryType::Stream, None) => Err(Error::StreamLookupError(format!(
                "Stream '{}' is not linked from the root storage",
                encode_name(name)
            ))),
            (EntryType::Stream, Some(path)) => {
                let mut stream = self.cfb.open_stream(path).map_err(|e| {
                    Error::StreamLookupError(format!(
                        "Failed to open stream '{}': {}",
                        encode_name(name),
                        e
                    ))
                })?;

                let mut bytes = Vec::new();
                stream.read_to_end(&mut bytes).map_err(|e| {
                    Error::StreamLookupError(format!(
                        "Failed to read stream '{}': {}",
                        encode_name(name),
                        e
                    ))
                })?;

                Ok(DirectoryEntry::new(name, bytes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file() -> Vec<u8> {
        let mut comp =
            cfb::CompoundFile::create_with_version(cfb::Version::V3, Cursor::new(Vec::new()))
                .unwrap();
        {
            let mut stream = comp.create_stream("/Current User").unwrap();
            stream.write_all(b"current user bytes").unwrap();
        }
        {
            let mut stream = comp.create_stream("/PowerPoint Document").unwrap();
            stream.write_all(&vec![0x42; 6000]).unwrap();
        }
        comp.create_storage("/ObjectPool").unwrap();
        {
            let mut stream = comp.create_stream("/ObjectPool/Foo").unwrap();
            stream.write_all(b"nested").unwrap();
        }
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }

    fn open(data: Vec<u8>) -> CfbContainer {
        CfbContainer::from_bytes(data, &DumpConfig::new()).unwrap()
    }

    #[test]
    fn test_directory_names_start_with_root() {
        let container = open(sample_file());
        let names = container.directory_names();

        assert_eq!(names[0], "Root Entry");
        assert_eq!(names.len(), container.entry_count());
        for expected in ["Current User", "PowerPoint Document", "ObjectPool", "Foo"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_directory_names_follow_table_order() {
        let mut comp =
            cfb::CompoundFile::create_with_version(cfb::Version::V3, Cursor::new(Vec::new()))
                .unwrap();
        for name in ["Zulu", "Alfa"] {
            let mut stream = comp.create_stream(format!("/{}", name)).unwrap();
            stream.write_all(name.as_bytes()).unwrap();
        }
        comp.flush().unwrap();
        let mut container = open(comp.into_inner().into_inner());

        let names = container.directory_names();
        assert_eq!(&names[..3], &["Root Entry", "Zulu", "Alfa"]);
        // Free slots of the directory sector are listed with empty names.
        assert!(names[3..].iter().all(|n| n.is_empty()));
        assert!(!names[3..].is_empty());

        let entry = container.stream_by_name("Alfa").unwrap();
        assert_eq!(entry.bytes, b"Alfa");
    }

    #[test]
    fn test_directory_listing_uses_stream_ids() {
        let container = open(sample_file());
        let mut buf = Vec::new();
        {
            let mut out = Output::new(&mut buf);
            container.print_directory(&mut out).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("  0: root"));
        assert!(text.contains("  1: stream          18 bytes  /Current User"));
        assert!(text.contains("  2: stream        6000 bytes  /PowerPoint Document"));
        assert!(text.contains("/ObjectPool/Foo"));
    }

    #[test]
    fn test_broken_difat_degrades_to_no_sector_tables() {
        let mut data = sample_file();
        // First DIFAT sector far beyond the end of the file.
        data[0x44..0x48].copy_from_slice(&10_000u32.to_le_bytes());
        data[0x48..0x4C].copy_from_slice(&1u32.to_le_bytes());

        let header = CfbHeader::parse(&data).unwrap();
        assert!(load_sectors(&data, &header).is_none());
    }

    #[test]
    fn test_stream_by_name_reads_payload() {
        let mut container = open(sample_file());

        let entry = container.stream_by_name("Current User").unwrap();
        assert_eq!(entry.name, "Current User");
        assert_eq!(entry.bytes, b"current user bytes");

        let entry = container.stream_by_name("PowerPoint Document").unwrap();
        assert_eq!(entry.len(), 6000);

        let entry = container.stream_by_name("Foo").unwrap();
        assert_eq!(entry.bytes, b"nested");
    }

    #[test]
    fn test_storage_has_empty_payload() {
        let mut container = open(sample_file());
        let entry = container.stream_by_name("ObjectPool").unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn test_missing_stream_is_lookup_error() {
        let mut container = open(sample_file());
        let err = container.stream_by_name("Pictures").unwrap_err();
        assert!(matches!(err, Error::StreamLookupError(_)));
    }

    #[test]
    fn test_rejects_non_compound_file() {
        let data = b"PK\x03\x04 not a compound file".to_vec();
        let result = CfbContainer::from_bytes(data, &DumpConfig::new());
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_print_summaries() {
        let container = CfbContainer::from_bytes(
            sample_file(),
            &DumpConfig::new().with_show_sector_chain(true),
        )
        .unwrap();

        let mut buf = Vec::new();
        {
            let mut out = Output::new(&mut buf);
            container.print_stream_info(&mut out).unwrap();
            container.print_header(&mut out).unwrap();
            container.print_directory(&mut out).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Compound Document"));
        assert!(text.contains("Sector Chains"));
        assert!(text.contains("Directory"));
        assert!(text.contains("root"));
        assert!(text.contains("storage"));
        assert!(text.contains("/PowerPoint Document"));
    }

    #[test]
    fn test_sector_chain_hidden_by_default() {
        let container = open(sample_file());
        let mut buf = Vec::new();
        {
            let mut out = Output::new(&mut buf);
            container.print_header(&mut out).unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("Sector Chains"));
    }
}
