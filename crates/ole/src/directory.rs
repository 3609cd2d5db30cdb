//! Raw directory table access.
//!
//! `cfb` only exposes the directory as a name-sorted tree walk. The dump lists
//! entries the way they sit in the directory stream instead: by stream id,
//! unused slots included.

use crate::header::{read_sector, CfbHeader, SectorTable};
use ppt_dump_core::binary::{decode_utf16le, read_u16_le, read_u32_le, read_u64_le};
use ppt_dump_core::{Error, Result};
use std::path::PathBuf;

/// Size of one directory entry.
pub const DIR_ENTRY_SIZE: usize = 128;

/// Null sibling or child pointer.
pub const NOSTREAM: u32 = 0xFFFF_FFFF;

/// Object type byte of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Unused,
    Storage,
    Stream,
    Root,
    Unknown(u8),
}

impl ObjectType {
    fn from_byte(value: u8) -> Self {
        match value {
            0 => ObjectType::Unused,
            1 => ObjectType::Storage,
            2 => ObjectType::Stream,
            5 => ObjectType::Root,
            other => ObjectType::Unknown(other),
        }
    }

    /// Whether entries of this type own a child tree.
    pub fn has_children(self) -> bool {
        matches!(self, ObjectType::Storage | ObjectType::Root)
    }
}

/// One 128-byte directory entry, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDirEntry {
    /// Position in the directory stream.
    pub id: u32,
    pub name: String,
    pub object_type: ObjectType,
    pub left: u32,
    pub right: u32,
    pub child: u32,
    pub clsid: [u8; 16],
    pub state_bits: u32,
    pub size: u64,
    /// Path from the root storage; `None` when no storage links to the entry.
    pub path: Option<PathBuf>,
}

impl RawDirEntry {
    fn parse(id: u32, raw: &[u8], major_version: u16) -> Self {
        let name_len = read_u16_le(raw, 0x40).map_or(0, usize::from).min(64);
        let mut clsid = [0u8; 16];
        clsid.copy_from_slice(&raw[0x50..0x60]);

        let size = read_u64_le(raw, 0x78).unwrap_or(0);
        // Version 3 files only define the low 32 bits.
        let size = if major_version == 3 {
            size & 0xFFFF_FFFF
        } else {
            size
        };

        Self {
            id,
            name: decode_utf16le(&raw[..name_len]),
            object_type: ObjectType::from_byte(raw[0x42]),
            left: read_u32_le(raw, 0x44).unwrap_or(NOSTREAM),
            right: read_u32_le(raw, 0x48).unwrap_or(NOSTREAM),
            child: read_u32_le(raw, 0x4C).unwrap_or(NOSTREAM),
            clsid,
            state_bits: read_u32_le(raw, 0x60).unwrap_or(0),
            size,
            path: None,
        }
    }
}

/// Read every directory entry in stream id order and resolve their paths.
pub fn read_directory(
    data: &[u8],
    header: &CfbHeader,
    sectors: &SectorTable,
) -> Result<Vec<RawDirEntry>> {
    let chain = sectors.chain(header.first_dir_sector);
    if chain.is_empty() {
        return Err(Error::CorruptedFile("Directory has no sectors".to_string()));
    }

    let mut entries = Vec::new();
    for sector_id in chain {
        let sector = read_sector(data, header, sector_id)?;
        for raw in sector.chunks_exact(DIR_ENTRY_SIZE) {
            let id = entries.len() as u32;
            entries.push(RawDirEntry::parse(id, raw, header.major_version));
        }
    }

    if entries.first().map(|root| root.object_type) != Some(ObjectType::Root) {
        return Err(Error::CorruptedFile(
            "First directory entry is not the root storage".to_string(),
        ));
    }

    resolve_paths(&mut entries);
    log::debug!("Read {} directory entries", entries.len());
    Ok(entries)
}

/// Fill in `path` for every entry reachable from the root through the
/// sibling trees.
fn resolve_paths(entries: &mut [RawDirEntry]) {
    let mut visited = vec![false; entries.len()];
    let mut pending: Vec<(u32, PathBuf)> = Vec::new();

    if let Some(root) = entries.first_mut() {
        visited[0] = true;
        root.path = Some(PathBuf::from("/"));
        pending.push((root.child, PathBuf::from("/")));
    }

    while let Some((id, parent)) = pending.pop() {
        let index = id as usize;
        if id == NOSTREAM || index >= entries.len() || visited[index] {
            continue;
        }
        visited[index] = true;

        let entry = &mut entries[index];
        let path = parent.join(&entry.name);
        entry.path = Some(path.clone());

        pending.push((entry.left, parent.clone()));
        pending.push((entry.right, parent));
        if entry.object_type.has_children() {
            pending.push((entry.child, path));
        }
    }
}
