//! Compound file header and sector allocation diagnostics.
//!
//! The `cfb` crate handles stream access but does not expose the raw header
//! fields or the allocation chains, so the dumper reads those directly from
//! the in-memory file bytes.

use ppt_dump_core::binary::{format_guid, read_u16_le, read_u32_le};
use ppt_dump_core::{Error, Output, Result};

/// Magic bytes at the start of every compound file.
pub const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Size of the fixed header structure.
pub const HEADER_SIZE: usize = 512;

/// Number of FAT sector locations stored in the header itself.
const HEADER_DIFAT_ENTRIES: usize = 109;

/// Largest regular sector number.
pub const MAXREGSECT: u32 = 0xFFFF_FFFA;
/// Marks a DIFAT sector in the FAT.
pub const DIFSECT: u32 = 0xFFFF_FFFC;
/// Marks a FAT sector in the FAT.
pub const FATSECT: u32 = 0xFFFF_FFFD;
/// Terminates a sector chain.
pub const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
/// Unallocated sector.
pub const FREESECT: u32 = 0xFFFF_FFFF;

/// Parsed compound file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfbHeader {
    /// Reserved header CLSID (normally all zeros).
    pub clsid: [u8; 16],
    pub minor_version: u16,
    pub major_version: u16,
    pub byte_order: u16,
    /// Sector size as a power of two (9 for v3, 12 for v4).
    pub sector_shift: u16,
    /// Mini sector size as a power of two (normally 6).
    pub mini_sector_shift: u16,
    pub num_dir_sectors: u32,
    pub num_fat_sectors: u32,
    pub first_dir_sector: u32,
    pub transaction_signature: u32,
    /// Streams below this size live in the mini stream.
    pub mini_stream_cutoff: u32,
    pub first_mini_fat_sector: u32,
    pub num_mini_fat_sectors: u32,
    pub first_difat_sector: u32,
    pub num_difat_sectors: u32,
    /// The 109 FAT sector locations stored in the header.
    pub difat: Vec<u32>,
}

impl CfbHeader {
    /// Parse and validate the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnsupportedFormat(format!(
                "File too small for a compound document header ({} bytes, need {})",
                data.len(),
                HEADER_SIZE
            )));
        }

        if data[..8] != SIGNATURE {
            return Err(Error::UnsupportedFormat(
                "Missing compound document signature (D0 CF 11 E0 A1 B1 1A E1)".to_string(),
            ));
        }

        let field_u16 = |offset: usize| read_u16_le(data, offset).unwrap_or(0);
        let field_u32 = |offset: usize| read_u32_le(data, offset).unwrap_or(0);

        let mut clsid = [0u8; 16];
        clsid.copy_from_slice(&data[0x08..0x18]);

        let header = CfbHeader {
            clsid,
            minor_version: field_u16(0x18),
            major_version: field_u16(0x1A),
            byte_order: field_u16(0x1C),
            sector_shift: field_u16(0x1E),
            mini_sector_shift: field_u16(0x20),
            num_dir_sectors: field_u32(0x28),
            num_fat_sectors: field_u32(0x2C),
            first_dir_sector: field_u32(0x30),
            transaction_signature: field_u32(0x34),
            mini_stream_cutoff: field_u32(0x38),
            first_mini_fat_sector: field_u32(0x3C),
            num_mini_fat_sectors: field_u32(0x40),
            first_difat_sector: field_u32(0x44),
            num_difat_sectors: field_u32(0x48),
            difat: (0..HEADER_DIFAT_ENTRIES)
                .map(|i| field_u32(0x4C + i * 4))
                .collect(),
        };

        if header.byte_order != 0xFFFE {
            return Err(Error::CorruptedFile(format!(
                "Invalid byte order mark 0x{:04X} (expected 0xFFFE)",
                header.byte_order
            )));
        }

        match (header.major_version, header.sector_shift) {
            (3, 9) | (4, 12) => {}
            (major, shift) => {
                return Err(Error::CorruptedFile(format!(
                    "Sector shift {} does not match major version {}",
                    shift, major
                )));
            }
        }

        if header.mini_sector_shift >= header.sector_shift {
            return Err(Error::CorruptedFile(format!(
                "Mini sector shift {} is not smaller than sector shift {}",
                header.mini_sector_shift, header.sector_shift
            )));
        }

        Ok(header)
    }

    pub fn sector_size(&self) -> usize {
        1usize << self.sector_shift
    }

    pub fn mini_sector_size(&self) -> usize {
        1usize << self.mini_sector_shift
    }

    /// Number of whole or partial sectors following the header sector.
    pub fn sector_count(&self, file_size: usize) -> usize {
        let size = self.sector_size();
        file_size.saturating_sub(size).div_ceil(size)
    }

    /// Print every header field.
    pub fn print(&self, out: &mut Output) -> Result<()> {
        out.section("Compound Document Header")?;
        out.outputln(&format!("Header CLSID: {}", format_guid(&self.clsid)))?;
        out.outputln(&format!("Minor version: 0x{:04X}", self.minor_version))?;
        out.outputln(&format!("Major version: {}", self.major_version))?;
        out.outputln(&format!("Byte order: 0x{:04X} (little endian)", self.byte_order))?;
        out.outputln(&format!(
            "Sector size: {} bytes (shift {})",
            self.sector_size(),
            self.sector_shift
        ))?;
        out.outputln(&format!(
            "Mini sector size: {} bytes (shift {})",
            self.mini_sector_size(),
            self.mini_sector_shift
        ))?;
        out.outputln(&format!("Number of directory sectors: {}", self.num_dir_sectors))?;
        out.outputln(&format!("Number of FAT sectors: {}", self.num_fat_sectors))?;
        out.outputln(&format!(
            "First directory sector: {}",
            format_sector_id(self.first_dir_sector)
        ))?;
        out.outputln(&format!(
            "Transaction signature: 0x{:08X}",
            self.transaction_signature
        ))?;
        out.outputln(&format!(
            "Mini stream cutoff: {} bytes",
            self.mini_stream_cutoff
        ))?;
        out.outputln(&format!(
            "First mini FAT sector: {}",
            format_sector_id(self.first_mini_fat_sector)
        ))?;
        out.outputln(&format!("Number of mini FAT sectors: {}", self.num_mini_fat_sectors))?;
        out.outputln(&format!(
            "First DIFAT sector: {}",
            format_sector_id(self.first_difat_sector)
        ))?;
        out.outputln(&format!("Number of DIFAT sectors: {}", self.num_difat_sectors))?;
        Ok(())
    }
}

/// The file allocation table, loaded from the header DIFAT and DIFAT sectors.
#[derive(Debug, Clone, Default)]
pub struct SectorTable {
    fat_sectors: Vec<u32>,
    fat: Vec<u32>,
}

impl SectorTable {
    /// Load the FAT described by `header` from the raw file bytes.
    ///
    /// The DIFAT walk and the FAT itself are bounded by the number of sectors
    /// in the file, whatever the header claims.
    pub fn load(data: &[u8], header: &CfbHeader) -> Result<Self> {
        let sector_count = header.sector_count(data.len());
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .copied()
            .take_while(|&sector| sector <= MAXREGSECT)
            .collect();

        // DIFAT sectors hold (sector_size / 4 - 1) locations plus a next pointer.
        let per_difat_sector = header.sector_size() / 4 - 1;
        let mut visited = vec![false; sector_count];
        let mut difat_sector = header.first_difat_sector;
        let difat_limit = (header.num_difat_sectors as usize).min(sector_count);
        for _ in 0..difat_limit {
            if difat_sector > MAXREGSECT {
                break;
            }
            match visited.get_mut(difat_sector as usize) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => {
                    log::warn!("DIFAT chain loops back to sector {}", difat_sector);
                    break;
                }
                None => {
                    return Err(Error::CorruptedFile(format!(
                        "DIFAT sector {} is beyond the end of the file",
                        difat_sector
                    )));
                }
            }
            let sector = read_sector(data, header, difat_sector)?;
            for i in 0..per_difat_sector {
                match read_u32_le(sector, i * 4) {
                    Some(location) if location <= MAXREGSECT => fat_sectors.push(location),
                    _ => break,
                }
            }
            difat_sector = read_u32_le(sector, per_difat_sector * 4).unwrap_or(ENDOFCHAIN);
        }

        if fat_sectors.len() > sector_count {
            log::warn!(
                "DIFAT lists {} FAT sectors but the file only has {} sectors",
                fat_sectors.len(),
                sector_count
            );
            fat_sectors.truncate(sector_count);
        }

        if fat_sectors.len() != header.num_fat_sectors as usize {
            log::warn!(
                "Header declares {} FAT sectors but the DIFAT lists {}",
                header.num_fat_sectors,
                fat_sectors.len()
            );
        }

        let mut fat = Vec::with_capacity(fat_sectors.len() * header.sector_size() / 4);
        for &sector_id in &fat_sectors {
            let sector = read_sector(data, header, sector_id)?;
            fat.extend(sector.chunks_exact(4).map(|entry| {
                u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]])
            }));
        }

        log::debug!(
            "Loaded FAT: {} sectors, {} entries",
            fat_sectors.len(),
            fat.len()
        );

        Ok(Self { fat_sectors, fat })
    }

    /// Locations of the sectors holding the FAT itself.
    pub fn fat_sectors(&self) -> &[u32] {
        &self.fat_sectors
    }

    /// Number of FAT entries (one per addressable sector).
    pub fn len(&self) -> usize {
        self.fat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fat.is_empty()
    }

    /// Follow the chain starting at `start`.
    ///
    /// Stops at the first special sector id, at an id outside the table, or
    /// once more sectors than the table holds have been visited (a cycle).
    pub fn chain(&self, start: u32) -> Vec<u32> {
        let mut chain = Vec::new();
        let mut sector = start;
        while sector <= MAXREGSECT && chain.len() <= self.fat.len() {
            chain.push(sector);
            match self.fat.get(sector as usize) {
                Some(&next) => sector = next,
                None => break,
            }
        }
        chain
    }

    /// Print the FAT sector list and the directory and mini FAT chains.
    pub fn print_chains(&self, header: &CfbHeader, out: &mut Output) -> Result<()> {
        out.section("Sector Chains")?;
        out.outputln(&format!("FAT sectors: {}", format_sector_list(&self.fat_sectors)))?;
        out.outputln(&format!(
            "Directory sector chain: {}",
            format_sector_list(&self.chain(header.first_dir_sector))
        ))?;
        out.outputln(&format!(
            "Mini FAT sector chain: {}",
            format_sector_list(&self.chain(header.first_mini_fat_sector))
        ))?;
        Ok(())
    }
}

/// Borrow the bytes of sector `id`; the last sector may be short.
pub(crate) fn read_sector<'a>(data: &'a [u8], header: &CfbHeader, id: u32) -> Result<&'a [u8]> {
    let size = header.sector_size();
    let start = (id as usize + 1) * size;
    if start >= data.len() {
        return Err(Error::CorruptedFile(format!(
            "Sector {} starts at offset {} beyond the end of the file ({} bytes)",
            id,
            start,
            data.len()
        )));
    }
    let end = (start + size).min(data.len());
    Ok(&data[start..end])
}

/// Render a sector id, naming the special values.
pub fn format_sector_id(id: u32) -> String {
    match id {
        DIFSECT => "DIFSECT".to_string(),
        FATSECT => "FATSECT".to_string(),
        ENDOFCHAIN => "ENDOFCHAIN".to_string(),
        FREESECT => "FREESECT".to_string(),
        _ => id.to_string(),
    }
}

fn format_sector_list(sectors: &[u32]) -> String {
    if sectors.is_empty() {
        return "(none)".to_string();
    }
    sectors
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
