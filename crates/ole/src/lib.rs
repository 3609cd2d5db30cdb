//! OLE/CFB container access for the PowerPoint structure dumper.
//!
//! Wraps the `cfb` crate behind the [`Container`] trait and adds the header,
//! sector chain, raw directory table and property set diagnostics the dump
//! prints.

pub mod container;
pub mod directory;
pub mod header;
pub mod propset;

pub use container::{CfbContainer, Container, DirectoryEntry, EntryType};
pub use directory::{read_directory, ObjectType, RawDirEntry};
pub use header::{CfbHeader, SectorTable};
pub use propset::PropertySetStream;
