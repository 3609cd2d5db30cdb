//! PowerPoint 97-2003 binary structure dumping.
//!
//! [`RecordStream`] disassembles the record streams, and [`PptDumper`] walks a
//! container's directory and routes each entry to the right decoder.

pub mod decoder;
pub mod dumper;
pub mod records;

pub use decoder::RecordStream;
pub use dumper::{
    emit_text, DumpOutcome, EntryKind, EntryOutcome, EntryReport, PptDecoders, PptDumper,
    StreamDecoders,
};
pub use records::{record_name, RecordHeader};
