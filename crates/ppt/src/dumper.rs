//! Directory walker and stream dispatcher.
//!
//! [`PptDumper::dump`] prints the container summaries, then visits every
//! directory entry in container order. Each entry is classified by its exact
//! name and routed to the record decoder, the property set decoder, or the
//! raw hex dumper.
//!
//! ## Failure policy
//!
//! - A failed directory lookup aborts the walk; everything printed so far is
//!   kept.
//! - A record stream that fails to decode marks the dump as failed, and the
//!   walk continues with the next entry.
//! - A property set that fails to decode is reported and tolerated; it never
//!   changes the verdict.
//! - Raw dumps cannot fail on their own.

use crate::decoder::RecordStream;
use ppt_dump_core::{encode_name, DumpConfig, Output, Result, TextAccumulator};
use ppt_dump_ole::{Container, DirectoryEntry, PropertySetStream};
use std::io::Write;

/// Name of the container's root directory entry.
pub const ROOT_ENTRY: &str = "Root Entry";

/// Stream holding the presentation records.
pub const POWERPOINT_DOCUMENT: &str = "PowerPoint Document";

/// Stream holding the CurrentUserAtom.
pub const CURRENT_USER: &str = "Current User";

/// Document summary property set stream.
pub const DOCUMENT_SUMMARY_INFORMATION: &str = "\u{5}DocumentSummaryInformation";

/// Bytes per block when hex dumping unrecognized streams.
pub const RAW_DUMP_CHUNK: usize = 512;

/// How a directory entry is handled, decided from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Empty name or the root entry: skipped.
    RootOrEmpty,
    /// `PowerPoint Document`: record stream.
    PresentationDocument,
    /// `Current User`: record stream.
    CurrentUser,
    /// `\x05DocumentSummaryInformation`: property set stream.
    SummaryInformation,
    /// Anything else: raw dump.
    Unclassified,
}

impl EntryKind {
    /// Classify an entry by exact name match.
    pub fn classify(name: &str) -> Self {
        match name {
            "" | ROOT_ENTRY => EntryKind::RootOrEmpty,
            POWERPOINT_DOCUMENT => EntryKind::PresentationDocument,
            CURRENT_USER => EntryKind::CurrentUser,
            DOCUMENT_SUMMARY_INFORMATION => EntryKind::SummaryInformation,
            _ => EntryKind::Unclassified,
        }
    }
}

/// Result of visiting one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// The entry was decoded or dumped.
    Decoded,
    /// Decoding failed; the dump is marked failed but the walk continues.
    Degraded(String),
    /// Decoding failed; reported only, the verdict is unchanged.
    Tolerated(String),
    /// The entry could not be looked up; the walk stopped here.
    Aborted(String),
}

/// One visited (non-root) directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub name: String,
    pub kind: EntryKind,
    /// Payload length; zero when the lookup failed.
    pub size: usize,
    pub outcome: EntryOutcome,
}

/// Accumulated result of a whole directory walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOutcome {
    /// False once a record stream failed to decode.
    pub overall_success: bool,
    /// Set when a lookup failure stopped the walk.
    pub aborted: Option<String>,
    /// Visited entries in visit order.
    pub entries: Vec<EntryReport>,
    /// Text extracted by the decoders.
    pub text: TextAccumulator,
}

impl DumpOutcome {
    fn new() -> Self {
        Self {
            overall_success: true,
            aborted: None,
            entries: Vec::new(),
            text: TextAccumulator::new(),
        }
    }

    fn record(&mut self, report: EntryReport) {
        if let EntryOutcome::Degraded(_) = report.outcome {
            self.overall_success = false;
        }
        if let EntryOutcome::Aborted(reason) = &report.outcome {
            self.aborted = Some(reason.clone());
        }
        self.entries.push(report);
    }

    /// Verdict for the whole dump: no failed record stream and no abort.
    pub fn succeeded(&self) -> bool {
        self.overall_success && self.aborted.is_none()
    }

    /// Names of the visited entries, in order.
    pub fn visited(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// The decoders an entry can be routed to.
pub trait StreamDecoders {
    /// Disassemble a record stream, appending any text found.
    fn decode_records(
        &mut self,
        entry: &DirectoryEntry,
        out: &mut Output,
        text: &mut TextAccumulator,
    ) -> Result<()>;

    /// Decode a property set stream.
    fn decode_property_set(&mut self, entry: &DirectoryEntry, out: &mut Output) -> Result<()>;

    /// Hex dump a stream nobody recognizes.
    fn dump_raw(&mut self, entry: &DirectoryEntry, out: &mut Output) -> Result<()> {
        out.dump_bytes(&entry.bytes, Some(RAW_DUMP_CHUNK))
    }
}

/// The PowerPoint record and OLE property set decoders.
#[derive(Debug, Clone, Default)]
pub struct PptDecoders {
    config: DumpConfig,
}

impl PptDecoders {
    pub fn new(config: DumpConfig) -> Self {
        Self { config }
    }
}

impl StreamDecoders for PptDecoders {
    fn decode_records(
        &mut self,
        entry: &DirectoryEntry,
        out: &mut Output,
        text: &mut TextAccumulator,
    ) -> Result<()> {
        RecordStream::new(&entry.bytes, &self.config).read_records(out, text)
    }

    fn decode_property_set(&mut self, entry: &DirectoryEntry, out: &mut Output) -> Result<()> {
        PropertySetStream::new(&entry.bytes).read(out)
    }
}

/// Walks a container's directory and dumps every entry.
pub struct PptDumper<D = PptDecoders> {
    decoders: D,
}

impl PptDumper<PptDecoders> {
    /// Create a dumper using the standard decoders.
    pub fn new(config: DumpConfig) -> Self {
        Self {
            decoders: PptDecoders::new(config),
        }
    }
}

impl<D: StreamDecoders> PptDumper<D> {
    /// Create a dumper routing entries to custom decoders.
    pub fn with_decoders(decoders: D) -> Self {
        Self { decoders }
    }

    /// Dump the container's summaries and every directory entry.
    ///
    /// Decoding problems are reported in the returned [`DumpOutcome`]; an
    /// `Err` means the output itself could not be written.
    pub fn dump<C: Container + ?Sized>(
        &mut self,
        container: &mut C,
        out: &mut Output,
    ) -> Result<DumpOutcome> {
        container.print_stream_info(out)?;
        container.print_header(out)?;
        container.print_directory(out)?;

        let mut outcome = DumpOutcome::new();

        for name in container.directory_names() {
            let kind = EntryKind::classify(&name);
            if kind == EntryKind::RootOrEmpty {
                continue;
            }

            let entry = match container.stream_by_name(&name) {
                Ok(entry) => entry,
                Err(e) => {
                    log::error!("Failed to look up '{}': {}", encode_name(&name), e);
                    outcome.record(EntryReport {
                        name,
                        kind,
                        size: 0,
                        outcome: EntryOutcome::Aborted(e.to_string()),
                    });
                    break;
                }
            };

            print_dir_header(out, &entry.name, entry.len())?;

            let result = match kind {
                EntryKind::RootOrEmpty => continue,
                EntryKind::PresentationDocument | EntryKind::CurrentUser => settle(
                    self.decoders.decode_records(&entry, out, &mut outcome.text),
                    EntryOutcome::Degraded,
                )?,
                EntryKind::SummaryInformation => settle(
                    self.decoders.decode_property_set(&entry, out),
                    EntryOutcome::Tolerated,
                )?,
                EntryKind::Unclassified => {
                    self.decoders.dump_raw(&entry, out)?;
                    EntryOutcome::Decoded
                }
            };

            match &result {
                EntryOutcome::Degraded(reason) => {
                    log::error!("Failed to decode '{}': {}", encode_name(&name), reason)
                }
                EntryOutcome::Tolerated(reason) => {
                    log::warn!("Failed to decode '{}': {}", encode_name(&name), reason)
                }
                _ => {}
            }

            outcome.record(EntryReport {
                name,
                kind,
                size: entry.len(),
                outcome: result,
            });
        }

        log::debug!(
            "Visited {} entries, success={}, aborted={}",
            outcome.entries.len(),
            outcome.overall_success,
            outcome.aborted.is_some()
        );

        Ok(outcome)
    }
}

/// Turn a decoder result into an entry outcome; output failures still propagate.
fn settle(result: Result<()>, on_failure: fn(String) -> EntryOutcome) -> Result<EntryOutcome> {
    match result {
        Ok(()) => Ok(EntryOutcome::Decoded),
        Err(e) if e.is_output_failure() => Err(e),
        Err(e) => Ok(on_failure(e.to_string())),
    }
}

/// Print the banner in front of each entry's dump.
fn print_dir_header(out: &mut Output, name: &str, len: usize) -> Result<()> {
    out.section(&format!("{} (size: {} bytes)", encode_name(name), len))
}

/// Write the accumulated text if the configuration asks for it.
///
/// Carriage returns become newlines. This bypasses the output mute switch.
pub fn emit_text(outcome: &DumpOutcome, config: &DumpConfig, writer: &mut dyn Write) -> Result<()> {
    if config.dump_text {
        writeln!(writer, "{}", outcome.text.normalized())?;
    }
    Ok(())
}
