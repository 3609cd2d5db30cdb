//! Error types for dumping compound PowerPoint documents.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while inspecting a compound document.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read the input or write the dump output.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not a compound document at all.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// The compound document header or allocation tables are damaged.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// OLE/CFB container error reported by the container reader.
    #[error("OLE/CFB error: {0}")]
    CfbError(String),

    /// A directory entry could not be resolved to its stream bytes.
    #[error("Stream lookup failed: {0}")]
    StreamLookupError(String),

    /// A record stream could not be disassembled.
    #[error("Record decoding error: {0}")]
    RecordDecodeError(String),

    /// A property set stream could not be decoded.
    #[error("Property set decoding error: {0}")]
    PropertySetDecodeError(String),
}

impl Error {
    /// Whether this error came from the output sink rather than from the document.
    pub fn is_output_failure(&self) -> bool {
        matches!(self, Error::IoError(_))
    }
}
