//! Error types for the ingest pipeline
//!
//! Fatal parse failures abort the whole parse and surface here; recoverable
//! extraction problems (cover rendering, TOC walk, a single malformed
//! metadata field) are logged and skipped at the site, never raised.

use thiserror::Error;

/// Fatal parse errors: no partial `ParseResult` is returned for any of these.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file's format could not be determined or is not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Corrupted archive or package structure
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// A required container entry is missing (container.xml, OPF, manifest.json)
    #[error("Missing container entry: {0}")]
    MissingContainerEntry(String),

    /// Password-protected or structurally invalid PDF
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Wall-clock parse timeout fired before the parser finished
    #[error("Parse timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    /// I/O error reading the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared error from the common crate
    #[error("Common error: {0}")]
    Common(#[from] shelfmark_common::Error),
}

/// Result type for parse operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;
