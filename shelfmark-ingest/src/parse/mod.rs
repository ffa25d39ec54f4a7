//! Format parsers and the dispatch boundary
//!
//! Format selection happens exactly once, here, by inspecting the declared
//! media type, then the file extension, then the leading bytes. Each
//! variant of the closed `ParserKind` union implements the same contract:
//! bytes + options in, a complete `ParseResult` out, raced against a hard
//! wall-clock timeout. Shared code never branches on format again.

pub mod audiobook;
pub mod epub;
pub mod identifier;
pub mod page_count;
pub mod pdf;
pub mod toc;

use crate::error::{IngestError, IngestResult};
use shelfmark_common::models::ParseResult;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard wall-clock limit for a single parse call. Whichever side settles
/// first wins; the loser's in-flight work is abandoned, never observed.
pub const PARSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on extracted text length, in characters.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 200_000;

/// Options for a single parse call
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Attempt cover-image extraction (failures are swallowed)
    pub extract_cover: bool,
    /// Truncation cap for extracted text, in characters
    pub max_text_length: usize,
    /// Original file name, used for extension detection and stub titles
    pub file_name: Option<String>,
    /// Declared media type, when the transport supplied one
    pub media_type: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extract_cover: false,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            file_name: None,
            media_type: None,
        }
    }
}

/// Closed union of supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Pdf,
    Epub,
    Audiobook,
}

impl ParserKind {
    /// Select a parser from declared media type, then file extension, then
    /// content sniffing. Selection happens once, at this boundary.
    pub fn detect(
        media_type: Option<&str>,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Option<ParserKind> {
        if let Some(mt) = media_type {
            let mt = mt.to_ascii_lowercase();
            if mt.contains("pdf") {
                return Some(ParserKind::Pdf);
            }
            if mt.contains("epub") {
                return Some(ParserKind::Epub);
            }
            if mt.contains("audiobook") || mt.starts_with("audio/") {
                return Some(ParserKind::Audiobook);
            }
        }

        if let Some(name) = file_name {
            let lower = name.to_ascii_lowercase();
            if lower.ends_with(".pdf") {
                return Some(ParserKind::Pdf);
            }
            if lower.ends_with(".epub") {
                return Some(ParserKind::Epub);
            }
            if [".audiobook", ".m4b", ".m4a", ".mp3", ".ogg", ".flac", ".aac"]
                .iter()
                .any(|ext| lower.ends_with(ext))
            {
                return Some(ParserKind::Audiobook);
            }
        }

        if let Some(kind) = infer::get(bytes) {
            match kind.mime_type() {
                "application/pdf" => return Some(ParserKind::Pdf),
                "application/epub+zip" => return Some(ParserKind::Epub),
                mime if mime.starts_with("audio/") => return Some(ParserKind::Audiobook),
                _ => {}
            }
        }

        // Bare RWPM manifest JSON
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
        if head.trim_start().starts_with('{') && head.contains("readingOrder") {
            return Some(ParserKind::Audiobook);
        }

        None
    }
}

/// Parse a source file into a `ParseResult`, raced against [`PARSE_TIMEOUT`].
///
/// CPU-bound decoding runs on blocking tasks; when the timeout fires, the
/// in-flight task is detached and its output dropped, so a slow parser can
/// never corrupt or partially populate a returned result.
pub async fn parse(bytes: Vec<u8>, options: ParseOptions) -> IngestResult<ParseResult> {
    let kind = ParserKind::detect(
        options.media_type.as_deref(),
        options.file_name.as_deref(),
        &bytes,
    )
    .ok_or_else(|| {
        IngestError::UnsupportedFormat(
            options
                .file_name
                .clone()
                .or_else(|| options.media_type.clone())
                .unwrap_or_else(|| "unknown source".to_string()),
        )
    })?;

    debug!(kind = ?kind, size = bytes.len(), "Dispatching parser");

    let parse_future = run_parser(kind, bytes, options);
    match tokio::time::timeout(PARSE_TIMEOUT, parse_future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(kind = ?kind, "Parse timed out, abandoning in-flight work");
            Err(IngestError::TimedOut {
                seconds: PARSE_TIMEOUT.as_secs(),
            })
        }
    }
}

async fn run_parser(
    kind: ParserKind,
    bytes: Vec<u8>,
    options: ParseOptions,
) -> IngestResult<ParseResult> {
    match kind {
        ParserKind::Pdf => {
            spawn_parse(move || pdf::parse(&bytes, &options)).await
        }
        ParserKind::Epub => epub::parse(bytes, options).await,
        ParserKind::Audiobook => {
            spawn_parse(move || audiobook::parse(&bytes, &options)).await
        }
    }
}

async fn spawn_parse<F>(f: F) -> IngestResult<ParseResult>
where
    F: FnOnce() -> IngestResult<ParseResult> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IngestError::CorruptContainer(format!("parser task failed: {e}")))?
}

// ----------------------------------------------------------------------------
// Shared helpers
// ----------------------------------------------------------------------------

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate extracted text to `max_len` characters, logging (not failing).
pub(crate) fn truncate_text(text: &mut String, max_len: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_len) {
        warn!(
            max_len,
            original_chars = text.chars().count(),
            "Truncating extracted text"
        );
        text.truncate(byte_idx);
    }
}

/// Format a raw date string for display: "2020-03-05" → "March 5, 2020",
/// "2020-03" → "March 2020", "2020" → "2020". Unrecognized input passes
/// through unchanged.
pub(crate) fn format_display_date(raw: &str) -> String {
    use chrono::NaiveDate;

    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%B %-d, %Y").to_string();
    }
    // RFC 3339 timestamps reduce to their date part
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%B %-d, %Y").to_string();
        }
    }
    if raw.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return date.format("%B %Y").to_string();
        }
    }

    raw.to_string()
}
