//! Audiobook parser
//!
//! Packaged audiobooks carry a Readium Web Publication Manifest
//! (`manifest.json` inside the zip, or a bare manifest document). Metadata
//! comes straight from the manifest JSON through explicit ordered
//! field-mapping tables, so every provider-shape fallback is auditable in
//! one place. Standalone audio files get a minimal filename-derived stub.
//!
//! No transcription happens here: audio content understanding belongs to a
//! downstream collaborator.

use crate::error::{IngestError, IngestResult};
use crate::parse::{collapse_whitespace, format_display_date, identifier, ParseOptions};
use serde_json::Value;
use shelfmark_common::models::{
    CanonicalMetadata, Identifier, IdentifierSource, ParseResult, SourceFormat, TocItem,
};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

// Ordered field-mapping tables: first present key wins. Paths are
// dot-separated into the manifest object.
const TITLE_PATHS: &[&str] = &["metadata.title", "metadata.name", "title", "name"];
const AUTHOR_PATHS: &[&str] = &["metadata.author", "metadata.authors", "author"];
const NARRATOR_PATHS: &[&str] = &["metadata.narrator", "metadata.readBy", "narrator"];
const PUBLISHER_PATHS: &[&str] = &["metadata.publisher", "publisher"];
const PUBLISHED_PATHS: &[&str] = &["metadata.published", "metadata.modified", "published"];
const LANGUAGE_PATHS: &[&str] = &["metadata.language", "language"];
const IDENTIFIER_PATHS: &[&str] = &["metadata.identifier", "identifier"];
const DURATION_PATHS: &[&str] = &["metadata.duration", "duration"];
const SUBJECT_PATHS: &[&str] = &["metadata.subject", "subject"];

pub fn parse(bytes: &[u8], options: &ParseOptions) -> IngestResult<ParseResult> {
    if bytes.starts_with(b"PK") {
        let manifest = read_packaged_manifest(bytes)?;
        return parse_manifest(&manifest);
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(64)]);
    if head.trim_start().starts_with('{') {
        let manifest: Value = serde_json::from_slice(bytes)
            .map_err(|e| IngestError::CorruptContainer(format!("manifest unreadable: {e}")))?;
        return parse_manifest(&manifest);
    }

    Ok(standalone_stub(options))
}

fn read_packaged_manifest(bytes: &[u8]) -> IngestResult<Value> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::CorruptContainer(format!("not a readable archive: {e}")))?;

    let mut entry = archive
        .by_name("manifest.json")
        .map_err(|_| IngestError::MissingContainerEntry("manifest.json".to_string()))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;

    serde_json::from_str(&content)
        .map_err(|e| IngestError::CorruptContainer(format!("manifest.json unreadable: {e}")))
}

fn parse_manifest(manifest: &Value) -> IngestResult<ParseResult> {
    let reading_order = manifest
        .get("readingOrder")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let duration_seconds = pick(manifest, DURATION_PATHS)
        .and_then(Value::as_f64)
        .or_else(|| {
            let total: f64 = reading_order
                .iter()
                .filter_map(|link| link.get("duration").and_then(Value::as_f64))
                .sum();
            (total > 0.0).then_some(total)
        })
        .map(|secs| secs.round() as u64);

    let metadata = CanonicalMetadata {
        title: pick_localized(manifest, TITLE_PATHS),
        author: pick_contributor(manifest, AUTHOR_PATHS),
        narrator: pick_contributor(manifest, NARRATOR_PATHS),
        subject: pick(manifest, SUBJECT_PATHS).and_then(string_list).map(|s| s.join(", ")),
        publisher: pick_contributor(manifest, PUBLISHER_PATHS),
        publication_date: pick(manifest, PUBLISHED_PATHS)
            .and_then(Value::as_str)
            .map(format_display_date),
        language: pick(manifest, LANGUAGE_PATHS).and_then(first_string),
        duration: duration_seconds.map(format_duration_label),
        duration_seconds,
        audio_format: reading_order
            .first()
            .and_then(|link| link.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        audio_track_count: Some(reading_order.len() as u32),
        source_format: Some(SourceFormat::Audiobook),
        identifier: pick(manifest, IDENTIFIER_PATHS)
            .and_then(Value::as_str)
            .and_then(identifier::extract_isbn)
            .map(|value| Identifier {
                value,
                source: IdentifierSource::Metadata,
            }),
        ..Default::default()
    };

    let toc = manifest
        .get("toc")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(toc_item_from_link).collect::<Vec<_>>())
        .filter(|items: &Vec<TocItem>| !items.is_empty());

    Ok(ParseResult {
        text: String::new(),
        metadata,
        toc,
        page_list: None,
        cover: None,
    })
}

/// Minimal record for a bare audio file: filename-derived title, declared
/// media type, a single track.
fn standalone_stub(options: &ParseOptions) -> ParseResult {
    let title = options.file_name.as_deref().map(|name| {
        let stem = name.rsplit('/').next().unwrap_or(name);
        let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
        collapse_whitespace(&stem.replace(['_', '-'], " "))
    });

    debug!(title = ?title, "Standalone audio file, using stub metadata");

    ParseResult {
        text: String::new(),
        metadata: CanonicalMetadata {
            title,
            audio_format: options.media_type.clone(),
            audio_track_count: Some(1),
            source_format: Some(SourceFormat::Audiobook),
            ..Default::default()
        },
        toc: None,
        page_list: None,
        cover: None,
    }
}

// ----------------------------------------------------------------------------
// Manifest JSON helpers
// ----------------------------------------------------------------------------

/// First present value among dot-separated paths.
fn pick<'a>(root: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        let mut node = root;
        for key in path.split('.') {
            node = node.get(key)?;
        }
        Some(node)
    })
}

/// Localized value: a plain string, or a `{locale: string}` map where the
/// first available locale wins (`en` preferred), or an array's first entry.
fn localized_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("en")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| map.values().find_map(|v| v.as_str().map(str::to_string))),
        Value::Array(items) => items.first().and_then(localized_string),
        _ => None,
    }
}

fn pick_localized(root: &Value, paths: &[&str]) -> Option<String> {
    pick(root, paths)
        .and_then(localized_string)
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
}

/// Contributor value: a string, `{name: ...}` object, or an array of
/// either, joined with commas.
fn contributor_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("name").and_then(localized_string),
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(contributor_string).collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

fn pick_contributor(root: &Value, paths: &[&str]) -> Option<String> {
    pick(root, paths)
        .and_then(contributor_string)
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(first_string),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => {
            let out: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            (!out.is_empty()).then_some(out)
        }
        _ => None,
    }
}

fn toc_item_from_link(link: &Value) -> Option<TocItem> {
    let label = link
        .get("title")
        .or_else(|| link.get("label"))
        .and_then(localized_string)
        .map(|s| collapse_whitespace(&s))
        .filter(|s| !s.is_empty())?;
    let href = link.get("href").and_then(Value::as_str)?;

    let mut item = TocItem::new(label, href);
    if let Some(children) = link.get("children").and_then(Value::as_array) {
        item.children = children.iter().filter_map(toc_item_from_link).collect();
    }
    Some(item)
}

/// Render a second count as an `Hh Mm Ss` label.
fn format_duration_label(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}
