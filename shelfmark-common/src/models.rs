//! Canonical bibliographic data model
//!
//! Every format parser collapses its container into these types, and the
//! enrichment layer refines them. `ParseResult` is the JSON document handed
//! to the (external) classification and export stages, so the serde renames
//! here are part of the outward contract.

use serde::{Deserialize, Serialize};

// ============================================================================
// Source format
// ============================================================================

/// The container format a record was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Epub,
    Audiobook,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Pdf => write!(f, "pdf"),
            SourceFormat::Epub => write!(f, "epub"),
            SourceFormat::Audiobook => write!(f, "audiobook"),
        }
    }
}

// ============================================================================
// Page count & identifier
// ============================================================================

/// Whether a page count was read from the source or estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageCountKind {
    Actual,
    Estimated,
}

/// Page count with provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
    pub value: u32,
    #[serde(rename = "type")]
    pub kind: PageCountKind,
}

/// Where an ISBN was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierSource {
    /// Scanned out of extracted body text
    Text,
    /// Read from container metadata (info dictionary, `dc:identifier`, manifest)
    Metadata,
}

/// Normalized ISBN identifier
///
/// `value` contains only digits plus an optional trailing `X`: either a
/// 13-digit string starting `978`/`979` or a 10-character string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub value: String,
    pub source: IdentifierSource,
}

// ============================================================================
// Navigation structure
// ============================================================================

/// One entry in the canonical table of contents
///
/// Owned tree: children belong exclusively to their parent and are built
/// fresh per parse, so the structure is finite and never cyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    pub label: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
}

impl TocItem {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    /// Depth of the subtree rooted at this item (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TocItem::depth)
            .max()
            .unwrap_or(0)
    }
}

/// One entry of a print-equivalent page list (flat, document order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListItem {
    pub label: String,
    pub page_number: u32,
}

// ============================================================================
// Canonical metadata record
// ============================================================================

/// The single record type all parsers and resolvers populate and refine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Formatted publication date, e.g. "March 5, 2020"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epub_version: Option<String>,
    /// Human-readable duration label, e.g. "11h 42m 5s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_track_count: Option<u32>,
    pub source_format: Option<SourceFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<PageCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_position: Option<f64>,

    // Accessibility metadata (EPUB `schema:` properties)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessibility_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes_sufficient: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hazards: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<String>,
}

// ============================================================================
// Parse output
// ============================================================================

/// Cover image payload extracted from the container
///
/// The upstream controller decides how to expose this (data URL, object
/// storage, ...); the parse layer only owns the bytes, so the payload is
/// kept out of the serialized ParseResult document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub media_type: String,
}

/// Complete result of a single parse call
///
/// Created once per parse, immutable after return; ownership transfers
/// entirely to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub text: String,
    pub metadata: CanonicalMetadata,
    pub toc: Option<Vec<TocItem>>,
    pub page_list: Option<Vec<PageListItem>>,
    #[serde(skip)]
    pub cover: Option<CoverImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_depth_counts_nesting() {
        let mut root = TocItem::new("Part I", "part1.xhtml");
        let mut ch = TocItem::new("Chapter 1", "ch1.xhtml");
        ch.children.push(TocItem::new("Section 1.1", "ch1.xhtml#s1"));
        root.children.push(ch);

        assert_eq!(root.depth(), 3);
        assert_eq!(TocItem::new("Leaf", "x").depth(), 1);
    }

    #[test]
    fn page_count_serializes_with_type_tag() {
        let pc = PageCount {
            value: 7,
            kind: PageCountKind::Actual,
        };
        let json = serde_json::to_value(&pc).unwrap();
        assert_eq!(json["value"], 7);
        assert_eq!(json["type"], "actual");
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let meta = CanonicalMetadata {
            title: Some("The Hobbit".into()),
            source_format: Some(SourceFormat::Epub),
            page_count: Some(PageCount {
                value: 300,
                kind: PageCountKind::Estimated,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["sourceFormat"], "epub");
        assert_eq!(json["pageCount"]["type"], "estimated");
        // Absent optionals are omitted entirely
        assert!(json.get("narrator").is_none());
    }
}
