//! PDF parser
//!
//! Structure (page count, info dictionary) comes from `lopdf`; body text
//! comes from `pdf-extract`, which separates pages with form feeds. PDFs
//! carry an authoritative physical page count, so the reflowable page-count
//! cascade is bypassed entirely.
//!
//! ISBN search order: an `ISBN`/`e-ISBN` label in the first five pages of
//! text wins (source `text`), then the info-dictionary scan (source
//! `metadata`).

use crate::error::{IngestError, IngestResult};
use crate::parse::{collapse_whitespace, format_display_date, identifier, truncate_text, ParseOptions};
use lopdf::{Dictionary, Document, Object};
use once_cell::sync::Lazy;
use regex::Regex;
use shelfmark_common::models::{
    CanonicalMetadata, CoverImage, Identifier, IdentifierSource, PageCount, PageCountKind,
    ParseResult, SourceFormat,
};
use tracing::warn;

/// Pages of extracted text scanned for an ISBN label.
const ISBN_SCAN_PAGES: usize = 5;

static ISBN_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\be?-?ISBN[^0-9]{0,4}((?:[0-9][-\s]?){9,15}[0-9Xx])").expect("static regex")
});

pub fn parse(bytes: &[u8], options: &ParseOptions) -> IngestResult<ParseResult> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| IngestError::InvalidPdf(format!("failed to load document: {e}")))?;

    if doc.is_encrypted() {
        return Err(IngestError::InvalidPdf(
            "document is password-protected".to_string(),
        ));
    }

    let physical_pages = doc.get_pages().len() as u32;

    // Text extraction failure on a structurally valid document is
    // recoverable: metadata extraction still succeeds with empty text.
    let mut text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "PDF text extraction failed, continuing with metadata only");
            String::new()
        }
    };

    let info = info_dictionary(&doc);
    let mut metadata = metadata_from_info(info.as_ref());
    metadata.source_format = Some(SourceFormat::Pdf);
    metadata.page_count = Some(PageCount {
        value: physical_pages,
        kind: PageCountKind::Actual,
    });
    metadata.identifier = find_identifier(&text, info.as_ref());

    let cover = if options.extract_cover {
        render_cover(bytes)
    } else {
        None
    };

    truncate_text(&mut text, options.max_text_length);

    Ok(ParseResult {
        text,
        metadata,
        toc: None,
        page_list: None,
        cover,
    })
}

/// Resolve the trailer's Info entry to an owned field map.
fn info_dictionary(doc: &Document) -> Option<Vec<(String, String)>> {
    let info = doc.trailer.get(b"Info").ok()?;
    let dict: &Dictionary = match info {
        Object::Reference(id) => doc.get_dictionary(*id).ok()?,
        Object::Dictionary(d) => d,
        _ => return None,
    };

    let mut fields = Vec::new();
    for (key, value) in dict.iter() {
        if let Object::String(raw, _) = value {
            let key = String::from_utf8_lossy(key).to_string();
            let value = decode_pdf_string(raw);
            if !value.trim().is_empty() {
                fields.push((key, value));
            }
        }
    }
    Some(fields)
}

fn metadata_from_info(info: Option<&Vec<(String, String)>>) -> CanonicalMetadata {
    let mut metadata = CanonicalMetadata::default();
    let Some(fields) = info else {
        return metadata;
    };

    for (key, value) in fields {
        let value = collapse_whitespace(value);
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "Title" => metadata.title = Some(value),
            "Author" => metadata.author = Some(value),
            "Subject" => metadata.subject = Some(value),
            "Keywords" => metadata.keywords = Some(value),
            "Producer" => metadata.publisher = Some(value),
            "CreationDate" => metadata.publication_date = parse_pdf_date(&value),
            _ => {}
        }
    }

    metadata
}

/// Scan the first five pages of text for an ISBN label, then fall back to
/// the info dictionary. Whichever succeeds first records its source.
fn find_identifier(
    text: &str,
    info: Option<&Vec<(String, String)>>,
) -> Option<Identifier> {
    let head: String = text
        .split('\x0C')
        .take(ISBN_SCAN_PAGES)
        .collect::<Vec<_>>()
        .join("\n");

    if let Some(captures) = ISBN_LABEL_RE.captures(&head) {
        if let Some(value) = identifier::extract_isbn(&captures[1]) {
            return Some(Identifier {
                value,
                source: IdentifierSource::Text,
            });
        }
    }

    let combined = info?
        .iter()
        .map(|(_, v)| v.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    identifier::extract_isbn(&combined).map(|value| Identifier {
        value,
        source: IdentifierSource::Metadata,
    })
}

/// Decode a PDF text string: UTF-16BE when BOM-prefixed, else treated as
/// (mostly Latin-1-compatible) byte text.
fn decode_pdf_string(raw: &[u8]) -> String {
    if raw.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// Convert the `D:YYYYMMDD...` PDF date form to a display date.
fn parse_pdf_date(raw: &str) -> Option<String> {
    let digits = raw.trim().strip_prefix("D:").unwrap_or(raw.trim());
    if digits.len() < 8 || !digits.is_char_boundary(8) {
        return None;
    }
    let (year, month, day) = (
        digits.get(0..4)?.parse::<i32>().ok()?,
        digits.get(4..6)?.parse::<u32>().ok()?,
        digits.get(6..8)?.parse::<u32>().ok()?,
    );
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| format_display_date(&d.format("%Y-%m-%d").to_string()))
}

#[cfg(feature = "pdfium")]
fn render_cover(bytes: &[u8]) -> Option<CoverImage> {
    use pdfium_render::prelude::*;

    let render = || -> Result<CoverImage, Box<dyn std::error::Error>> {
        let pdfium = Pdfium::new(Pdfium::bind_to_system_library()?);
        let doc = pdfium.load_pdf_from_byte_slice(bytes, None)?;
        let page = doc.pages().first()?;
        let bitmap = page.render_with_config(
            &PdfRenderConfig::new().set_target_width(600).set_maximum_height(900),
        )?;
        let image = bitmap.as_image();
        let mut data = Vec::new();
        image.write_to(
            &mut std::io::Cursor::new(&mut data),
            image::ImageFormat::Png,
        )?;
        Ok(CoverImage {
            data,
            media_type: "image/png".to_string(),
        })
    };

    match render() {
        Ok(cover) => Some(cover),
        Err(e) => {
            // Cover failures never fail the parse
            warn!(error = %e, "PDF cover rasterization failed");
            None
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn render_cover(_bytes: &[u8]) -> Option<CoverImage> {
    tracing::debug!("Cover extraction requested but the pdfium feature is not enabled");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_bytes_are_fatal() {
        let result = parse(b"not a pdf at all", &ParseOptions::default());
        assert!(matches!(result, Err(IngestError::InvalidPdf(_))));
    }

    #[test]
    fn pdf_date_conversion() {
        assert_eq!(
            parse_pdf_date("D:20200305120000Z").as_deref(),
            Some("March 5, 2020")
        );
        assert_eq!(parse_pdf_date("D:2020").as_deref(), None);
        assert_eq!(
            parse_pdf_date("20011231").as_deref(),
            Some("December 31, 2001")
        );
    }

    #[test]
    fn utf16_info_strings_decode() {
        // "Tést" as UTF-16BE with BOM
        let raw = [0xFE, 0xFF, 0x00, 0x54, 0x00, 0xE9, 0x00, 0x73, 0x00, 0x74];
        assert_eq!(decode_pdf_string(&raw), "Tést");
        assert_eq!(decode_pdf_string(b"Plain"), "Plain");
    }

    #[test]
    fn text_isbn_label_beats_info_dictionary() {
        let text = "Copyright page\ne-ISBN: 978-0-261-10334-4\n\x0Crest of book";
        let info = vec![("Keywords".to_string(), "ISBN 0261103342".to_string())];
        let id = find_identifier(text, Some(&info)).unwrap();
        assert_eq!(id.value, "9780261103344");
        assert_eq!(id.source, IdentifierSource::Text);
    }

    #[test]
    fn info_dictionary_isbn_is_metadata_sourced() {
        let text = "no identifiers in the body text";
        let info = vec![("Subject".to_string(), "ISBN 978-0-261-10334-4".to_string())];
        let id = find_identifier(text, Some(&info)).unwrap();
        assert_eq!(id.value, "9780261103344");
        assert_eq!(id.source, IdentifierSource::Metadata);
    }

    #[test]
    fn isbn_label_outside_scan_window_ignored() {
        // ISBN appears on page 6; the text scan covers five pages only
        let mut text = String::new();
        for i in 0..5 {
            text.push_str(&format!("page {i}\x0C"));
        }
        text.push_str("ISBN 978-0-261-10334-4");
        assert_eq!(find_identifier(&text, None), None);
    }
}
