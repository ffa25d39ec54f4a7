//! EPUB parser
//!
//! Resolves the root package document through the fixed
//! `META-INF/container.xml` pointer, reads Dublin Core and `meta property`
//! package metadata, then walks the manifest for the navigation sources
//! (EPUB3 Navigation Document, EPUB2 NCX) and the spine for chapter text.
//! Chapter text extraction fans out across blocking tasks and rejoins in
//! spine order.
//!
//! Missing container.xml or package document is fatal; a broken TOC,
//! cover, or single metadata field is logged and skipped.

use crate::error::{IngestError, IngestResult};
use crate::parse::{
    collapse_whitespace, format_display_date, identifier, page_count, toc, truncate_text,
    ParseOptions,
};
use percent_encoding::percent_decode_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use shelfmark_common::models::{
    CanonicalMetadata, CoverImage, Identifier, IdentifierSource, ParseResult, SourceFormat,
};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

pub async fn parse(bytes: Vec<u8>, options: ParseOptions) -> IngestResult<ParseResult> {
    let extract_cover = options.extract_cover;
    let container = tokio::task::spawn_blocking(move || read_container(bytes, extract_cover))
        .await
        .map_err(|e| IngestError::CorruptContainer(format!("archive task failed: {e}")))??;

    // All chapter reads run concurrently; the join below restores spine
    // order regardless of completion order.
    let chapter_tasks: Vec<_> = container
        .chapters
        .into_iter()
        .map(|xhtml| tokio::task::spawn_blocking(move || extract_body_text(&xhtml)))
        .collect();
    let mut chapter_texts = Vec::with_capacity(chapter_tasks.len());
    for task in futures::future::join_all(chapter_tasks).await {
        match task {
            Ok(text) if !text.is_empty() => chapter_texts.push(text),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Chapter text task failed, skipping chapter"),
        }
    }
    let mut text = chapter_texts.join("\n\n");
    let character_count = text.chars().count();

    // EPUB3 Navigation Document takes priority; NCX is the fallback. The
    // NCX page list is extracted whenever an NCX exists, independent of
    // which variant supplied the TOC.
    let nav_toc = container.nav_content.as_deref().and_then(toc::build_nav_toc);
    let toc_items = match nav_toc {
        Some(items) => Some(items),
        None => container
            .ncx_content
            .as_deref()
            .map(toc::build_ncx_toc)
            .filter(|items| !items.is_empty()),
    };
    let page_list = container
        .ncx_content
        .as_deref()
        .map(toc::parse_ncx_page_list)
        .filter(|items| !items.is_empty());

    let opf = container.opf;
    let mut metadata = build_metadata(&opf);
    metadata.source_format = Some(SourceFormat::Epub);
    metadata.identifier = select_identifier(&opf.identifiers);
    metadata.page_count = Some(page_count::estimate_page_count(
        page_list.as_deref(),
        opf.declared_page_count.as_deref(),
        character_count,
    ));

    truncate_text(&mut text, options.max_text_length);

    Ok(ParseResult {
        text,
        metadata,
        toc: toc_items,
        page_list,
        cover: container.cover,
    })
}

// ----------------------------------------------------------------------------
// Archive access
// ----------------------------------------------------------------------------

struct ContainerData {
    opf: OpfData,
    nav_content: Option<String>,
    ncx_content: Option<String>,
    /// Raw XHTML of each spine document, spine order
    chapters: Vec<String>,
    cover: Option<CoverImage>,
}

fn read_container(bytes: Vec<u8>, extract_cover: bool) -> IngestResult<ContainerData> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::CorruptContainer(format!("not a readable archive: {e}")))?;

    let container_xml = read_entry(&mut archive, "META-INF/container.xml").ok_or_else(|| {
        IngestError::MissingContainerEntry("META-INF/container.xml".to_string())
    })?;
    let opf_path = find_opf_path(&container_xml)?;
    let opf_dir = std::path::Path::new(&opf_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    let opf_content = read_entry(&mut archive, &opf_path)
        .ok_or_else(|| IngestError::MissingContainerEntry(opf_path.clone()))?;
    let opf = parse_opf(&opf_content);

    let nav_content = opf
        .manifest
        .values()
        .find(|item| item.has_property("nav"))
        .and_then(|item| read_entry(&mut archive, &resolve_path(&opf_dir, &item.href)));

    let ncx_href = opf
        .manifest
        .values()
        .find(|item| item.media_type == "application/x-dtbncx+xml")
        .map(|item| item.href.clone())
        .or_else(|| {
            opf.spine_toc_id
                .as_ref()
                .and_then(|id| opf.manifest.get(id))
                .map(|item| item.href.clone())
        });
    let ncx_content =
        ncx_href.and_then(|href| read_entry(&mut archive, &resolve_path(&opf_dir, &href)));

    let mut chapters = Vec::new();
    for id in &opf.spine_ids {
        let Some(item) = opf.manifest.get(id) else {
            debug!(idref = %id, "Spine reference missing from manifest, skipping");
            continue;
        };
        if !item.media_type.contains("xhtml") && !item.media_type.contains("html") {
            continue;
        }
        match read_entry(&mut archive, &resolve_path(&opf_dir, &item.href)) {
            Some(content) => chapters.push(content),
            None => warn!(href = %item.href, "Spine document unreadable, skipping"),
        }
    }

    let cover = if extract_cover {
        read_cover(&mut archive, &opf, &opf_dir)
    } else {
        None
    };

    Ok(ContainerData {
        opf,
        nav_content,
        ncx_content,
        chapters,
        cover,
    })
}

/// Cover resolution: a manifest item flagged `cover-image` wins, else the
/// EPUB2 `meta[name=cover]` pointer. Failures only cost the cover.
fn read_cover(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    opf: &OpfData,
    opf_dir: &str,
) -> Option<CoverImage> {
    let item = opf
        .manifest
        .values()
        .find(|item| item.has_property("cover-image"))
        .or_else(|| {
            opf.epub2_cover_id
                .as_ref()
                .and_then(|id| opf.manifest.get(id))
        })?;

    match read_entry_bytes(archive, &resolve_path(opf_dir, &item.href)) {
        Some(data) => Some(CoverImage {
            data,
            media_type: item.media_type.clone(),
        }),
        None => {
            warn!(href = %item.href, "Cover image unreadable");
            None
        }
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, path: &str) -> Option<String> {
    read_entry_bytes(archive, path).map(|data| String::from_utf8_lossy(strip_bom(&data)).into_owned())
}

fn read_entry_bytes(archive: &mut ZipArchive<Cursor<Vec<u8>>>, path: &str) -> Option<Vec<u8>> {
    // Hrefs may be percent-encoded relative to the archive entry name
    let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();
    for candidate in [path, decoded.as_str()] {
        if let Ok(mut entry) = archive.by_name(candidate) {
            let mut data = Vec::with_capacity(entry.size() as usize);
            if entry.read_to_end(&mut data).is_ok() {
                return Some(data);
            }
            return None;
        }
    }
    None
}

fn resolve_path(dir: &str, href: &str) -> String {
    if dir.is_empty() {
        return href.to_string();
    }
    // Normalize ../ segments against the OPF directory
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Strip UTF-8 BOM if present.
fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(data)
}

fn find_opf_path(container_xml: &str) -> IngestResult<String> {
    let mut reader = Reader::from_str(container_xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr_value(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IngestError::CorruptContainer(format!(
                    "container.xml unreadable: {e}"
                )))
            }
            _ => {}
        }
    }

    Err(IngestError::CorruptContainer(
        "no rootfile in container.xml".to_string(),
    ))
}

// ----------------------------------------------------------------------------
// Package document
// ----------------------------------------------------------------------------

struct ManifestItem {
    href: String,
    media_type: String,
    properties: Option<String>,
}

impl ManifestItem {
    fn has_property(&self, wanted: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == wanted))
    }
}

/// An EPUB3 `<meta property="...">value</meta>` element
struct MetaProperty {
    property: String,
    refines: Option<String>,
    id: Option<String>,
    value: String,
}

struct OpfData {
    titles: Vec<String>,
    creators: Vec<String>,
    subjects: Vec<String>,
    publisher: Option<String>,
    date: Option<String>,
    language: Option<String>,
    /// (scheme attribute, raw value) per `dc:identifier`
    identifiers: Vec<(Option<String>, String)>,
    meta_properties: Vec<MetaProperty>,
    declared_page_count: Option<String>,
    epub_version: Option<String>,
    manifest: HashMap<String, ManifestItem>,
    spine_ids: Vec<String>,
    spine_toc_id: Option<String>,
    epub2_cover_id: Option<String>,
}

fn parse_opf(content: &str) -> OpfData {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut data = OpfData {
        titles: Vec::new(),
        creators: Vec::new(),
        subjects: Vec::new(),
        publisher: None,
        date: None,
        language: None,
        identifiers: Vec::new(),
        meta_properties: Vec::new(),
        declared_page_count: None,
        epub_version: None,
        manifest: HashMap::new(),
        spine_ids: Vec::new(),
        spine_toc_id: None,
        epub2_cover_id: None,
    };

    let mut in_metadata = false;
    let mut current_dc: Option<String> = None;
    let mut current_scheme: Option<String> = None;
    let mut current_meta: Option<MetaProperty> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"package" => {
                        data.epub_version = attr_value(&e, b"version");
                    }
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"publisher" | b"subject"
                    | b"date" => {
                        if in_metadata {
                            current_dc = Some(
                                String::from_utf8_lossy(local_name(name.as_ref())).to_string(),
                            );
                            buf_text.clear();
                        }
                    }
                    b"identifier" => {
                        if in_metadata {
                            current_dc = Some("identifier".to_string());
                            current_scheme = attr_value(&e, b"scheme");
                            buf_text.clear();
                        }
                    }
                    b"meta" => {
                        if in_metadata {
                            if let Some(property) = attr_value(&e, b"property") {
                                current_meta = Some(MetaProperty {
                                    property,
                                    refines: attr_value(&e, b"refines"),
                                    id: attr_value(&e, b"id"),
                                    value: String::new(),
                                });
                            } else {
                                read_epub2_cover_meta(&e, &mut data);
                            }
                        }
                    }
                    b"item" => read_manifest_item(&e, &mut data),
                    b"itemref" => read_spine_itemref(&e, &mut data),
                    b"spine" => {
                        data.spine_toc_id = attr_value(&e, b"toc");
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"item" => read_manifest_item(&e, &mut data),
                b"itemref" => read_spine_itemref(&e, &mut data),
                b"meta" => read_epub2_cover_meta(&e, &mut data),
                b"spine" => {
                    data.spine_toc_id = attr_value(&e, b"toc");
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let raw = String::from_utf8_lossy(e.as_ref());
                if let Some(meta) = current_meta.as_mut() {
                    meta.value.push_str(&raw);
                } else if current_dc.is_some() {
                    buf_text.push_str(&raw);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    if let Some(meta) = current_meta.as_mut() {
                        meta.value.push_str(&resolved);
                    } else if current_dc.is_some() {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = false,
                    b"meta" => {
                        if let Some(meta) = current_meta.take() {
                            if !meta.value.trim().is_empty() {
                                data.meta_properties.push(meta);
                            }
                        }
                    }
                    _ => {
                        if let Some(ref element) = current_dc {
                            let value = collapse_whitespace(&buf_text);
                            if !value.is_empty() {
                                match element.as_str() {
                                    "title" => data.titles.push(value),
                                    "creator" => data.creators.push(value),
                                    "subject" => data.subjects.push(value),
                                    "publisher" if data.publisher.is_none() => {
                                        data.publisher = Some(value)
                                    }
                                    "date" if data.date.is_none() => data.date = Some(value),
                                    "language" if data.language.is_none() => {
                                        data.language = Some(value)
                                    }
                                    "identifier" => {
                                        data.identifiers.push((current_scheme.take(), value))
                                    }
                                    _ => {}
                                }
                            }
                            current_dc = None;
                            current_scheme = None;
                            buf_text.clear();
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "Package document parse stopped early");
                break;
            }
            _ => {}
        }
    }

    data.declared_page_count = data
        .meta_properties
        .iter()
        .find(|m| m.property == "schema:numberOfPages")
        .map(|m| m.value.trim().to_string());

    data
}

fn read_manifest_item(e: &BytesStart<'_>, data: &mut OpfData) {
    let id = attr_value(e, b"id");
    let href = attr_value(e, b"href");
    if let (Some(id), Some(href)) = (id, href) {
        data.manifest.insert(
            id,
            ManifestItem {
                href,
                media_type: attr_value(e, b"media-type").unwrap_or_default(),
                properties: attr_value(e, b"properties"),
            },
        );
    }
}

fn read_spine_itemref(e: &BytesStart<'_>, data: &mut OpfData) {
    if let Some(idref) = attr_value(e, b"idref") {
        data.spine_ids.push(idref);
    }
}

/// EPUB2 cover pointer: `<meta name="cover" content="id"/>`
fn read_epub2_cover_meta(e: &BytesStart<'_>, data: &mut OpfData) {
    if attr_value(e, b"name").as_deref() == Some("cover") {
        if let Some(content) = attr_value(e, b"content") {
            data.epub2_cover_id = Some(content);
        }
    }
}

fn build_metadata(opf: &OpfData) -> CanonicalMetadata {
    let mut metadata = CanonicalMetadata {
        title: opf.titles.first().cloned(),
        author: non_empty_join(&opf.creators, ", "),
        subject: non_empty_join(&opf.subjects, ", "),
        publisher: opf.publisher.clone(),
        publication_date: opf.date.as_deref().map(format_display_date),
        language: opf.language.clone(),
        epub_version: opf.epub_version.clone(),
        ..Default::default()
    };

    for meta in &opf.meta_properties {
        let value = collapse_whitespace(&meta.value);
        match meta.property.as_str() {
            "schema:accessibilityFeature" => metadata.accessibility_features.push(value),
            "schema:accessMode" => metadata.access_modes.push(value),
            "schema:accessModeSufficient" => metadata.access_modes_sufficient.push(value),
            "schema:accessibilityHazard" => metadata.hazards.push(value),
            "a11y:certifiedBy" => {
                metadata.certification = Some(value);
            }
            "dcterms:conformsTo" => {
                if metadata.certification.is_none() {
                    metadata.certification = Some(value);
                }
            }
            _ => {}
        }
    }

    // Series: <meta property="belongs-to-collection" id="c">Name</meta>
    // refined by <meta refines="#c" property="group-position">N</meta>
    if let Some(series) = opf
        .meta_properties
        .iter()
        .find(|m| m.property == "belongs-to-collection")
    {
        metadata.series = Some(collapse_whitespace(&series.value));
        if let Some(series_id) = &series.id {
            let target = format!("#{series_id}");
            metadata.series_position = opf
                .meta_properties
                .iter()
                .find(|m| m.property == "group-position" && m.refines.as_deref() == Some(&target))
                .and_then(|m| m.value.trim().parse().ok());
        }
    }

    metadata
}

/// Pick the identifier to normalize: a `dc:identifier` with an ISBN scheme
/// attribute wins, else the first identifier. The chosen raw string always
/// runs through the ISBN extractor, since identifier text routinely carries
/// `urn:` prefixes and separators.
fn select_identifier(identifiers: &[(Option<String>, String)]) -> Option<Identifier> {
    let chosen = identifiers
        .iter()
        .find(|(scheme, _)| {
            scheme
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("isbn"))
        })
        .or_else(|| identifiers.first())?;

    identifier::extract_isbn(&chosen.1).map(|value| Identifier {
        value,
        source: IdentifierSource::Metadata,
    })
}

fn non_empty_join(values: &[String], separator: &str) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(separator))
    }
}

// ----------------------------------------------------------------------------
// Chapter text
// ----------------------------------------------------------------------------

/// Visible text of an XHTML document body, whitespace-collapsed.
fn extract_body_text(xhtml: &str) -> String {
    let mut reader = Reader::from_str(xhtml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut in_body = false;
    // Depth inside elements whose text is never visible
    let mut hidden_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"body" => in_body = true,
                b"script" | b"style" if in_body => hidden_depth += 1,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_body && hidden_depth == 0 {
                    out.push_str(&String::from_utf8_lossy(e.as_ref()));
                    out.push(' ');
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_body && hidden_depth == 0 {
                    if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        out.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"body" => break,
                b"script" | b"style" if hidden_depth > 0 => hidden_depth -= 1,
                _ => {
                    // Block boundaries separate words
                    out.push(' ');
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "Chapter markup parse stopped early");
                break;
            }
            _ => {}
        }
    }

    collapse_whitespace(&out)
}

// ----------------------------------------------------------------------------
// XML helpers
// ----------------------------------------------------------------------------

fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == key)
        .and_then(|a| String::from_utf8(a.value.to_vec()).ok())
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some(" ".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16) {
            return char::from_u32(code).map(|c| c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#') {
        if let Ok(code) = dec.parse::<u32>() {
            return char::from_u32(code).map(|c| c.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r##"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>The Fellowship of the Ring</dc:title>
    <dc:creator>J.R.R. Tolkien</dc:creator>
    <dc:language>en</dc:language>
    <dc:publisher>HarperCollins</dc:publisher>
    <dc:date>1991-07-01</dc:date>
    <dc:subject>Fantasy</dc:subject>
    <dc:identifier id="bookid">urn:uuid:0000-1111</dc:identifier>
    <dc:identifier opf:scheme="ISBN" xmlns:opf="http://www.idpf.org/2007/opf">ISBN 978-0-261-10235-4</dc:identifier>
    <meta property="schema:accessMode">textual</meta>
    <meta property="schema:accessibilityFeature">tableOfContents</meta>
    <meta property="schema:numberOfPages">531</meta>
    <meta property="belongs-to-collection" id="series">The Lord of the Rings</meta>
    <meta refines="#series" property="group-position">1</meta>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="images/cover.jpg" media-type="image/jpeg"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
  </spine>
</package>"##;

    #[test]
    fn opf_metadata_extraction() {
        let opf = parse_opf(OPF);
        assert_eq!(opf.titles, vec!["The Fellowship of the Ring"]);
        assert_eq!(opf.creators, vec!["J.R.R. Tolkien"]);
        assert_eq!(opf.epub_version.as_deref(), Some("3.0"));
        assert_eq!(opf.declared_page_count.as_deref(), Some("531"));
        assert_eq!(opf.spine_ids, vec!["ch1"]);
        assert_eq!(opf.spine_toc_id.as_deref(), Some("ncx"));
        assert_eq!(opf.epub2_cover_id.as_deref(), Some("cover-img"));
    }

    #[test]
    fn isbn_scheme_identifier_preferred() {
        let opf = parse_opf(OPF);
        let id = select_identifier(&opf.identifiers).unwrap();
        assert_eq!(id.value, "9780261102354");
        assert_eq!(id.source, IdentifierSource::Metadata);
    }

    #[test]
    fn first_identifier_used_without_isbn_scheme() {
        let identifiers = vec![
            (None, "urn:isbn:978-0-261-10334-4".to_string()),
            (None, "urn:uuid:dead-beef".to_string()),
        ];
        let id = select_identifier(&identifiers).unwrap();
        assert_eq!(id.value, "9780261103344");
    }

    #[test]
    fn unparseable_identifier_yields_none() {
        let identifiers = vec![(None, "urn:uuid:dead-beef".to_string())];
        assert!(select_identifier(&identifiers).is_none());
    }

    #[test]
    fn metadata_carries_accessibility_and_series() {
        let opf = parse_opf(OPF);
        let metadata = build_metadata(&opf);
        assert_eq!(metadata.access_modes, vec!["textual"]);
        assert_eq!(metadata.accessibility_features, vec!["tableOfContents"]);
        assert_eq!(metadata.series.as_deref(), Some("The Lord of the Rings"));
        assert_eq!(metadata.series_position, Some(1.0));
        assert_eq!(metadata.publication_date.as_deref(), Some("July 1, 1991"));
    }

    #[test]
    fn body_text_collapses_whitespace_and_skips_styles() {
        let xhtml = r#"<html><head><title>Ignored</title></head>
            <body><style>p { color: red; }</style>
            <p>It was   a  dark
            and stormy night.</p><p>Chapter&nbsp;one begins.</p></body></html>"#;
        assert_eq!(
            extract_body_text(xhtml),
            "It was a dark and stormy night. Chapter one begins."
        );
    }

    #[test]
    fn relative_hrefs_resolve_against_opf_dir() {
        assert_eq!(resolve_path("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/text", "../images/cover.jpg"), "OEBPS/images/cover.jpg");
        assert_eq!(resolve_path("", "ch1.xhtml"), "ch1.xhtml");
    }
}
