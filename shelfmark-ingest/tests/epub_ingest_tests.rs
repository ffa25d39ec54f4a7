//! End-to-end EPUB ingest tests over in-memory archives
//!
//! Fixtures are built with the same zip crate the parser reads with, so
//! these tests exercise the full container → OPF → spine → TOC path.

use shelfmark_common::models::{IdentifierSource, PageCountKind, SourceFormat};
use shelfmark_ingest::parse::{self, ParseOptions};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Build an EPUB archive: container.xml, the given OPF, plus entries
/// relative to OEBPS/.
fn build_epub(opf: &str, entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    for (path, content) in entries {
        zip.start_file(format!("OEBPS/{path}"), deflated).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

fn chapter(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><html xmlns="http://www.w3.org/1999/xhtml">
<head><title>x</title></head><body><p>{body}</p></body></html>"#
    )
}

fn epub_options() -> ParseOptions {
    ParseOptions {
        media_type: Some("application/epub+zip".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn identifier_and_estimated_page_count() {
    // 45,000 nine-character words collapse to 449,999 characters of
    // chapter text; no NCX page list and no declared page count.
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>The Fellowship of the Ring</dc:title>
    <dc:creator>J.R.R. Tolkien</dc:creator>
    <dc:identifier>ISBN 978-0-261-10334-4</dc:identifier>
  </metadata>
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#;
    let body = "wordwords ".repeat(45_000);
    let bytes = build_epub(opf, &[("ch1.xhtml", &chapter(&body))]);

    let result = parse::parse(bytes, epub_options()).await.unwrap();

    let identifier = result.metadata.identifier.as_ref().unwrap();
    assert_eq!(identifier.value, "9780261103344");
    assert_eq!(identifier.source, IdentifierSource::Metadata);

    let page_count = result.metadata.page_count.unwrap();
    assert_eq!(page_count.value, 300);
    assert_eq!(page_count.kind, PageCountKind::Estimated);

    assert_eq!(result.metadata.source_format, Some(SourceFormat::Epub));
    assert_eq!(
        result.metadata.title.as_deref(),
        Some("The Fellowship of the Ring")
    );
}

#[tokio::test]
async fn page_estimate_uses_pre_truncation_length() {
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Long Book</dc:title>
  </metadata>
  <manifest><item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/></manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#;
    let body = "wordwords ".repeat(45_000);
    let bytes = build_epub(opf, &[("ch1.xhtml", &chapter(&body))]);

    let options = ParseOptions {
        max_text_length: 1000,
        ..epub_options()
    };
    let result = parse::parse(bytes, options).await.unwrap();

    assert_eq!(result.text.chars().count(), 1000);
    // The estimate saw all 449,999 characters
    assert_eq!(result.metadata.page_count.unwrap().value, 300);
}

#[tokio::test]
async fn epub3_nav_doc_beats_ncx_and_page_list_still_read() {
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Navigable</dc:title>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx"><itemref idref="ch1"/></spine>
</package>"#;
    let nav = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol>
  <li><a href="ch1.xhtml">From The Nav Doc</a>
    <ol><li><a href="ch1.xhtml#s">Nested</a></li></ol>
  </li>
</ol></nav></body></html>"#;
    let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>From The NCX</text></navLabel>
      <content src="ch1.xhtml"/>
    </navPoint>
  </navMap>
  <pageList>
    <pageTarget id="p1" value="3" playOrder="1"><navLabel><text>3</text></navLabel><content src="ch1.xhtml"/></pageTarget>
    <pageTarget id="p2" value="7" playOrder="2"><navLabel><text>7</text></navLabel><content src="ch1.xhtml"/></pageTarget>
    <pageTarget id="p3" value="2" playOrder="3"><navLabel><text>2</text></navLabel><content src="ch1.xhtml"/></pageTarget>
  </pageList>
</ncx>"#;
    let bytes = build_epub(
        opf,
        &[
            ("nav.xhtml", nav),
            ("toc.ncx", ncx),
            ("ch1.xhtml", &chapter("Some text.")),
        ],
    );

    let result = parse::parse(bytes, epub_options()).await.unwrap();

    // Navigation Document won the TOC
    let toc = result.toc.unwrap();
    assert_eq!(toc[0].label, "From The Nav Doc");
    assert_eq!(toc[0].children[0].label, "Nested");

    // NCX page list was still extracted, and its maximum is the page count
    let pages = result.page_list.unwrap();
    assert_eq!(pages.len(), 3);
    let page_count = result.metadata.page_count.unwrap();
    assert_eq!(page_count.value, 7);
    assert_eq!(page_count.kind, PageCountKind::Actual);
}

#[tokio::test]
async fn ncx_fallback_when_no_nav_doc() {
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Old Style</dc:title>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx"><itemref idref="ch1"/></spine>
</package>"#;
    let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/">
  <navMap>
    <navPoint id="n1"><navLabel><text>Chapter 1</text></navLabel><content src="ch1.xhtml"/></navPoint>
  </navMap>
</ncx>"#;
    let bytes = build_epub(opf, &[("toc.ncx", ncx), ("ch1.xhtml", &chapter("Text."))]);

    let result = parse::parse(bytes, epub_options()).await.unwrap();

    let toc = result.toc.unwrap();
    assert_eq!(toc[0].label, "Chapter 1");
    assert_eq!(result.metadata.epub_version.as_deref(), Some("2.0"));
    assert!(result.page_list.is_none());
}

#[tokio::test]
async fn spine_order_preserved_in_text() {
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Ordered</dc:title>
  </metadata>
  <manifest>
    <item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
    <item id="b" href="b.xhtml" media-type="application/xhtml+xml"/>
    <item id="c" href="c.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="c"/><itemref idref="a"/><itemref idref="b"/></spine>
</package>"#;
    let bytes = build_epub(
        opf,
        &[
            ("a.xhtml", &chapter("alpha text")),
            ("b.xhtml", &chapter("bravo text")),
            ("c.xhtml", &chapter("charlie text")),
        ],
    );

    let result = parse::parse(bytes, epub_options()).await.unwrap();

    // Spine says c, a, b; chapter joins must honor it
    assert_eq!(result.text, "charlie text\n\nalpha text\n\nbravo text");
}

#[tokio::test]
async fn missing_container_entry_is_fatal() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("mimetype", options).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = parse::parse(bytes, epub_options()).await.unwrap_err();
    assert!(matches!(
        err,
        shelfmark_ingest::IngestError::MissingContainerEntry(_)
    ));
}

#[tokio::test]
async fn garbage_bytes_are_a_corrupt_container() {
    let bytes = b"PK\x03\x04 but not actually a zip".to_vec();
    let err = parse::parse(bytes, epub_options()).await.unwrap_err();
    assert!(matches!(
        err,
        shelfmark_ingest::IngestError::CorruptContainer(_)
            | shelfmark_ingest::IngestError::MissingContainerEntry(_)
    ));
}
