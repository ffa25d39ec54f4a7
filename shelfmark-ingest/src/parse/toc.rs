//! Table-of-contents construction from EPUB navigation sources
//!
//! Two input variants produce the same canonical `TocItem` tree: the EPUB3
//! Navigation Document (`<nav epub:type="toc">` with nested `<ol>/<li>`)
//! and the EPUB2 NCX `navMap` (`navPoint` tree). Only one variant runs per
//! parse (the Navigation Document takes priority), but the NCX page list
//! is extracted whenever an NCX resource exists, regardless of which
//! variant supplied the TOC.
//!
//! All builders are side-effect-free: they construct and return fresh
//! nodes, never mutating shared document state.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use shelfmark_common::models::{PageListItem, TocItem};

use super::collapse_whitespace;

/// Build a TOC from an EPUB3 Navigation Document.
///
/// Locates the single `nav` whose type attribute token list contains `toc`
/// (case-insensitive) and walks its first ordered list. List items take
/// their first anchor for label/href and recurse into any nested ordered
/// list; items lacking an anchor are skipped, not inserted as empty nodes.
///
/// Returns `None` when no toc nav exists (the caller then falls back to
/// the NCX variant).
pub fn build_nav_toc(content: &str) -> Option<Vec<TocItem>> {
    struct LiFrame {
        label: String,
        href: Option<String>,
        children: Vec<TocItem>,
        anchor_seen: bool,
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut found_toc_nav = false;
    let mut in_toc_nav = false;
    let mut inner_nav_depth = 0usize;
    let mut ol_depth = 0usize;
    let mut first_ol_finished = false;
    let mut in_anchor = false;

    let mut root: Vec<TocItem> = Vec::new();
    let mut li_stack: Vec<LiFrame> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"nav" => {
                    if in_toc_nav {
                        inner_nav_depth += 1;
                    } else if !found_toc_nav && nav_type_is_toc(&e) {
                        found_toc_nav = true;
                        in_toc_nav = true;
                    }
                }
                b"ol" if in_toc_nav && !first_ol_finished => {
                    ol_depth += 1;
                }
                b"li" if in_toc_nav && ol_depth > 0 && !first_ol_finished => {
                    li_stack.push(LiFrame {
                        label: String::new(),
                        href: None,
                        children: Vec::new(),
                        anchor_seen: false,
                    });
                }
                b"a" if in_toc_nav => {
                    if let Some(frame) = li_stack.last_mut() {
                        if !frame.anchor_seen {
                            frame.anchor_seen = true;
                            frame.href = attr_value(&e, b"href");
                            in_anchor = true;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                // Self-closing anchor: href without label text, skipped below
                if local_name(e.name().as_ref()) == b"a" && in_toc_nav {
                    if let Some(frame) = li_stack.last_mut() {
                        if !frame.anchor_seen {
                            frame.anchor_seen = true;
                            frame.href = attr_value(&e, b"href");
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_anchor {
                    if let Some(frame) = li_stack.last_mut() {
                        frame.label.push_str(&String::from_utf8_lossy(e.as_ref()));
                        frame.label.push(' ');
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_anchor {
                    if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        if let Some(frame) = li_stack.last_mut() {
                            frame.label.push_str(&resolved);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"a" => in_anchor = false,
                b"ol" if in_toc_nav && ol_depth > 0 => {
                    ol_depth -= 1;
                    if ol_depth == 0 {
                        first_ol_finished = true;
                    }
                }
                b"li" if in_toc_nav => {
                    if let Some(frame) = li_stack.pop() {
                        let label = collapse_whitespace(&frame.label);
                        if let Some(href) = frame.href.filter(|_| !label.is_empty()) {
                            let mut item = TocItem::new(label, href);
                            item.children = frame.children;
                            match li_stack.last_mut() {
                                Some(parent) => parent.children.push(item),
                                None => root.push(item),
                            }
                        }
                    }
                }
                b"nav" if in_toc_nav => {
                    if inner_nav_depth > 0 {
                        inner_nav_depth -= 1;
                    } else {
                        in_toc_nav = false;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                // Malformed navigation markup is recoverable: keep whatever
                // tree was built before the error.
                tracing::warn!(error = %e, "Navigation document parse stopped early");
                break;
            }
            _ => {}
        }
    }

    found_toc_nav.then_some(root)
}

/// Build a TOC from an EPUB2 NCX `navMap`.
///
/// Each `navPoint` becomes a node from its first `navLabel > text` and
/// first `content/@src`; nested `navPoint` elements become children.
/// Points missing either field are dropped along with nothing else.
pub fn build_ncx_toc(content: &str) -> Vec<TocItem> {
    struct NavPointFrame {
        children: Vec<TocItem>,
        text: Option<String>,
        src: Option<String>,
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<NavPointFrame> = vec![NavPointFrame {
        children: Vec::new(),
        text: None,
        src: None,
    }];
    let mut in_nav_map = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navMap" => in_nav_map = true,
                b"navPoint" if in_nav_map => {
                    stack.push(NavPointFrame {
                        children: Vec::new(),
                        text: None,
                        src: None,
                    });
                }
                b"text" if in_nav_map => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_nav_map && local_name(e.name().as_ref()) == b"content" {
                    if let Some(frame) = stack.last_mut() {
                        if frame.src.is_none() {
                            frame.src = attr_value(&e, b"src");
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Some(frame) = stack.last_mut() {
                        let raw = String::from_utf8_lossy(e.as_ref());
                        match &mut frame.text {
                            Some(existing) => existing.push_str(&raw),
                            None => frame.text = Some(raw.into_owned()),
                        }
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text {
                    if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        if let Some(frame) = stack.last_mut() {
                            match &mut frame.text {
                                Some(existing) => existing.push_str(&resolved),
                                None => frame.text = Some(resolved),
                            }
                        }
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"navMap" => in_nav_map = false,
                b"text" => in_text = false,
                b"navPoint" if in_nav_map => {
                    if let Some(frame) = stack.pop() {
                        if let (Some(text), Some(src)) = (frame.text, frame.src) {
                            let label = collapse_whitespace(&text);
                            if !label.is_empty() {
                                let mut item = TocItem::new(label, src);
                                item.children = frame.children;
                                if let Some(parent) = stack.last_mut() {
                                    parent.children.push(item);
                                }
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "NCX parse stopped early");
                break;
            }
            _ => {}
        }
    }

    stack.pop().map(|f| f.children).unwrap_or_default()
}

/// Extract the NCX `pageList` as a flat ordered sequence.
///
/// Each `pageTarget` yields `{label, page_number}` where the number parses
/// the `value` attribute, else `playOrder`; entries missing either field
/// are filtered out.
pub fn parse_ncx_page_list(content: &str) -> Vec<PageListItem> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut items: Vec<PageListItem> = Vec::new();
    let mut in_page_list = false;
    let mut in_text = false;
    // (number, label) of the pageTarget being read
    let mut current: Option<(Option<u32>, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"pageList" => in_page_list = true,
                b"pageTarget" if in_page_list => {
                    let number = attr_value(&e, b"value")
                        .and_then(|v| v.trim().parse().ok())
                        .or_else(|| {
                            attr_value(&e, b"playOrder").and_then(|v| v.trim().parse().ok())
                        });
                    current = Some((number, String::new()));
                }
                b"text" if in_page_list => in_text = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Some((_, label)) = current.as_mut() {
                        label.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"pageList" => in_page_list = false,
                b"text" => in_text = false,
                b"pageTarget" if in_page_list => {
                    if let Some((number, label)) = current.take() {
                        let label = collapse_whitespace(&label);
                        if let Some(page_number) = number.filter(|_| !label.is_empty()) {
                            items.push(PageListItem { label, page_number });
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "NCX page list parse stopped early");
                break;
            }
            _ => {}
        }
    }

    items
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Extract local name from a namespaced XML name (e.g. "epub:type" -> "type").
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

/// Does this `nav` element's type attribute mark it as the table of contents?
fn nav_type_is_toc(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|a| {
        local_name(a.key.as_ref()) == b"type"
            && String::from_utf8_lossy(&a.value)
                .split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("toc"))
    })
}

/// Resolve XML entity references that appear in XHTML labels.
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
