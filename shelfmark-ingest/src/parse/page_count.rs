//! Page count derivation for reflowable sources
//!
//! EPUBs have no authoritative page count, so a three-step fallback runs:
//! NCX page list maximum, then the package's declared `schema:numberOfPages`,
//! then a character-density estimate. PDFs bypass this entirely: the
//! decoder reports a physical page count.

use shelfmark_common::models::{PageCount, PageCountKind, PageListItem};

/// Characters of extracted text assumed to fill one printed page.
const CHARS_PER_PAGE: f64 = 1500.0;

/// Derive a page count, first success wins:
///
/// 1. Maximum page number in the NCX page list, when > 0 (`actual`)
/// 2. `schema:numberOfPages` package metadata, when parseable (`actual`)
/// 3. `round(character_count / 1500)`, floored at 1 (`estimated`)
///
/// `character_count` must be the pre-truncation text length: truncation is
/// a transport concern and must not shrink the estimate.
pub fn estimate_page_count(
    page_list: Option<&[PageListItem]>,
    declared_pages: Option<&str>,
    character_count: usize,
) -> PageCount {
    if let Some(pages) = page_list {
        let max = pages.iter().map(|p| p.page_number).max().unwrap_or(0);
        if max > 0 {
            return PageCount {
                value: max,
                kind: PageCountKind::Actual,
            };
        }
    }

    if let Some(raw) = declared_pages {
        match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => {
                return PageCount {
                    value,
                    kind: PageCountKind::Actual,
                };
            }
            _ => {
                tracing::debug!(value = raw, "Ignoring non-numeric declared page count");
            }
        }
    }

    let estimated = (character_count as f64 / CHARS_PER_PAGE).round() as u32;
    PageCount {
        value: estimated.max(1),
        kind: PageCountKind::Estimated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(label: &str, n: u32) -> PageListItem {
        PageListItem {
            label: label.into(),
            page_number: n,
        }
    }

    #[test]
    fn page_list_maximum_wins() {
        let pages = [page("3", 3), page("7", 7), page("2", 2)];
        let result = estimate_page_count(Some(&pages), Some("999"), 1_000_000);
        assert_eq!(result.value, 7);
        assert_eq!(result.kind, PageCountKind::Actual);
    }

    #[test]
    fn declared_count_used_when_no_page_list() {
        let result = estimate_page_count(None, Some("412"), 1_000_000);
        assert_eq!(result.value, 412);
        assert_eq!(result.kind, PageCountKind::Actual);
    }

    #[test]
    fn character_estimate_fallback() {
        let result = estimate_page_count(None, None, 3000);
        assert_eq!(result.value, 2);
        assert_eq!(result.kind, PageCountKind::Estimated);
    }

    #[test]
    fn estimate_floored_at_one() {
        let result = estimate_page_count(None, None, 0);
        assert_eq!(result.value, 1);
        assert_eq!(result.kind, PageCountKind::Estimated);
    }

    #[test]
    fn non_numeric_declared_count_falls_through() {
        let result = estimate_page_count(None, Some("about 300"), 450_000);
        assert_eq!(result.value, 300);
        assert_eq!(result.kind, PageCountKind::Estimated);
    }

    #[test]
    fn empty_page_list_falls_through() {
        let result = estimate_page_count(Some(&[]), None, 1500);
        assert_eq!(result.kind, PageCountKind::Estimated);
        assert_eq!(result.value, 1);
    }
}
