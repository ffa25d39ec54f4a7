//! Merge policy: combining enrichment contexts into canonical metadata
//!
//! Shadow-mode contexts never touch the record. Apply-mode contexts fill
//! gaps only: a field the parser already populated is never overwritten,
//! which makes repeated application with the same contexts idempotent.

use crate::enrich::types::{EnrichmentContext, NormalizedBook};
use shelfmark_common::config::ResolverMode;
use shelfmark_common::models::{
    CanonicalMetadata, Identifier, IdentifierSource, PageCount, PageCountKind,
};
use tracing::debug;

/// Apply zero or more enrichment contexts to canonical metadata.
///
/// Per scalar field: contexts that are not in apply mode, or carry no book,
/// leave the field untouched; apply-mode contexts fill it only when it is
/// currently absent or empty.
pub fn apply_enrichment(
    metadata: &CanonicalMetadata,
    contexts: &[EnrichmentContext],
) -> CanonicalMetadata {
    let mut merged = metadata.clone();

    for ctx in contexts {
        if ctx.mode != ResolverMode::Apply {
            continue;
        }
        let Some(book) = &ctx.book else {
            continue;
        };

        debug!(provider = %ctx.provider, match_type = ?ctx.match_type, "Applying enrichment");

        fill(&mut merged.title, book.title.clone());
        fill(&mut merged.author, preferred_author(book));
        fill(&mut merged.publisher, book.publishers.first().cloned());
        fill(&mut merged.publication_date, book.publication_date.clone());
        fill(&mut merged.series, book.series.clone());

        if merged.series_position.is_none() {
            merged.series_position = book.series_position;
        }
        if merged.identifier.is_none() {
            merged.identifier = preferred_identifier(book);
        }
        if merged.page_count.is_none() {
            merged.page_count = book.number_of_pages.map(|value| PageCount {
                value,
                kind: PageCountKind::Actual,
            });
        }
    }

    merged
}

/// Fill an optional string field only when currently absent or empty.
fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    let empty = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if empty {
        if let Some(value) = candidate.filter(|v| !v.trim().is_empty()) {
            *slot = Some(value);
        }
    }
}

/// Preferred author: the first name in the provider's list.
fn preferred_author(book: &NormalizedBook) -> Option<String> {
    book.authors.first().cloned()
}

/// Preferred identifier: first ISBN-13, else ISBN-10, else the first of
/// LCCN/OCLC/ASIN/OLID in that order.
fn preferred_identifier(book: &NormalizedBook) -> Option<Identifier> {
    let value = book
        .isbn13
        .first()
        .or_else(|| book.isbn10.first())
        .or_else(|| book.lccn.first())
        .or_else(|| book.oclc.first())
        .or_else(|| book.asin.first())
        .or_else(|| book.olid.first())?;

    Some(Identifier {
        value: value.clone(),
        source: IdentifierSource::Metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::types::{MatchType, Provider};

    fn hobbit_book() -> NormalizedBook {
        NormalizedBook {
            title: Some("The Hobbit".to_string()),
            authors: vec!["J.R.R. Tolkien".to_string(), "Christopher Tolkien".to_string()],
            publishers: vec!["HarperCollins".to_string()],
            publication_date: Some("1991".to_string()),
            number_of_pages: Some(310),
            isbn10: vec!["0261103342".to_string()],
            isbn13: vec!["9780261103344".to_string()],
            ..Default::default()
        }
    }

    fn context(mode: ResolverMode, book: Option<NormalizedBook>) -> EnrichmentContext {
        EnrichmentContext {
            match_type: MatchType::Identifier,
            confidence: 0.95,
            book,
            ..EnrichmentContext::no_match(Provider::OpenLibrary, mode)
        }
    }

    #[test]
    fn shadow_mode_is_a_no_op() {
        let metadata = CanonicalMetadata::default();
        let ctx = context(ResolverMode::Shadow, Some(hobbit_book()));

        let merged = apply_enrichment(&metadata, &[ctx]);
        assert_eq!(merged, metadata);
    }

    #[test]
    fn apply_fills_empty_fields() {
        let metadata = CanonicalMetadata::default();
        let ctx = context(ResolverMode::Apply, Some(hobbit_book()));

        let merged = apply_enrichment(&metadata, &[ctx]);
        assert_eq!(merged.title.as_deref(), Some("The Hobbit"));
        // First author in the list is the preferred value
        assert_eq!(merged.author.as_deref(), Some("J.R.R. Tolkien"));
        assert_eq!(merged.publisher.as_deref(), Some("HarperCollins"));
        // ISBN-13 preferred over ISBN-10
        assert_eq!(merged.identifier.unwrap().value, "9780261103344");
        assert_eq!(merged.page_count.unwrap().value, 310);
    }

    #[test]
    fn apply_never_overwrites_populated_fields() {
        let metadata = CanonicalMetadata {
            title: Some("The Hobbit: Illustrated Edition".to_string()),
            author: Some("Tolkien".to_string()),
            page_count: Some(PageCount {
                value: 400,
                kind: PageCountKind::Actual,
            }),
            ..Default::default()
        };
        let ctx = context(ResolverMode::Apply, Some(hobbit_book()));

        let merged = apply_enrichment(&metadata, &[ctx]);
        assert_eq!(merged.title.as_deref(), Some("The Hobbit: Illustrated Edition"));
        assert_eq!(merged.author.as_deref(), Some("Tolkien"));
        assert_eq!(merged.page_count.unwrap().value, 400);
    }

    #[test]
    fn apply_is_idempotent() {
        let metadata = CanonicalMetadata::default();
        let ctx = context(ResolverMode::Apply, Some(hobbit_book()));

        let once = apply_enrichment(&metadata, &[ctx.clone()]);
        let twice = apply_enrichment(&once, &[ctx]);
        assert_eq!(once, twice);
    }

    #[test]
    fn bookless_context_changes_nothing() {
        let metadata = CanonicalMetadata::default();
        let ctx = context(ResolverMode::Apply, None);

        let merged = apply_enrichment(&metadata, &[ctx]);
        assert_eq!(merged, metadata);
    }

    #[test]
    fn whitespace_only_field_counts_as_empty() {
        let metadata = CanonicalMetadata {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        let ctx = context(ResolverMode::Apply, Some(hobbit_book()));

        let merged = apply_enrichment(&metadata, &[ctx]);
        assert_eq!(merged.title.as_deref(), Some("The Hobbit"));
    }

    #[test]
    fn identifier_falls_back_through_lists() {
        let book = NormalizedBook {
            title: Some("X".to_string()),
            lccn: vec!["2020012345".to_string()],
            olid: vec!["OL1M".to_string()],
            ..Default::default()
        };
        let ctx = context(ResolverMode::Apply, Some(book));

        let merged = apply_enrichment(&CanonicalMetadata::default(), &[ctx]);
        assert_eq!(merged.identifier.unwrap().value, "2020012345");
    }
}
