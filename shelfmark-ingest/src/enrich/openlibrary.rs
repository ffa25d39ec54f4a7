//! Open Library resolver
//!
//! Reaches Open Library through the JSON-RPC tool-call bridge. The
//! identifier phase asks for an exact ISBN record; an empty payload (Open
//! Library answers `{}` for unknown ISBNs) falls through to the title
//! search phase. Both payload shapes normalize through ordered
//! field-mapping tables into one `NormalizedBook`.

use crate::enrich::fieldmap::{pick, pick_str, pick_strings, pick_u32, strings_of};
use crate::enrich::http::{self, CallError};
use crate::enrich::types::{
    EnrichError, EnrichResult, EnrichmentContext, EnrichmentInput, MatchType, NormalizedBook,
    Provider,
};
use serde_json::Value;
use shelfmark_common::config::ResolverConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const IDENTIFIER_CONFIDENCE: f64 = 0.95;
const TITLE_CONFIDENCE: f64 = 0.70;

const ISBN_LOOKUP_TOOL: &str = "get_book_by_isbn";
const TITLE_SEARCH_TOOL: &str = "search_books";

// Field-mapping tables across the book-record and search-doc schemas
const TITLE_PATHS: &[&str] = &["title", "full_title", "name"];
const AUTHOR_PATHS: &[&str] = &["authors", "author_name", "by_statement"];
const PUBLISHER_PATHS: &[&str] = &["publishers", "publisher"];
const DATE_PATHS: &[&str] = &["publish_date", "first_publish_year", "publish_year"];
const PAGES_PATHS: &[&str] = &["number_of_pages", "number_of_pages_median"];
const ISBN10_PATHS: &[&str] = &["isbn_10", "identifiers.isbn_10"];
const ISBN13_PATHS: &[&str] = &["isbn_13", "identifiers.isbn_13"];
const LCCN_PATHS: &[&str] = &["lccn", "identifiers.lccn"];
const OCLC_PATHS: &[&str] = &["oclc", "oclc_numbers", "identifiers.oclc"];
const OLID_PATHS: &[&str] = &["key", "identifiers.openlibrary"];
const DESCRIPTION_PATHS: &[&str] = &["description", "description.value", "first_sentence"];

pub struct OpenLibraryResolver {
    config: ResolverConfig,
    client: reqwest::Client,
}

impl OpenLibraryResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            client: http::build_client(),
        }
    }

    /// Identifier phase, then title phase; transport problems become
    /// warnings and the cascade keeps going.
    pub async fn resolve(
        &self,
        input: &EnrichmentInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<Option<EnrichmentContext>> {
        if !self.config.is_active() {
            return Ok(None);
        }

        let mut ctx = EnrichmentContext::no_match(Provider::OpenLibrary, self.config.mode);

        let Some(endpoint) = self.config.endpoint.clone() else {
            ctx.warnings.push(
                "openLibrary resolver is enabled but open_library.endpoint is not configured"
                    .to_string(),
            );
            return Ok(Some(ctx));
        };
        let timeout = Duration::from_millis(self.config.timeout_ms);

        if let Some(isbn) = input.usable_identifier() {
            match http::tool_call(
                &self.client,
                &endpoint,
                ISBN_LOOKUP_TOOL,
                serde_json::json!({"isbn": isbn}),
                timeout,
                cancel,
            )
            .await
            {
                Ok(payload) => {
                    if let Some(book) = normalize_book_payload(&payload) {
                        debug!(provider = "openLibrary", isbn, "Identifier lookup matched");
                        ctx.match_type = MatchType::Identifier;
                        ctx.confidence = IDENTIFIER_CONFIDENCE;
                        ctx.book = Some(book);
                        return Ok(Some(ctx));
                    }
                    debug!(provider = "openLibrary", isbn, "Identifier lookup empty");
                }
                Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
                Err(CallError::Failed(msg)) => {
                    warn!(provider = "openLibrary", error = %msg, "Identifier lookup failed");
                    ctx.warnings.push(format!("openLibrary isbn lookup failed: {msg}"));
                }
            }
        }

        let Some(title) = input.title.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(Some(ctx));
        };

        let mut arguments = serde_json::json!({"title": title, "limit": self.config.max_results});
        if let Some(author) = input.author.as_deref() {
            arguments["author"] = Value::String(author.to_string());
        }

        match http::tool_call(
            &self.client,
            &endpoint,
            TITLE_SEARCH_TOOL,
            arguments,
            timeout,
            cancel,
        )
        .await
        {
            Ok(payload) => {
                if let Some(book) = best_search_doc(&payload).and_then(normalize_book_payload) {
                    ctx.match_type = MatchType::Title;
                    ctx.confidence = TITLE_CONFIDENCE;
                    ctx.book = Some(book);
                }
            }
            Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
            Err(CallError::Failed(msg)) => {
                warn!(provider = "openLibrary", error = %msg, "Title search failed");
                ctx.warnings.push(format!("openLibrary title search failed: {msg}"));
            }
        }

        Ok(Some(ctx))
    }
}

/// First document of a search payload (`docs` or `results` array).
fn best_search_doc(payload: &Value) -> Option<&Value> {
    ["docs", "results"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .and_then(|docs| docs.first())
}

/// Normalize a book-record or search-doc payload. Returns `None` for empty
/// or titleless payloads, which is what drives the identifier → title
/// fallback.
pub fn normalize_book_payload(payload: &Value) -> Option<NormalizedBook> {
    let obj = payload.as_object()?;
    if obj.is_empty() {
        return None;
    }
    let title = pick_str(payload, TITLE_PATHS)?;

    let mut book = NormalizedBook {
        title: Some(title),
        authors: author_names(payload),
        publishers: pick_strings(payload, PUBLISHER_PATHS),
        publication_date: pick_str(payload, DATE_PATHS).or_else(|| {
            // Search docs report the first publish year as a number
            pick(payload, DATE_PATHS).and_then(Value::as_u64).map(|y| y.to_string())
        }),
        number_of_pages: pick_u32(payload, PAGES_PATHS),
        isbn10: pick_strings(payload, ISBN10_PATHS),
        isbn13: pick_strings(payload, ISBN13_PATHS),
        lccn: pick_strings(payload, LCCN_PATHS),
        oclc: pick_strings(payload, OCLC_PATHS),
        olid: pick_strings(payload, OLID_PATHS)
            .into_iter()
            .map(|key| key.trim_start_matches("/books/").to_string())
            .collect(),
        description: pick_str(payload, DESCRIPTION_PATHS),
        ..Default::default()
    };

    // Search docs mix both forms into a flat `isbn` array
    if book.isbn10.is_empty() && book.isbn13.is_empty() {
        if let Some(mixed) = payload.get("isbn") {
            for isbn in strings_of(mixed) {
                if isbn.len() == 13 {
                    book.isbn13.push(isbn);
                } else if isbn.len() == 10 {
                    book.isbn10.push(isbn);
                }
            }
        }
    }

    Some(book)
}

/// Authors appear as `[{name}]` on records and `author_name: [..]` on docs.
fn author_names(payload: &Value) -> Vec<String> {
    pick(payload, AUTHOR_PATHS)
        .map(strings_of)
        .unwrap_or_default()
}
