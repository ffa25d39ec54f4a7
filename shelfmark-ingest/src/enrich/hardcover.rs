//! Hardcover resolver
//!
//! Single GraphQL endpoint, bearer credential, three named queries:
//! edition lookup by ISBN (identifier phase), book search by title (title
//! phase), and a series lookup that decorates a hit with series name and
//! position. GraphQL error arrays are warnings, never raised.

use crate::enrich::fieldmap::{pick_str, pick_strings, pick_u32};
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
const TITLE_CONFIDENCE: f64 = 0.72;

const EDITION_BY_ISBN_QUERY: &str = r#"
query EditionByIsbn($isbn: String!) {
  editions(where: {_or: [{isbn_13: {_eq: $isbn}}, {isbn_10: {_eq: $isbn}}]}, limit: 1) {
    title
    isbn_10
    isbn_13
    pages
    release_date
    publisher { name }
    book {
      id
      title
      description
      contributions { author { name } }
    }
  }
}"#;

const BOOK_BY_TITLE_QUERY: &str = r#"
query BookByTitle($title: String!) {
  books(where: {title: {_ilike: $title}}, order_by: {users_count: desc}, limit: 1) {
    id
    title
    description
    pages
    release_date
    contributions { author { name } }
    editions(limit: 1) { isbn_10 isbn_13 publisher { name } }
  }
}"#;

const SERIES_QUERY: &str = r#"
query SeriesForBook($bookId: Int!) {
  book_series(where: {book_id: {_eq: $bookId}}, limit: 1) {
    position
    series { name }
  }
}"#;

// Field-mapping tables over the edition/book payload shapes
const TITLE_PATHS: &[&str] = &["title", "book.title"];
const DATE_PATHS: &[&str] = &["release_date", "book.release_date"];
const PAGES_PATHS: &[&str] = &["pages", "book.pages"];
const DESCRIPTION_PATHS: &[&str] = &["book.description", "description"];
const BOOK_ID_PATHS: &[&str] = &["book.id", "id"];

pub struct HardcoverResolver {
    config: ResolverConfig,
    client: reqwest::Client,
}

impl HardcoverResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            client: http::build_client(),
        }
    }

    pub async fn resolve(
        &self,
        input: &EnrichmentInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<Option<EnrichmentContext>> {
        if !self.config.is_active() {
            return Ok(None);
        }

        let mut ctx = EnrichmentContext::no_match(Provider::Hardcover, self.config.mode);

        let Some(endpoint) = self.config.endpoint.clone() else {
            ctx.warnings.push(
                "hardcover resolver is enabled but hardcover.endpoint is not configured"
                    .to_string(),
            );
            return Ok(Some(ctx));
        };
        let Some(credential) = self.config.credential.clone() else {
            ctx.warnings.push(
                "hardcover resolver is enabled but hardcover.credential is not configured"
                    .to_string(),
            );
            return Ok(Some(ctx));
        };

        if let Some(isbn) = input.usable_identifier() {
            match self
                .graphql(
                    &endpoint,
                    &credential,
                    EDITION_BY_ISBN_QUERY,
                    serde_json::json!({"isbn": isbn}),
                    cancel,
                )
                .await
            {
                Ok(data) => {
                    let edition = data
                        .get("editions")
                        .and_then(Value::as_array)
                        .and_then(|e| e.first());
                    if let Some(mut book) = edition.and_then(normalize_record) {
                        debug!(provider = "hardcover", isbn, "Edition lookup matched");
                        self.attach_series(&endpoint, &credential, edition, &mut book, &mut ctx, cancel)
                            .await?;
                        ctx.match_type = MatchType::Identifier;
                        ctx.confidence = IDENTIFIER_CONFIDENCE;
                        ctx.book = Some(book);
                        return Ok(Some(ctx));
                    }
                }
                Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
                Err(CallError::Failed(msg)) => {
                    warn!(provider = "hardcover", error = %msg, "Edition lookup failed");
                    ctx.warnings.push(format!("hardcover edition lookup failed: {msg}"));
                }
            }
        }

        let Some(title) = input.title.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(Some(ctx));
        };

        match self
            .graphql(
                &endpoint,
                &credential,
                BOOK_BY_TITLE_QUERY,
                serde_json::json!({"title": title}),
                cancel,
            )
            .await
        {
            Ok(data) => {
                let record = data
                    .get("books")
                    .and_then(Value::as_array)
                    .and_then(|b| b.first());
                if let Some(mut book) = record.and_then(normalize_record) {
                    self.attach_series(&endpoint, &credential, record, &mut book, &mut ctx, cancel)
                        .await?;
                    ctx.match_type = MatchType::Title;
                    ctx.confidence = TITLE_CONFIDENCE;
                    ctx.book = Some(book);
                }
            }
            Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
            Err(CallError::Failed(msg)) => {
                warn!(provider = "hardcover", error = %msg, "Title search failed");
                ctx.warnings.push(format!("hardcover title search failed: {msg}"));
            }
        }

        Ok(Some(ctx))
    }

    /// Series decoration is best-effort: a failed lookup costs a warning,
    /// never the match.
    async fn attach_series(
        &self,
        endpoint: &str,
        credential: &str,
        record: Option<&Value>,
        book: &mut NormalizedBook,
        ctx: &mut EnrichmentContext,
        cancel: &CancellationToken,
    ) -> EnrichResult<()> {
        let Some(book_id) = record.and_then(|r| pick_u32(r, BOOK_ID_PATHS)) else {
            return Ok(());
        };

        match self
            .graphql(
                endpoint,
                credential,
                SERIES_QUERY,
                serde_json::json!({"bookId": book_id}),
                cancel,
            )
            .await
        {
            Ok(data) => {
                if let Some(entry) = data
                    .get("book_series")
                    .and_then(Value::as_array)
                    .and_then(|s| s.first())
                {
                    book.series = pick_str(entry, &["series.name"]);
                    book.series_position = entry.get("position").and_then(Value::as_f64);
                }
                Ok(())
            }
            Err(CallError::Cancelled) => Err(EnrichError::Cancelled),
            Err(CallError::Failed(msg)) => {
                ctx.warnings.push(format!("hardcover series lookup failed: {msg}"));
                Ok(())
            }
        }
    }

    /// POST one named query; a GraphQL `errors` array is a failure even on
    /// HTTP 200.
    async fn graphql(
        &self,
        endpoint: &str,
        credential: &str,
        query: &str,
        variables: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, CallError> {
        let body = serde_json::json!({"query": query, "variables": variables});
        let timeout = Duration::from_millis(self.config.timeout_ms);

        let response = http::send_json(
            || {
                self.client
                    .post(endpoint)
                    .bearer_auth(credential)
                    .json(&body)
            },
            timeout,
            cancel,
        )
        .await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(CallError::Failed(format!("GraphQL errors: {}", Value::from(errors.clone()))));
            }
        }

        response
            .get("data")
            .cloned()
            .ok_or_else(|| CallError::Failed("GraphQL response missing data".to_string()))
    }
}

/// Normalize an edition or book record into the provider-agnostic shape.
pub fn normalize_record(record: &Value) -> Option<NormalizedBook> {
    let title = pick_str(record, TITLE_PATHS)?;

    let mut book = NormalizedBook {
        title: Some(title),
        authors: contribution_names(record),
        publication_date: pick_str(record, DATE_PATHS),
        number_of_pages: pick_u32(record, PAGES_PATHS),
        description: pick_str(record, DESCRIPTION_PATHS),
        ..Default::default()
    };

    // ISBNs live on the record itself (edition) or its first edition (book)
    let isbn_source = record
        .get("editions")
        .and_then(Value::as_array)
        .and_then(|e| e.first())
        .unwrap_or(record);
    book.isbn10 = pick_strings(isbn_source, &["isbn_10"]);
    book.isbn13 = pick_strings(isbn_source, &["isbn_13"]);
    book.publishers = pick_str(record, &["publisher.name"])
        .or_else(|| pick_str(isbn_source, &["publisher.name"]))
        .into_iter()
        .collect();

    Some(book)
}

fn contribution_names(record: &Value) -> Vec<String> {
    let contributions = record
        .get("book")
        .and_then(|b| b.get("contributions"))
        .or_else(|| record.get("contributions"))
        .and_then(Value::as_array);

    contributions
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| pick_str(entry, &["author.name", "name"]))
                .collect()
        })
        .unwrap_or_default()
}
