//! Library of Congress authority-search resolver
//!
//! Two transports share one extraction path: direct HTTP search against the
//! configured endpoint (`fo=json&q=...&c=...&sp=1`), or a JSON-RPC tool
//! bridge. The direct configuration is the thorough one: it issues up to
//! six deduplicated queries per phase, ranks raw hits for relevance,
//! follows the top detail links for richer subject-heading and name data,
//! strips a fixed noise list, and normalizes every extracted name.
//!
//! The output is subject-heading and name candidates, not a book record:
//! LOC feeds cataloging, not gap-filling.

use crate::enrich::fieldmap::{pick_str, pick_strings};
use crate::enrich::http::{self, CallError};
use crate::enrich::names::normalize_name;
use crate::enrich::rank::{rank_candidates, relevance_score};
use crate::enrich::types::{
    EnrichError, EnrichResult, EnrichmentContext, EnrichmentInput, MatchType, Provider,
};
use serde_json::Value;
use shelfmark_common::config::{LocTransport, ResolverConfig};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const IDENTIFIER_CONFIDENCE: f64 = 0.95;
const TITLE_CONFIDENCE: f64 = 0.70;

/// Deduplicated queries issued per cascade phase (direct transport).
const MAX_QUERIES_PER_PHASE: usize = 6;
/// Top-ranked records whose detail links are followed.
const MAX_DETAIL_FOLLOWUPS: usize = 2;
const MAX_SUBJECT_CANDIDATES: usize = 20;
const MAX_NAME_CANDIDATES: usize = 10;

/// Generic phrases that are never useful as headings or names.
const NOISE_PHRASES: &[&str] = &[
    "library of congress subject headings",
    "lcsh",
    "electronic books",
    "also issued in print",
    "machine-generated record",
];

const BRIDGE_SEARCH_TOOL: &str = "search_catalog";

// Field-mapping tables for search-result records and item details
const RECORD_TITLE_PATHS: &[&str] = &["title", "item.title"];
const RECORD_FORMAT_PATHS: &[&str] = &["original_format", "format", "type"];
const RECORD_SUBJECT_PATHS: &[&str] = &["subject_headings", "item.subject_headings", "subject", "subjects"];
const RECORD_NAME_PATHS: &[&str] = &[
    "contributor_names",
    "item.contributor_names",
    "contributors",
    "contributor",
    "creator",
];
const RECORD_URL_PATHS: &[&str] = &["url", "id", "item.url"];

pub struct LocResolver {
    config: ResolverConfig,
    transport: LocTransport,
    client: reqwest::Client,
}

impl LocResolver {
    pub fn new(config: ResolverConfig, transport: LocTransport) -> Self {
        Self {
            config,
            transport,
            client: http::build_client(),
        }
    }

    /// Run the matching cascade: identifier phase, then title phase.
    ///
    /// Returns `Ok(None)` when the resolver is disabled. Transport problems
    /// become context warnings; only cancellation raises.
    pub async fn resolve(
        &self,
        input: &EnrichmentInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<Option<EnrichmentContext>> {
        if !self.config.is_active() {
            return Ok(None);
        }

        let mut ctx = EnrichmentContext::no_match(Provider::Loc, self.config.mode);

        let Some(endpoint) = self.config.endpoint.clone() else {
            ctx.warnings
                .push("loc resolver is enabled but loc.endpoint is not configured".to_string());
            return Ok(Some(ctx));
        };

        if let Some(id) = input.usable_identifier() {
            let phase = self
                .run_phase(&endpoint, vec![id.to_string()], input, cancel)
                .await?;
            let has_candidates = phase.has_candidates();
            ctx.warnings.extend(phase.warnings);
            if has_candidates {
                ctx.match_type = MatchType::Identifier;
                ctx.confidence = IDENTIFIER_CONFIDENCE;
                ctx.lcsh_candidates = phase.lcsh;
                ctx.name_candidates = phase.names;
                return Ok(Some(ctx));
            }
        }

        let queries = title_phase_queries(input);
        if !queries.is_empty() {
            let phase = self.run_phase(&endpoint, queries, input, cancel).await?;
            let has_candidates = phase.has_candidates();
            ctx.warnings.extend(phase.warnings);
            if has_candidates {
                ctx.match_type = MatchType::Title;
                ctx.confidence = TITLE_CONFIDENCE;
                ctx.lcsh_candidates = phase.lcsh;
                ctx.name_candidates = phase.names;
            }
        }

        Ok(Some(ctx))
    }

    async fn run_phase(
        &self,
        endpoint: &str,
        queries: Vec<String>,
        input: &EnrichmentInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<PhaseResult> {
        let mut result = PhaseResult::default();

        // Query batch runs concurrently; phases stay sequential because the
        // title phase only runs when the identifier phase found nothing.
        let searches = queries.iter().map(|q| self.run_query(endpoint, q, cancel));
        let mut records: Vec<Value> = Vec::new();
        for outcome in futures::future::join_all(searches).await {
            match outcome {
                Ok(batch) => records.extend(batch),
                Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
                Err(CallError::Failed(msg)) => {
                    warn!(provider = "loc", error = %msg, "Authority query failed");
                    result.warnings.push(format!("loc query failed: {msg}"));
                }
            }
        }

        if records.is_empty() {
            return Ok(result);
        }

        let ranked = rank_candidates(records, |record| {
            relevance_score(
                &record_text(record),
                &record_format(record),
                input.title.as_deref(),
                input.author.as_deref(),
            )
        });
        debug!(provider = "loc", survivors = ranked.len(), "Ranked authority hits");

        // Detail links of the top hits carry richer headings/names than the
        // search result rows (direct transport only).
        let mut detail_records: Vec<Value> = Vec::new();
        if self.transport == LocTransport::Direct {
            for (record, _) in ranked.iter().take(MAX_DETAIL_FOLLOWUPS) {
                let Some(url) = pick_str(record, RECORD_URL_PATHS) else {
                    continue;
                };
                match self.fetch_detail(&url, cancel).await {
                    Ok(Some(item)) => detail_records.push(item),
                    Ok(None) => {}
                    Err(CallError::Cancelled) => return Err(EnrichError::Cancelled),
                    Err(CallError::Failed(msg)) => {
                        result.warnings.push(format!("loc detail fetch failed: {msg}"));
                    }
                }
            }
        }

        let survivors: Vec<Value> = ranked.into_iter().map(|(record, _)| record).collect();
        collect_candidates(survivors.iter().chain(detail_records.iter()), &mut result);
        Ok(result)
    }

    async fn run_query(
        &self,
        endpoint: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Value>, CallError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let payload = match self.transport {
            LocTransport::Direct => {
                let max = self.config.max_results.to_string();
                http::send_json(
                    || {
                        self.client.get(endpoint).query(&[
                            ("fo", "json"),
                            ("q", query),
                            ("c", max.as_str()),
                            ("sp", "1"),
                        ])
                    },
                    timeout,
                    cancel,
                )
                .await?
            }
            LocTransport::Bridge => {
                http::tool_call(
                    &self.client,
                    endpoint,
                    BRIDGE_SEARCH_TOOL,
                    serde_json::json!({"query": query, "limit": self.config.max_results}),
                    timeout,
                    cancel,
                )
                .await?
            }
        };

        Ok(result_records(&payload))
    }

    async fn fetch_detail(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, CallError> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let payload = http::send_json(
            || self.client.get(url).query(&[("fo", "json")]),
            timeout,
            cancel,
        )
        .await?;

        Ok(payload.get("item").cloned().or(Some(payload)))
    }
}

#[derive(Default)]
struct PhaseResult {
    lcsh: Vec<String>,
    names: Vec<String>,
    warnings: Vec<String>,
}

impl PhaseResult {
    fn has_candidates(&self) -> bool {
        !self.lcsh.is_empty() || !self.names.is_empty()
    }
}

/// Records array of a search response, wherever the schema put it.
fn result_records(payload: &Value) -> Vec<Value> {
    ["results", "items"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map(|records| records.to_vec())
        .unwrap_or_default()
}

/// Combined text fields a record is scored on.
fn record_text(record: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(title) = pick_str(record, RECORD_TITLE_PATHS) {
        parts.push(title);
    }
    parts.extend(pick_strings(record, RECORD_NAME_PATHS));
    parts.extend(pick_strings(record, RECORD_SUBJECT_PATHS));
    parts.join(" ")
}

fn record_format(record: &Value) -> String {
    pick_strings(record, RECORD_FORMAT_PATHS).join(" ")
}

fn is_noise(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    NOISE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Pull deduplicated, noise-stripped candidates out of ranked records.
fn collect_candidates<'a>(
    records: impl Iterator<Item = &'a Value>,
    result: &mut PhaseResult,
) {
    let mut seen_headings: HashSet<String> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for record in records {
        for heading in pick_strings(record, RECORD_SUBJECT_PATHS) {
            if is_noise(&heading) || !seen_headings.insert(heading.to_lowercase()) {
                continue;
            }
            if result.lcsh.len() < MAX_SUBJECT_CANDIDATES {
                result.lcsh.push(heading);
            }
        }

        for raw_name in pick_strings(record, RECORD_NAME_PATHS) {
            if is_noise(&raw_name) {
                continue;
            }
            let name = normalize_name(&raw_name);
            if name.is_empty() || !seen_names.insert(name.to_lowercase()) {
                continue;
            }
            if result.names.len() < MAX_NAME_CANDIDATES {
                result.names.push(name);
            }
        }
    }
}

/// Candidate texts extracted from ranked search records, for the cascade's
/// title phase and for tests exercising the extraction path offline.
pub fn extract_candidates(
    records: Vec<Value>,
    input: &EnrichmentInput,
) -> (Vec<String>, Vec<String>) {
    let ranked = rank_candidates(records, |record| {
        relevance_score(
            &record_text(record),
            &record_format(record),
            input.title.as_deref(),
            input.author.as_deref(),
        )
    });
    let survivors: Vec<Value> = ranked.into_iter().map(|(record, _)| record).collect();

    let mut result = PhaseResult::default();
    collect_candidates(survivors.iter(), &mut result);
    (result.lcsh, result.names)
}

/// Up to six deduplicated queries built from the book's own metadata.
fn title_phase_queries(input: &EnrichmentInput) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let mut push = |candidate: Option<String>| {
        if let Some(q) = candidate {
            let q = q.trim().to_string();
            if !q.is_empty()
                && !queries.iter().any(|seen| seen.eq_ignore_ascii_case(&q))
                && queries.len() < MAX_QUERIES_PER_PHASE
            {
                queries.push(q);
            }
        }
    };

    let title = input.title.as_deref();
    let author = input.author.as_deref();

    push(title.map(str::to_string));
    push(match (title, author) {
        (Some(t), Some(a)) => Some(format!("{t} {a}")),
        _ => None,
    });
    push(author.map(str::to_string));
    push(input.subject.clone());
    push(input.keywords.clone());
    push(match (title, input.subject.as_deref()) {
        (Some(t), Some(s)) => Some(format!("{t} {s}")),
        _ => None,
    });

    queries
}
