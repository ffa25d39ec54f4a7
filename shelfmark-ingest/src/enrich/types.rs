//! Shared types and data contracts for the enrichment layer
//!
//! These types are the explicit synchronization points between the
//! orchestrator, the individual resolvers, and the merge policy. A context
//! is created per enrichment request, never persisted, and discarded after
//! merge.

use serde::{Deserialize, Serialize};
use shelfmark_common::config::ResolverMode;
use shelfmark_common::models::CanonicalMetadata;
use thiserror::Error;

// ============================================================================
// Providers
// ============================================================================

/// Bibliographic authority providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Provider {
    Loc,
    OpenLibrary,
    Hardcover,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Loc => write!(f, "loc"),
            Provider::OpenLibrary => write!(f, "openLibrary"),
            Provider::Hardcover => write!(f, "hardcover"),
        }
    }
}

// ============================================================================
// Resolver input
// ============================================================================

/// Partial metadata a resolver keys its matching cascade off
#[derive(Debug, Clone, Default)]
pub struct EnrichmentInput {
    pub title: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    /// Normalized identifier digits, when the parse found one
    pub identifier: Option<String>,
}

impl EnrichmentInput {
    pub fn from_metadata(metadata: &CanonicalMetadata) -> Self {
        Self {
            title: metadata.title.clone(),
            author: metadata.author.clone(),
            narrator: metadata.narrator.clone(),
            subject: metadata.subject.clone(),
            keywords: metadata.keywords.clone(),
            identifier: metadata.identifier.as_ref().map(|id| id.value.clone()),
        }
    }

    /// Identifier usable for the identifier phase (normalized, ≥ 8 chars).
    pub fn usable_identifier(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| id.len() >= 8)
    }
}

// ============================================================================
// Resolver output
// ============================================================================

/// How a resolver matched the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Identifier,
    Title,
    None,
}

/// Provider-agnostic superset of a matched book record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedBook {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publishers: Vec<String>,
    pub publication_date: Option<String>,
    pub number_of_pages: Option<u32>,
    pub isbn10: Vec<String>,
    pub isbn13: Vec<String>,
    pub lccn: Vec<String>,
    pub oclc: Vec<String>,
    pub asin: Vec<String>,
    pub olid: Vec<String>,
    pub series: Option<String>,
    pub series_position: Option<f64>,
    pub description: Option<String>,
}

/// One resolver's complete answer for one enrichment request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentContext {
    pub provider: Provider,
    pub enabled: bool,
    pub mode: ResolverMode,
    pub match_type: MatchType,
    /// Confidence in the match, 0.0 to 1.0
    pub confidence: f64,
    pub book: Option<NormalizedBook>,
    /// Subject-heading candidates (authority-search resolver)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lcsh_candidates: Vec<String>,
    /// Normalized name candidates (authority-search resolver)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_candidates: Vec<String>,
    /// Transport and configuration problems, never raised as errors.
    /// Empty warnings with `match_type: none` mean the provider was
    /// reachable but had no relevant results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnrichmentContext {
    /// Context for a resolver that ran but matched nothing.
    pub fn no_match(provider: Provider, mode: ResolverMode) -> Self {
        Self {
            provider,
            enabled: true,
            mode,
            match_type: MatchType::None,
            confidence: 0.0,
            book: None,
            lcsh_candidates: Vec::new(),
            name_candidates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Context for a provider that never ran (disabled or moded off).
    pub fn disabled(provider: Provider, mode: ResolverMode) -> Self {
        Self {
            enabled: false,
            warnings: vec![format!("provider {provider} is disabled")],
            ..Self::no_match(provider, mode)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Terminal enrichment errors. Everything recoverable (transport failures,
/// missing settings) lands in context warnings instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnrichError {
    /// The caller's cancellation signal was observed at a network boundary
    #[error("enrichment cancelled")]
    Cancelled,
}

pub type EnrichResult<T> = Result<T, EnrichError>;
