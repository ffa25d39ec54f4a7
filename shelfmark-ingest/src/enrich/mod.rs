//! Enrichment: authority resolvers, ranking, merge policy
//!
//! The orchestrator fans every enabled resolver out concurrently over the
//! same read-only input and waits for all of them; resolvers never
//! communicate with or block on one another. A disabled or misconfigured
//! provider contributes an explanatory warning context instead of a
//! result. Cancellation observed inside any resolver is terminal for the
//! whole pass.

pub mod fieldmap;
pub mod hardcover;
pub mod http;
pub mod loc;
pub mod merge;
pub mod names;
pub mod openlibrary;
pub mod rank;
pub mod types;

pub use hardcover::HardcoverResolver;
pub use loc::LocResolver;
pub use merge::apply_enrichment;
pub use openlibrary::OpenLibraryResolver;
pub use types::{
    EnrichError, EnrichResult, EnrichmentContext, EnrichmentInput, MatchType, NormalizedBook,
    Provider,
};

use shelfmark_common::config::EnrichmentConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Fans candidate queries out to the configured resolvers and collects
/// their contexts.
pub struct EnrichmentOrchestrator {
    loc: LocResolver,
    open_library: OpenLibraryResolver,
    hardcover: HardcoverResolver,
    config: EnrichmentConfig,
}

impl EnrichmentOrchestrator {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            loc: LocResolver::new(config.loc.clone(), config.loc_transport),
            open_library: OpenLibraryResolver::new(config.open_library.clone()),
            hardcover: HardcoverResolver::new(config.hardcover.clone()),
            config: config.clone(),
        }
    }

    /// Run every resolver concurrently and wait for all to finish or fail.
    ///
    /// No ordering is guaranteed between resolver completions; the returned
    /// contexts are in fixed provider order. Only cancellation raises.
    pub async fn enrich(
        &self,
        input: &EnrichmentInput,
        cancel: &CancellationToken,
    ) -> EnrichResult<Vec<EnrichmentContext>> {
        debug!(
            title = ?input.title,
            identifier = ?input.identifier,
            "Starting enrichment fan-out"
        );

        let (loc, open_library, hardcover) = tokio::join!(
            self.loc.resolve(input, cancel),
            self.open_library.resolve(input, cancel),
            self.hardcover.resolve(input, cancel),
        );

        let mut contexts = Vec::with_capacity(3);
        for (provider, mode, outcome) in [
            (Provider::Loc, self.config.loc.mode, loc),
            (Provider::OpenLibrary, self.config.open_library.mode, open_library),
            (Provider::Hardcover, self.config.hardcover.mode, hardcover),
        ] {
            match outcome? {
                Some(ctx) => contexts.push(ctx),
                None => {
                    debug!(provider = %provider, "Provider disabled, recording warning context");
                    contexts.push(EnrichmentContext::disabled(provider, mode));
                }
            }
        }

        info!(
            matches = contexts
                .iter()
                .filter(|c| c.match_type != MatchType::None)
                .count(),
            warnings = contexts.iter().map(|c| c.warnings.len()).sum::<usize>(),
            "Enrichment complete"
        );

        Ok(contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_disabled_yields_warning_contexts() {
        let orchestrator = EnrichmentOrchestrator::new(&EnrichmentConfig::default());
        let contexts = orchestrator
            .enrich(&EnrichmentInput::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(contexts.len(), 3);
        for ctx in &contexts {
            assert!(!ctx.enabled);
            assert_eq!(ctx.match_type, MatchType::None);
            assert!(!ctx.warnings.is_empty());
        }
    }

    #[tokio::test]
    async fn misconfigured_provider_does_not_block_others() {
        let mut config = EnrichmentConfig::default();
        config.hardcover.enabled = true; // enabled but no endpoint/credential

        let orchestrator = EnrichmentOrchestrator::new(&config);
        let contexts = orchestrator
            .enrich(&EnrichmentInput::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(contexts.len(), 3);
        let hardcover = contexts
            .iter()
            .find(|c| c.provider == Provider::Hardcover)
            .unwrap();
        assert!(hardcover.enabled);
        assert!(hardcover.warnings[0].contains("endpoint"));
    }
}
