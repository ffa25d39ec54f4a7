//! Enrichment configuration loading
//!
//! Resolver settings come from a TOML file with environment-variable
//! overrides (ENV wins, then TOML, then compiled defaults). The resolved
//! `EnrichmentConfig` value object is built once at startup and passed by
//! reference into the orchestrator and each resolver; no component reads
//! environment state after that.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-resolver operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Resolver never runs
    Off,
    /// Results are computed and reported but never mutate canonical metadata
    #[default]
    Shadow,
    /// Results may fill canonical metadata fields that are currently empty
    Apply,
}

impl std::str::FromStr for ResolverMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(ResolverMode::Off),
            "shadow" => Ok(ResolverMode::Shadow),
            "apply" => Ok(ResolverMode::Apply),
            other => Err(Error::Config(format!(
                "invalid resolver mode '{other}' (expected off, shadow, or apply)"
            ))),
        }
    }
}

/// Transport used by the LOC authority resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocTransport {
    /// Query the search endpoint directly over HTTP
    #[default]
    Direct,
    /// Route queries through a JSON-RPC tool-call bridge
    Bridge,
}

/// Settings for a single enrichment resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub enabled: bool,
    pub mode: ResolverMode,
    /// Base URL of the provider (search endpoint, bridge URL, or GraphQL URL)
    pub endpoint: Option<String>,
    /// Bearer-style credential, for providers that require one
    pub credential: Option<String>,
    /// Per-call network timeout in milliseconds
    pub timeout_ms: u64,
    /// Cap on raw results requested per query
    pub max_results: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ResolverMode::Shadow,
            endpoint: None,
            credential: None,
            timeout_ms: 10_000,
            max_results: 10,
        }
    }
}

impl ResolverConfig {
    /// A resolver participates only when enabled and not moded off.
    pub fn is_active(&self) -> bool {
        self.enabled && self.mode != ResolverMode::Off
    }
}

/// Complete enrichment configuration, one entry per provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub loc: ResolverConfig,
    /// LOC only: direct search vs JSON-RPC tool bridge
    pub loc_transport: LocTransport,
    pub open_library: ResolverConfig,
    pub hardcover: ResolverConfig,
}

impl EnrichmentConfig {
    /// Load configuration from an explicit path, or the default location,
    /// then apply environment overrides.
    ///
    /// A missing file is not an error: defaults apply and overrides may
    /// still enable resolvers.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).or_else(default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                let parsed: EnrichmentConfig = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("parse {} failed: {e}", p.display())))?;
                debug!(path = %p.display(), "Loaded enrichment config");
                parsed
            }
            _ => EnrichmentConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SHELFMARK_*` environment overrides (highest priority).
    fn apply_env_overrides(&mut self) {
        for (provider, cfg) in [
            ("LOC", &mut self.loc),
            ("OPEN_LIBRARY", &mut self.open_library),
            ("HARDCOVER", &mut self.hardcover),
        ] {
            if let Some(v) = env_var(provider, "ENABLED") {
                cfg.enabled = matches!(v.as_str(), "1" | "true" | "yes");
            }
            if let Some(v) = env_var(provider, "MODE") {
                match v.parse() {
                    Ok(mode) => cfg.mode = mode,
                    Err(e) => warn!(provider, error = %e, "Ignoring invalid mode override"),
                }
            }
            if let Some(v) = env_var(provider, "ENDPOINT") {
                cfg.endpoint = Some(v);
            }
            if let Some(v) = env_var(provider, "CREDENTIAL") {
                cfg.credential = Some(v);
            }
            if let Some(v) = env_var(provider, "TIMEOUT_MS") {
                match v.parse() {
                    Ok(ms) => cfg.timeout_ms = ms,
                    Err(_) => warn!(provider, value = %v, "Ignoring invalid timeout override"),
                }
            }
        }

        if let Some(v) = env_var("LOC", "TRANSPORT") {
            match v.trim().to_ascii_lowercase().as_str() {
                "direct" => self.loc_transport = LocTransport::Direct,
                "bridge" => self.loc_transport = LocTransport::Bridge,
                other => warn!(value = other, "Ignoring invalid LOC transport override"),
            }
        }
    }

    /// Reject configurations that cannot work at all. Per-resolver missing
    /// credentials are deliberately NOT fatal here: an enabled resolver with
    /// a missing setting reports a warning context at resolve time instead
    /// of failing the whole enrichment pass.
    fn validate(&self) -> Result<()> {
        for (name, cfg) in [
            ("loc", &self.loc),
            ("open_library", &self.open_library),
            ("hardcover", &self.hardcover),
        ] {
            if cfg.timeout_ms == 0 {
                return Err(Error::Config(format!("{name}.timeout_ms must be > 0")));
            }
        }
        Ok(())
    }
}

fn env_var(provider: &str, key: &str) -> Option<String> {
    let name = format!("SHELFMARK_{provider}_{key}");
    std::env::var(&name).ok().filter(|v| !v.trim().is_empty())
}

/// Default config file path: `~/.config/shelfmark/shelfmark.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shelfmark").join("shelfmark.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Apply".parse::<ResolverMode>().unwrap(), ResolverMode::Apply);
        assert_eq!("SHADOW".parse::<ResolverMode>().unwrap(), ResolverMode::Shadow);
        assert_eq!("off".parse::<ResolverMode>().unwrap(), ResolverMode::Off);
        assert!("observe".parse::<ResolverMode>().is_err());
    }

    #[test]
    fn defaults_are_disabled_shadow() {
        let cfg = EnrichmentConfig::default();
        assert!(!cfg.loc.is_active());
        assert_eq!(cfg.loc.mode, ResolverMode::Shadow);
        assert_eq!(cfg.loc.timeout_ms, 10_000);
        assert_eq!(cfg.loc_transport, LocTransport::Direct);
    }

    #[test]
    fn off_mode_deactivates_enabled_resolver() {
        let cfg = ResolverConfig {
            enabled: true,
            mode: ResolverMode::Off,
            ..Default::default()
        };
        assert!(!cfg.is_active());
    }

    #[test]
    fn toml_round_trip() {
        let toml_src = r#"
loc_transport = "bridge"

[loc]
enabled = true
mode = "apply"
endpoint = "https://www.loc.gov/search/"
max_results = 20

[hardcover]
enabled = true
mode = "shadow"
endpoint = "https://api.hardcover.app/v1/graphql"
credential = "token-123"
"#;
        let cfg: EnrichmentConfig = toml::from_str(toml_src).unwrap();
        assert!(cfg.loc.is_active());
        assert_eq!(cfg.loc.mode, ResolverMode::Apply);
        assert_eq!(cfg.loc.max_results, 20);
        assert_eq!(cfg.loc_transport, LocTransport::Bridge);
        assert_eq!(cfg.hardcover.credential.as_deref(), Some("token-123"));
        // Unconfigured provider keeps defaults
        assert!(!cfg.open_library.enabled);
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = EnrichmentConfig::default();
        cfg.loc.timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_reads_explicit_path_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelfmark.toml");
        std::fs::write(
            &path,
            "[open_library]\nenabled = true\nmode = \"apply\"\nendpoint = \"http://localhost:9/rpc\"\n",
        )
        .unwrap();

        let cfg = EnrichmentConfig::load(Some(&path)).unwrap();
        assert!(cfg.open_library.is_active());
        assert_eq!(cfg.open_library.mode, ResolverMode::Apply);

        let missing = dir.path().join("absent.toml");
        let cfg = EnrichmentConfig::load(Some(&missing)).unwrap();
        assert!(!cfg.open_library.enabled);
    }
}
