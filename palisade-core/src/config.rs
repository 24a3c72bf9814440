//! # Config Loader — Loads and validates TOML configuration
//!
//! Reads `palisade.toml` (or a custom path) and deserializes into typed
//! config structs. Each security layer gets its own section; every field has
//! a serde default so a partial file (or none at all) still yields a working
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Top-level palisade configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PalisadeConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub threat: ThreatConfig,
    #[serde(default)]
    pub countermeasures: CounterMeasureConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub enabled: bool,
    pub honeypots_enabled: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { enabled: true, honeypots_enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatConfig {
    /// Per-identity event history capacity.
    pub history_capacity: usize,
    /// Idle profiles older than this are evicted by the sweep.
    pub retention_days: i64,
    /// Failed logins allowed before lockout.
    pub login_failure_limit: u32,
    /// Lockout duration after too many failed logins, in seconds.
    pub login_lockout_secs: i64,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            retention_days: 30,
            login_failure_limit: 5,
            login_lockout_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterMeasureConfig {
    pub auto_block: bool,
    /// How long a BLOCK lasts, in seconds.
    pub block_duration_secs: i64,
    pub honeypot_redirect: bool,
    pub legal_notification: bool,
}

impl Default for CounterMeasureConfig {
    fn default() -> Self {
        Self {
            auto_block: true,
            block_duration_secs: 24 * 60 * 60,
            honeypot_redirect: true,
            legal_notification: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    pub enabled: bool,
    /// Base directory of the evidence blob store.
    pub base_dir: String,
    /// In-memory evidence index capacity.
    pub index_capacity: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self { enabled: true, base_dir: "security".into(), index_capacity: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// Comments allowed per rate window.
    pub rate_limit: u32,
    /// Rate window length in seconds.
    pub rate_window_secs: i64,
    pub require_approval_for_new_users: bool,
    /// Reputation below this flags the comment for review.
    pub review_reputation_threshold: i32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 1000,
            rate_limit: 5,
            rate_window_secs: 60,
            require_approval_for_new_users: true,
            review_reputation_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub enabled: bool,
    /// Cache TTL for resolved locations, in seconds.
    pub cache_ttl_secs: u64,
    /// Deadline for a single lookup, in seconds.
    pub lookup_timeout_secs: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self { enabled: true, cache_ttl_secs: 24 * 60 * 60, lookup_timeout_secs: 3 }
    }
}

impl PalisadeConfig {
    /// Load configuration from a TOML file. Missing file or parse failure
    /// falls back to defaults — the pipeline must come up regardless.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<PalisadeConfig>(&raw) {
                Ok(cfg) => {
                    info!(path = %path.display(), "Loaded palisade configuration");
                    cfg
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
        }
    }

    /// Serialize the active configuration back to TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = PalisadeConfig::default();
        assert!(cfg.detection.enabled);
        assert_eq!(cfg.threat.history_capacity, 100);
        assert_eq!(cfg.threat.retention_days, 30);
        assert_eq!(cfg.moderation.rate_limit, 5);
        assert_eq!(cfg.countermeasures.block_duration_secs, 86_400);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: PalisadeConfig = toml::from_str(
            r#"
            [moderation]
            rate_limit = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.moderation.rate_limit, 3);
        assert_eq!(cfg.moderation.max_length, 1000);
        assert!(cfg.detection.enabled);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let cfg = PalisadeConfig::load("/nonexistent/palisade.toml");
        assert_eq!(cfg.threat.login_failure_limit, 5);
    }

    #[test]
    fn roundtrip_toml() {
        let cfg = PalisadeConfig::default();
        let raw = cfg.to_toml();
        let back: PalisadeConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.geo.cache_ttl_secs, cfg.geo.cache_ttl_secs);
    }
}
