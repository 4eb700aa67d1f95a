//! Sync engine configuration
//!
//! TTLs for the three cache families, enrichment limits and the add-path
//! ceiling. Loaded from `LINKDECK_*` environment variables with defaults
//! suitable for development.

use crate::{ConfigError, LinkdeckError, LinkdeckResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and concurrency knobs shared by the gateway, cache and enrichment
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// TTL of `list-urls:{listId}` bundles.
    pub list_bundle_ttl: Duration,
    /// TTL of `url-metadata:{normalizedUrl}` entries.
    pub url_metadata_ttl: Duration,
    /// TTL of `collections:suggestions:{listId}` entries.
    pub suggestions_ttl: Duration,

    /// Maximum in-flight metadata fetches.
    pub enrichment_concurrency: usize,
    /// Hard timeout on a single metadata fetch.
    pub fetch_timeout: Duration,
    /// Longest the add path waits on enrichment before answering with a
    /// fallback.
    pub add_path_ceiling: Duration,
    /// Upper bound on a detached background enrichment task.
    pub background_enrichment_lifetime: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            list_bundle_ttl: Duration::from_secs(60 * 60),
            url_metadata_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            suggestions_ttl: Duration::from_secs(60 * 60),
            enrichment_concurrency: 5,
            fetch_timeout: Duration::from_secs(4),
            add_path_ceiling: Duration::from_secs(5),
            background_enrichment_lifetime: Duration::from_secs(30),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

impl SyncConfig {
    /// Create SyncConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LINKDECK_LIST_BUNDLE_TTL_SECS` (default: 3600)
    /// - `LINKDECK_URL_METADATA_TTL_SECS` (default: 604800)
    /// - `LINKDECK_SUGGESTIONS_TTL_SECS` (default: 3600)
    /// - `LINKDECK_ENRICHMENT_CONCURRENCY` (default: 5)
    /// - `LINKDECK_FETCH_TIMEOUT_MS` (default: 4000)
    /// - `LINKDECK_ADD_PATH_CEILING_MS` (default: 5000)
    /// - `LINKDECK_BACKGROUND_ENRICHMENT_SECS` (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            list_bundle_ttl: env_secs("LINKDECK_LIST_BUNDLE_TTL_SECS")
                .unwrap_or(defaults.list_bundle_ttl),
            url_metadata_ttl: env_secs("LINKDECK_URL_METADATA_TTL_SECS")
                .unwrap_or(defaults.url_metadata_ttl),
            suggestions_ttl: env_secs("LINKDECK_SUGGESTIONS_TTL_SECS")
                .unwrap_or(defaults.suggestions_ttl),
            enrichment_concurrency: std::env::var("LINKDECK_ENRICHMENT_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.enrichment_concurrency),
            fetch_timeout: env_millis("LINKDECK_FETCH_TIMEOUT_MS")
                .unwrap_or(defaults.fetch_timeout),
            add_path_ceiling: env_millis("LINKDECK_ADD_PATH_CEILING_MS")
                .unwrap_or(defaults.add_path_ceiling),
            background_enrichment_lifetime: env_secs("LINKDECK_BACKGROUND_ENRICHMENT_SECS")
                .unwrap_or(defaults.background_enrichment_lifetime),
        }
    }

    /// Validate the configuration.
    ///
    /// Every duration must be positive, concurrency at least 1, and the
    /// background lifetime must not be shorter than a single fetch.
    pub fn validate(&self) -> LinkdeckResult<()> {
        let durations = [
            ("list_bundle_ttl", self.list_bundle_ttl),
            ("url_metadata_ttl", self.url_metadata_ttl),
            ("suggestions_ttl", self.suggestions_ttl),
            ("fetch_timeout", self.fetch_timeout),
            ("add_path_ceiling", self.add_path_ceiling),
            (
                "background_enrichment_lifetime",
                self.background_enrichment_lifetime,
            ),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(LinkdeckError::Config(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: format!("{} must be positive", field),
                }));
            }
        }

        if self.enrichment_concurrency == 0 {
            return Err(LinkdeckError::Config(ConfigError::InvalidValue {
                field: "enrichment_concurrency".to_string(),
                value: "0".to_string(),
                reason: "at least one fetch must be allowed in flight".to_string(),
            }));
        }

        if self.background_enrichment_lifetime < self.fetch_timeout {
            return Err(LinkdeckError::Config(ConfigError::InvalidValue {
                field: "background_enrichment_lifetime".to_string(),
                value: format!("{:?}", self.background_enrichment_lifetime),
                reason: "must be at least fetch_timeout".to_string(),
            }));
        }

        Ok(())
    }
}
