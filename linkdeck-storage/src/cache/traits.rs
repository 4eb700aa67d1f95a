//! Cache backend trait and entry/stats types.
//!
//! Backends store JSON payloads under rendered [`CacheKey`]s with a per-key
//! TTL. There are no transactions: every populate or invalidation is a
//! single `set` or `del`, so no entry is ever partially written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkdeck_core::LinkdeckResult;
use std::time::Duration;

use super::keys::CacheKey;

/// A stored cache value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub inserted_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, payload: serde_json::Value, ttl: Duration) -> Self {
        Self {
            key: key.render(),
            payload,
            inserted_at: Utc::now(),
            ttl,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        self.inserted_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// An entry whose TTL has elapsed reads as a miss.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Pluggable cache backend.
///
/// Implementations must be safe to share across requests. Errors surface as
/// `LinkdeckError::Cache`; callers on the mutation path go through
/// [`SafeCache`](super::SafeCache), which degrades them to a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a live entry, or `None` on miss or expiry.
    async fn get(&self, key: &CacheKey) -> LinkdeckResult<Option<CacheEntry>>;

    /// Store `payload` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, payload: serde_json::Value, ttl: Duration)
        -> LinkdeckResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn del(&self, key: &CacheKey) -> LinkdeckResult<()>;

    /// Get cache statistics.
    async fn stats(&self) -> LinkdeckResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired reads included.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of entries dropped because their TTL elapsed.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
