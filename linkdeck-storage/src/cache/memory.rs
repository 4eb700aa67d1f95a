//! In-process TTL cache backend.
//!
//! A `DashMap` keyed by rendered cache key. Expired entries are evicted
//! lazily on read and in bulk by [`InMemoryCacheBackend::cleanup_expired`],
//! which [`spawn_cleanup_task`] runs on an interval.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use linkdeck_core::LinkdeckResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::keys::CacheKey;
use super::traits::{CacheBackend, CacheEntry, CacheStats};

/// Shared in-memory cache backend.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` as of `now`, evicting it if expired.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        let rendered = key.render();
        if let Some(entry) = self.entries.get(&rendered) {
            if !entry.is_expired_at(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %rendered, "Cache hit");
                return Some(entry.clone());
            }
            drop(entry);
            // Only drop it if nobody replaced it in the meantime.
            if self
                .entries
                .remove_if(&rendered, |_, e| e.is_expired_at(now))
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %rendered, "Cache miss");
        None
    }

    /// Whether a live entry exists, without touching hit/miss counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Utc::now();
        self.entries
            .get(&key.render())
            .map(|e| !e.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry expired as of `now`. Returns how many were dropped.
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired_at(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "Cleaned up expired cache entries");
        }
        removed
    }

    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    pub fn clear(&self) {
        self.entries.clear();
        info!("In-memory cache cleared");
    }

    fn snapshot_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &CacheKey) -> LinkdeckResult<Option<CacheEntry>> {
        Ok(self.get_at(key, Utc::now()))
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> LinkdeckResult<()> {
        let entry = CacheEntry::new(key, payload, ttl);
        debug!(key = %entry.key, ttl_secs = ttl.as_secs(), "Cache set");
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn del(&self, key: &CacheKey) -> LinkdeckResult<()> {
        let rendered = key.render();
        if self.entries.remove(&rendered).is_some() {
            debug!(key = %rendered, "Cache entry invalidated");
        }
        Ok(())
    }

    async fn stats(&self) -> LinkdeckResult<CacheStats> {
        Ok(self.snapshot_stats())
    }
}

/// Spawn a background task that periodically drops expired entries.
pub fn spawn_cleanup_task(
    cache: Arc<InMemoryCacheBackend>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(
        interval_secs = interval.as_secs(),
        "Cache cleanup task started"
    );
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = cache.cleanup_expired();
            let stats = cache.snapshot_stats();
            debug!(
                removed,
                entries = stats.entry_count,
                hit_rate = format!("{:.2}", stats.hit_rate()),
                "Cache cleanup completed"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = InMemoryCacheBackend::new();
        let key = CacheKey::list_bundle(Uuid::now_v7());

        assert!(cache.get(&key).await.unwrap().is_none());
        cache
            .set(&key, json!({"n": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        let entry = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.payload, json!({"n": 1}));
        assert_eq!(entry.key, key.render());

        cache.del(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_invalidation_is_idempotent() {
        let cache = InMemoryCacheBackend::new();
        let list_id = Uuid::now_v7();
        let bundle = CacheKey::list_bundle(list_id);
        let other = CacheKey::suggestions(list_id);
        cache.set(&bundle, json!([1]), Duration::from_secs(60)).await.unwrap();
        cache.set(&other, json!([2]), Duration::from_secs(60)).await.unwrap();

        cache.del(&bundle).await.unwrap();
        let once: Vec<bool> = vec![cache.contains(&bundle), cache.contains(&other)];
        let len_once = cache.len();

        cache.del(&bundle).await.unwrap();
        let twice: Vec<bool> = vec![cache.contains(&bundle), cache.contains(&other)];

        assert_eq!(once, twice);
        assert_eq!(len_once, cache.len());
        assert_eq!(twice, vec![false, true]);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss_and_is_evicted() {
        let cache = InMemoryCacheBackend::new();
        let key = CacheKey::url_metadata("https://a.example");
        cache.set(&key, json!({}), Duration::from_secs(10)).await.unwrap();

        let later = Utc::now() + chrono::Duration::seconds(11);
        assert!(cache.get_at(&key, later).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = InMemoryCacheBackend::new();
        let short = CacheKey::url_metadata("https://short.example");
        let long = CacheKey::url_metadata("https://long.example");
        cache.set(&short, json!(1), Duration::from_secs(5)).await.unwrap();
        cache.set(&long, json!(2), Duration::from_secs(500)).await.unwrap();

        let removed = cache.cleanup_expired_at(Utc::now() + chrono::Duration::seconds(6));
        assert_eq!(removed, 1);
        assert!(cache.contains(&long));
        assert!(!cache.contains(&short));
    }
}
