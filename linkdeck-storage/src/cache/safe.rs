//! Fault-swallowing cache facade.
//!
//! The cache tier is strictly an optimization. Every operation here turns a
//! backend failure into a miss (reads) or a no-op (writes), logging it at
//! `warn!`, so no caller can fail because the cache did.

use linkdeck_core::{ListId, PageMetadata, UrlItem};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::bundle::ListBundle;
use super::keys::CacheKey;
use super::read::CacheRead;
use super::traits::{CacheBackend, CacheStats};

/// Typed, infallible view over any [`CacheBackend`].
#[derive(Clone)]
pub struct SafeCache {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for SafeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeCache").finish_non_exhaustive()
    }
}

impl SafeCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Read and decode `key`. Backend errors and undecodable payloads read
    /// as a miss; an undecodable entry is also dropped.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheRead<T>> {
        let entry = match self.backend.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_value::<T>(entry.payload) {
            Ok(value) => Some(CacheRead::from_cache(value, entry.inserted_at)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.del(key).await;
                None
            }
        }
    }

    /// Encode and store `value` under `key`.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache payload not serializable, skipping set");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, payload, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed, ignoring");
        }
    }

    /// Remove `key`. Safe to call any number of times.
    pub async fn del(&self, key: &CacheKey) {
        if let Err(e) = self.backend.del(key).await {
            warn!(key = %key, error = %e, "Cache invalidation failed, ignoring");
        }
    }

    pub async fn stats(&self) -> CacheStats {
        match self.backend.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Cache stats unavailable");
                CacheStats::default()
            }
        }
    }

    // ------------------------------------------------------------------------
    // Family helpers
    // ------------------------------------------------------------------------

    /// Read the bundle for `list_id`, discarding it unless its id set equals
    /// that of `canonical`.
    pub async fn read_bundle(
        &self,
        list_id: ListId,
        canonical: &[UrlItem],
    ) -> Option<CacheRead<ListBundle>> {
        let key = CacheKey::list_bundle(list_id);
        let read = self.get::<ListBundle>(&key).await?;
        if read.value().is_valid_for(canonical) {
            return Some(read);
        }
        debug!(
            list_id = %list_id,
            cached = read.value().urls.len(),
            canonical = canonical.len(),
            "Bundle id set diverged from persisted list, discarding"
        );
        self.del(&key).await;
        None
    }

    pub async fn write_bundle(&self, list_id: ListId, bundle: &ListBundle, ttl: Duration) {
        self.set(&CacheKey::list_bundle(list_id), bundle, ttl).await;
    }

    pub async fn invalidate_bundle(&self, list_id: ListId) {
        self.del(&CacheKey::list_bundle(list_id)).await;
    }

    pub async fn invalidate_suggestions(&self, list_id: ListId) {
        self.del(&CacheKey::suggestions(list_id)).await;
    }

    /// Cached metadata for an already-normalized URL.
    pub async fn url_metadata(&self, normalized_url: &str) -> Option<PageMetadata> {
        self.get::<PageMetadata>(&CacheKey::url_metadata(normalized_url))
            .await
            .map(CacheRead::into_value)
    }

    /// Store fetched metadata. Fallback records are refused so a later
    /// attempt can retry the fetch.
    pub async fn write_url_metadata(
        &self,
        normalized_url: &str,
        metadata: &PageMetadata,
        ttl: Duration,
    ) {
        if metadata.is_fallback {
            debug!(url = normalized_url, "Refusing to cache fallback metadata");
            return;
        }
        self.set(&CacheKey::url_metadata(normalized_url), metadata, ttl)
            .await;
    }
}
