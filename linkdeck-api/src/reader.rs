//! Read paths: list bundle and suggestions.
//!
//! The persisted list is always read first; the cache only saves the
//! metadata resolution. A bundle whose id set no longer matches the
//! persisted one is discarded and rebuilt.

use std::sync::Arc;

use linkdeck_core::{
    sort_by_position, Actor, Capability, LinkdeckResult, List, PermissionEvaluator, SyncConfig,
};
use linkdeck_enrich::EnrichmentPipeline;
use linkdeck_storage::{CacheKey, CacheRead, ListBundle, ListStore, SafeCache};
use tracing::debug;

use crate::gateway::authorize;
use crate::suggestions::Suggestions;

/// Serves list reads through the cache tier.
pub struct ListReader {
    store: Arc<dyn ListStore>,
    cache: SafeCache,
    enrichment: EnrichmentPipeline,
    permissions: Arc<dyn PermissionEvaluator>,
    config: SyncConfig,
}

impl ListReader {
    pub fn new(
        store: Arc<dyn ListStore>,
        cache: SafeCache,
        enrichment: EnrichmentPipeline,
        permissions: Arc<dyn PermissionEvaluator>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            cache,
            enrichment,
            permissions,
            config,
        }
    }

    /// Resolve `key` (id or slug) and require View.
    pub async fn get_list(&self, key: &str, actor: &Actor) -> LinkdeckResult<List> {
        let list = self.store.require(key).await?;
        authorize(self.permissions.as_ref(), &list, actor, Capability::View)?;
        Ok(list)
    }

    /// The list's URLs in canonical order with resolved metadata.
    pub async fn bundle_for(&self, list: &List) -> CacheRead<ListBundle> {
        let mut canonical = list.urls.clone();
        sort_by_position(&mut canonical);

        if let Some(hit) = self.cache.read_bundle(list.id, &canonical).await {
            debug!(list_id = %list.id, "List bundle cache hit");
            return hit;
        }

        let urls: Vec<String> = canonical.iter().map(|u| u.url.clone()).collect();
        let metadata = self.enrichment.enrich(&urls).await;
        let bundle = ListBundle::new(canonical, metadata);
        self.cache
            .write_bundle(list.id, &bundle, self.config.list_bundle_ttl)
            .await;
        debug!(list_id = %list.id, urls = bundle.urls.len(), "Rebuilt list bundle");
        CacheRead::from_storage(bundle)
    }

    /// Duplicate suggestions, cached per list.
    pub async fn suggestions_for(&self, list: &List) -> CacheRead<Suggestions> {
        let key = CacheKey::suggestions(list.id);
        if let Some(hit) = self.cache.get::<Suggestions>(&key).await {
            return hit;
        }
        let computed = Suggestions::compute(list);
        self.cache
            .set(&key, &computed, self.config.suggestions_ttl)
            .await;
        CacheRead::from_storage(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkdeck_core::{EnrichmentError, PageMetadata, RolePermissions, UrlItem};
    use linkdeck_enrich::MetadataFetcher;
    use linkdeck_storage::{InMemoryCacheBackend, InMemoryListStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct Titled(AtomicUsize);

    #[async_trait]
    impl MetadataFetcher for Titled {
        async fn fetch(&self, url: &str) -> Result<PageMetadata, EnrichmentError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PageMetadata {
                title: Some(format!("Title of {}", url)),
                ..Default::default()
            })
        }
    }

    fn reader(list: List) -> (ListReader, Arc<Titled>) {
        let cache = SafeCache::new(Arc::new(InMemoryCacheBackend::new()));
        let fetcher = Arc::new(Titled(AtomicUsize::new(0)));
        let config = SyncConfig::default();
        let pipeline = EnrichmentPipeline::new(fetcher.clone(), cache.clone(), &config);
        let reader = ListReader::new(
            Arc::new(InMemoryListStore::with_lists([list])),
            cache,
            pipeline,
            Arc::new(RolePermissions),
            config,
        );
        (reader, fetcher)
    }

    #[tokio::test]
    async fn test_bundle_miss_then_hit() {
        let mut list = List::new(Uuid::now_v7(), "r", "R");
        list.urls = vec![
            UrlItem::new("https://b.example", 1),
            UrlItem::new("https://a.example", 0),
        ];
        let (reader, fetcher) = reader(list.clone());

        let first = reader.bundle_for(&list).await;
        assert!(!first.was_cache_hit());
        assert_eq!(first.value().urls[0].url, "https://a.example");
        assert_eq!(first.value().metadata.len(), 2);

        let second = reader.bundle_for(&list).await;
        assert!(second.was_cache_hit());
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bundle_rebuilt_when_membership_diverges() {
        let mut list = List::new(Uuid::now_v7(), "r", "R");
        list.urls = vec![UrlItem::new("https://a.example", 0)];
        let (reader, _) = reader(list.clone());
        reader.bundle_for(&list).await;

        list.urls.push(UrlItem::new("https://c.example", 1));
        let read = reader.bundle_for(&list).await;
        assert!(!read.was_cache_hit());
        assert_eq!(read.value().urls.len(), 2);
    }

    #[tokio::test]
    async fn test_private_list_hidden_from_strangers() {
        let list = List::new(Uuid::now_v7(), "private", "Private");
        let (reader, _) = reader(list.clone());
        let stranger = Actor::new(Uuid::now_v7());
        assert!(reader.get_list("private", &stranger).await.is_err());
        assert!(reader
            .get_list(&list.id.to_string(), &Actor::new(list.owner_id))
            .await
            .is_ok());
    }
}
