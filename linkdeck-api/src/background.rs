//! Detached enrichment completion.
//!
//! When the add path answers with a fallback record, the real fetch keeps
//! running. Once it resolves, the result is applied to the persisted list
//! if the URL is still there and the result improves on the fallback.
//! Nothing here can fail the originating request; every failure is logged
//! and reported as a [`CompletionOutcome`].

use std::sync::Arc;
use std::time::Duration;

use linkdeck_core::{ChangeEvent, ChangeKind, LinkdeckResult, ListId, PageMetadata, UrlId};
use linkdeck_events::{publish_best_effort, ChangeNotifier};
use linkdeck_storage::{ListStore, SafeCache};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A deferred enrichment waiting to be applied.
#[derive(Debug)]
pub struct EnrichmentJob {
    pub list_id: ListId,
    pub url_id: UrlId,
    /// The URL string the fetch was started for.
    pub url: String,
    /// The record the item was filled from on the add path.
    pub fallback: PageMetadata,
    pub pending: JoinHandle<PageMetadata>,
}

/// How a background completion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The item was updated, the bundle invalidated and an event published.
    Applied,
    /// The result was no better than the fallback, or changed nothing.
    Unchanged,
    /// The list was deleted in the meantime.
    ListGone,
    /// The item was deleted, archived or had its URL replaced.
    UrlGone,
    /// The fetch did not finish within the task lifetime.
    Expired,
    /// The fetch task panicked or the write failed.
    Failed,
}

/// Applies deferred enrichment results.
#[derive(Clone)]
pub struct BackgroundEnricher {
    store: Arc<dyn ListStore>,
    cache: SafeCache,
    notifier: Arc<dyn ChangeNotifier>,
    lifetime: Duration,
}

impl BackgroundEnricher {
    pub fn new(
        store: Arc<dyn ListStore>,
        cache: SafeCache,
        notifier: Arc<dyn ChangeNotifier>,
        lifetime: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            lifetime,
        }
    }

    /// Run [`Self::complete`] on its own task.
    pub fn spawn(&self, job: EnrichmentJob) -> JoinHandle<CompletionOutcome> {
        let enricher = self.clone();
        tokio::spawn(async move { enricher.complete(job).await })
    }

    /// Wait for the fetch (bounded by the task lifetime) and apply it.
    pub async fn complete(&self, job: EnrichmentJob) -> CompletionOutcome {
        let EnrichmentJob {
            list_id,
            url_id,
            url,
            fallback,
            pending,
        } = job;

        let enriched = match tokio::time::timeout(self.lifetime, pending).await {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => {
                warn!(list_id = %list_id, url_id = %url_id, error = %e, "Background enrichment task failed");
                return CompletionOutcome::Failed;
            }
            Err(_) => {
                warn!(
                    list_id = %list_id,
                    url_id = %url_id,
                    lifetime_ms = self.lifetime.as_millis() as u64,
                    "Background enrichment expired"
                );
                return CompletionOutcome::Expired;
            }
        };

        match self
            .apply_result(list_id, url_id, &url, &fallback, &enriched)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(list_id = %list_id, url_id = %url_id, error = %e, "Failed to apply background enrichment");
                CompletionOutcome::Failed
            }
        }
    }

    /// Apply a resolved result against the current persisted list.
    pub async fn apply_result(
        &self,
        list_id: ListId,
        url_id: UrlId,
        url: &str,
        fallback: &PageMetadata,
        enriched: &PageMetadata,
    ) -> LinkdeckResult<CompletionOutcome> {
        if !enriched.differs_meaningfully_from(fallback) {
            debug!(list_id = %list_id, url_id = %url_id, "Enrichment result adds nothing over fallback");
            return Ok(CompletionOutcome::Unchanged);
        }

        let Some(mut list) = self.store.get_by_id(list_id).await? else {
            debug!(list_id = %list_id, "List gone before enrichment landed");
            return Ok(CompletionOutcome::ListGone);
        };

        let Some(item) = list.find_url_mut(url_id) else {
            debug!(list_id = %list_id, url_id = %url_id, "URL gone before enrichment landed");
            return Ok(CompletionOutcome::UrlGone);
        };
        if item.url.trim() != url {
            debug!(list_id = %list_id, url_id = %url_id, "URL replaced before enrichment landed");
            return Ok(CompletionOutcome::UrlGone);
        }
        if !item.upgrade_from_fallback(fallback, enriched) {
            return Ok(CompletionOutcome::Unchanged);
        }
        item.updated_at = chrono::Utc::now();

        self.store.put(&list).await?;
        self.cache.invalidate_bundle(list_id).await;

        let event = ChangeEvent::new(list_id, ChangeKind::UrlEnriched { url_id }).low_priority();
        publish_best_effort(self.notifier.as_ref(), &event).await;

        info!(list_id = %list_id, url_id = %url_id, "Applied background enrichment");
        Ok(CompletionOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkdeck_core::{List, NotificationError, UrlItem};
    use linkdeck_storage::{InMemoryCacheBackend, InMemoryListStore};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Collecting {
        events: Mutex<Vec<ChangeEvent>>,
    }

    #[async_trait]
    impl ChangeNotifier for Collecting {
        async fn publish(&self, event: &ChangeEvent) -> Result<usize, NotificationError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(1)
        }
    }

    fn fixture() -> (List, UrlId, PageMetadata) {
        let mut list = List::new(Uuid::now_v7(), "reading", "Reading");
        let fallback = PageMetadata::fallback("example.com");
        let mut item = UrlItem::new("https://example.com/a", 0);
        item.fill_from_metadata(&fallback);
        let id = item.id;
        list.urls.push(item);
        (list, id, fallback)
    }

    fn enriched() -> PageMetadata {
        PageMetadata {
            title: Some("Example Article".into()),
            description: Some("Long read".into()),
            ..Default::default()
        }
    }

    fn enricher(store: Arc<InMemoryListStore>, notifier: Arc<Collecting>) -> BackgroundEnricher {
        BackgroundEnricher::new(
            store,
            SafeCache::new(Arc::new(InMemoryCacheBackend::new())),
            notifier,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_upgrade_applies_and_publishes_low_priority() {
        let (list, url_id, fallback) = fixture();
        let list_id = list.id;
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let notifier = Arc::new(Collecting::default());
        let bg = enricher(store.clone(), notifier.clone());

        let outcome = bg
            .apply_result(list_id, url_id, "https://example.com/a", &fallback, &enriched())
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Applied);

        let stored = store.get_by_id(list_id).await.unwrap().unwrap();
        let item = stored.find_url(url_id).unwrap();
        assert_eq!(item.title.as_deref(), Some("Example Article"));
        assert_eq!(item.description.as_deref(), Some("Long read"));

        let events = notifier.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].priority, linkdeck_core::EventPriority::Low);
    }

    #[tokio::test]
    async fn test_fallback_result_is_not_applied() {
        let (list, url_id, fallback) = fixture();
        let list_id = list.id;
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let notifier = Arc::new(Collecting::default());
        let bg = enricher(store, notifier.clone());

        let outcome = bg
            .apply_result(list_id, url_id, "https://example.com/a", &fallback, &fallback)
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Unchanged);
        assert!(notifier.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_url_is_left_alone() {
        let (mut list, url_id, fallback) = fixture();
        list.urls.clear();
        let list_id = list.id;
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let bg = enricher(store, Arc::new(Collecting::default()));

        let outcome = bg
            .apply_result(list_id, url_id, "https://example.com/a", &fallback, &enriched())
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::UrlGone);
    }

    #[tokio::test]
    async fn test_replaced_url_is_left_alone() {
        let (list, url_id, fallback) = fixture();
        let list_id = list.id;
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let bg = enricher(store, Arc::new(Collecting::default()));

        let outcome = bg
            .apply_result(list_id, url_id, "https://example.com/other", &fallback, &enriched())
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::UrlGone);
    }

    #[tokio::test]
    async fn test_missing_list() {
        let (_, url_id, fallback) = fixture();
        let bg = enricher(
            Arc::new(InMemoryListStore::new()),
            Arc::new(Collecting::default()),
        );
        let outcome = bg
            .apply_result(Uuid::now_v7(), url_id, "https://example.com/a", &fallback, &enriched())
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::ListGone);
    }

    #[tokio::test]
    async fn test_expired_job() {
        let (list, url_id, fallback) = fixture();
        let list_id = list.id;
        let store = Arc::new(InMemoryListStore::with_lists([list]));
        let bg = BackgroundEnricher::new(
            store,
            SafeCache::new(Arc::new(InMemoryCacheBackend::new())),
            Arc::new(Collecting::default()),
            Duration::from_millis(20),
        );
        let pending = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            PageMetadata::default()
        });
        let outcome = bg
            .complete(EnrichmentJob {
                list_id,
                url_id,
                url: "https://example.com/a".into(),
                fallback,
                pending,
            })
            .await;
        assert_eq!(outcome, CompletionOutcome::Expired);
    }
}
