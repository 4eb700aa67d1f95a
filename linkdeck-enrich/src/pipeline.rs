//! Cache-first, bounded-concurrency metadata enrichment.
//!
//! For each URL the pipeline consults `url-metadata:{normalizedUrl}`, then
//! fetches the misses with at most `enrichment_concurrency` requests in
//! flight, each under a hard timeout. Successful results are written
//! through to the cache. Failures and timeouts produce the hostname
//! fallback, which is never cached.

use futures_util::future::join_all;
use linkdeck_core::{EnrichmentError, PageMetadata, SyncConfig};
use linkdeck_storage::SafeCache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::url::{hostname, normalize_url};
use crate::{AiEnhancer, MetadataFetcher};

/// Result of waiting on enrichment for at most a fixed ceiling.
#[derive(Debug)]
pub enum CeilingOutcome {
    /// Enrichment finished in time. May still be a fallback if the fetch
    /// failed quickly.
    Ready(PageMetadata),
    /// The ceiling elapsed. `fallback` is usable now; `pending` resolves to
    /// the real result and keeps running if dropped.
    Deferred {
        fallback: PageMetadata,
        pending: JoinHandle<PageMetadata>,
    },
}

impl CeilingOutcome {
    /// The metadata to answer with right now.
    pub fn immediate(&self) -> &PageMetadata {
        match self {
            CeilingOutcome::Ready(meta) => meta,
            CeilingOutcome::Deferred { fallback, .. } => fallback,
        }
    }
}

/// The enrichment pipeline. Cheap to clone; clones share the concurrency
/// limit.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    fetcher: Arc<dyn MetadataFetcher>,
    enhancer: Option<Arc<dyn AiEnhancer>>,
    cache: SafeCache,
    limiter: Arc<Semaphore>,
    fetch_timeout: Duration,
    metadata_ttl: Duration,
}

impl std::fmt::Debug for EnrichmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentPipeline")
            .field("enhancer", &self.enhancer.is_some())
            .field("available_permits", &self.limiter.available_permits())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl EnrichmentPipeline {
    pub fn new(fetcher: Arc<dyn MetadataFetcher>, cache: SafeCache, config: &SyncConfig) -> Self {
        Self {
            fetcher,
            enhancer: None,
            cache,
            limiter: Arc::new(Semaphore::new(config.enrichment_concurrency.max(1))),
            fetch_timeout: config.fetch_timeout,
            metadata_ttl: config.url_metadata_ttl,
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn AiEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Resolve metadata for every URL. Always returns one entry per distinct
    /// input string; never fails.
    pub async fn enrich(&self, urls: &[String]) -> HashMap<String, PageMetadata> {
        // Group inputs by normalized form so each page is fetched once.
        let mut by_normalized: HashMap<String, Vec<&String>> = HashMap::new();
        for url in urls {
            by_normalized.entry(normalize_url(url)).or_default().push(url);
        }

        let mut resolved: HashMap<String, PageMetadata> = HashMap::new();
        let mut misses: Vec<(String, String)> = Vec::new();
        for (normalized, originals) in &by_normalized {
            match self.cache.url_metadata(normalized).await {
                Some(meta) => {
                    resolved.insert(normalized.clone(), meta);
                }
                None => misses.push((normalized.clone(), originals[0].clone())),
            }
        }
        let hits = resolved.len();

        let fetched = join_all(
            misses
                .iter()
                .map(|(normalized, original)| self.fetch_fresh(normalized, original)),
        )
        .await;
        let mut fallbacks = 0;
        for ((normalized, _), meta) in misses.into_iter().zip(fetched) {
            if meta.is_fallback {
                fallbacks += 1;
            }
            resolved.insert(normalized, meta);
        }

        debug!(
            requested = urls.len(),
            hits,
            fetched = by_normalized.len() - hits,
            fallbacks,
            "Enrichment batch resolved"
        );

        let mut out = HashMap::with_capacity(urls.len());
        for (normalized, originals) in by_normalized {
            if let Some(meta) = resolved.get(&normalized) {
                for original in originals {
                    out.insert(original.clone(), meta.clone());
                }
            }
        }
        out
    }

    /// Resolve a single URL.
    pub async fn enrich_one(&self, url: &str) -> PageMetadata {
        let normalized = normalize_url(url);
        if let Some(meta) = self.cache.url_metadata(&normalized).await {
            return meta;
        }
        self.fetch_fresh(&normalized, url).await
    }

    /// Run [`Self::enrich_one`] on its own task and wait at most `ceiling`.
    ///
    /// On expiry the task is left running so its result can be applied
    /// later; the cache write-through happens inside it either way.
    pub async fn enrich_with_ceiling(&self, url: &str, ceiling: Duration) -> CeilingOutcome {
        let pipeline = self.clone();
        let owned = url.to_string();
        let mut pending = tokio::spawn(async move { pipeline.enrich_one(&owned).await });

        match tokio::time::timeout(ceiling, &mut pending).await {
            Ok(Ok(meta)) => CeilingOutcome::Ready(meta),
            Ok(Err(e)) => {
                warn!(url, error = %e, "Enrichment task failed");
                CeilingOutcome::Ready(Self::fallback_for(url))
            }
            Err(_) => {
                debug!(
                    url,
                    ceiling_ms = ceiling.as_millis() as u64,
                    "Enrichment exceeded add-path ceiling, deferring"
                );
                CeilingOutcome::Deferred {
                    fallback: Self::fallback_for(url),
                    pending,
                }
            }
        }
    }

    /// The synthesized record used when enrichment fails.
    pub fn fallback_for(url: &str) -> PageMetadata {
        PageMetadata::fallback(&hostname(url))
    }

    async fn fetch_fresh(&self, normalized: &str, original: &str) -> PageMetadata {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(url = original, error = %e, "Enrichment limiter closed");
                return Self::fallback_for(original);
            }
        };

        let mut meta = match self.fetch_with_timeout(original).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(url = original, error = %e, "Metadata fetch failed, using fallback");
                return Self::fallback_for(original);
            }
        };

        if let Some(enhancer) = &self.enhancer {
            match tokio::time::timeout(self.fetch_timeout, enhancer.enhance(original, &meta)).await
            {
                Ok(Ok(extra)) => meta.absorb_enhancement(extra),
                Ok(Err(e)) => warn!(url = original, error = %e, "AI enhancement failed"),
                Err(_) => warn!(url = original, "AI enhancement timed out"),
            }
        }

        // A page with no title at all still gets a usable one.
        if meta.title.is_none() {
            meta.title = Some(hostname(original));
        }
        meta.is_fallback = false;

        self.cache
            .write_url_metadata(normalized, &meta, self.metadata_ttl)
            .await;
        meta
    }

    async fn fetch_with_timeout(&self, url: &str) -> Result<PageMetadata, EnrichmentError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(EnrichmentError::Timeout {
                url: url.to_string(),
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use linkdeck_storage::{CacheKey, InMemoryCacheBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; fails for hosts containing "down", sleeps for "slow".
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl MetadataFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<PageMetadata, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("down") {
                return Err(EnrichmentError::FetchFailed {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                });
            }
            Ok(PageMetadata {
                title: Some(format!("Title of {}", url)),
                ..Default::default()
            })
        }
    }

    fn pipeline(fetcher: Arc<CountingFetcher>) -> (Arc<InMemoryCacheBackend>, EnrichmentPipeline) {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let config = SyncConfig {
            fetch_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let pipeline = EnrichmentPipeline::new(fetcher, SafeCache::new(backend.clone()), &config);
        (backend, pipeline)
    }

    #[tokio::test]
    async fn test_fallback_is_never_cached() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (backend, pipeline) = pipeline(fetcher.clone());
        let urls = vec!["http://down.example".to_string()];

        let first = pipeline.enrich(&urls).await;
        let meta = &first["http://down.example"];
        assert!(meta.is_fallback);
        assert_eq!(meta.title.as_deref(), Some("down.example"));
        assert_eq!(meta.site_name.as_deref(), Some("down.example"));
        assert!(backend.is_empty());

        pipeline.enrich(&urls).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_is_written_through() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (backend, pipeline) = pipeline(fetcher.clone());
        let urls = vec!["https://ok.example/".to_string()];

        let first = pipeline.enrich(&urls).await;
        assert!(!first["https://ok.example/"].is_fallback);
        assert!(backend.contains(&CacheKey::url_metadata("https://ok.example")));

        let second = pipeline.enrich(&urls).await;
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped_at_five() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (_, pipeline) = pipeline(fetcher.clone());
        let urls: Vec<String> = (0..12).map(|i| format!("https://s{}.example", i)).collect();

        let out = pipeline.enrich(&urls).await;
        assert_eq!(out.len(), 12);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 12);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_spellings_share_one_fetch() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (_, pipeline) = pipeline(fetcher.clone());
        let urls = vec![
            "https://Same.example/".to_string(),
            "https://same.example#top".to_string(),
        ];
        let out = pipeline.enrich(&urls).await;
        assert_eq!(out.len(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_yields_fallback() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (backend, pipeline) = pipeline(fetcher);
        let meta = pipeline.enrich_one("https://slow.example").await;
        assert!(meta.is_fallback);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_ceiling_defers_slow_enrichment() {
        let fetcher = Arc::new(CountingFetcher::default());
        let (_, pipeline) = pipeline(fetcher);

        let outcome = pipeline
            .enrich_with_ceiling("https://slow.example", Duration::from_millis(10))
            .await;
        assert!(outcome.immediate().is_fallback);
        match outcome {
            CeilingOutcome::Deferred { pending, .. } => {
                // The fetch itself then times out, so the late result is a
                // fallback too.
                assert!(pending.await.unwrap().is_fallback);
            }
            CeilingOutcome::Ready(_) => panic!("expected deferral"),
        }

        let ready = pipeline
            .enrich_with_ceiling("https://fast.example", Duration::from_secs(5))
            .await;
        assert!(matches!(ready, CeilingOutcome::Ready(ref m) if !m.is_fallback));
    }
}
