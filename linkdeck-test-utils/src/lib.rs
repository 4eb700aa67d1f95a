//! Linkdeck Test Utilities
//!
//! Centralized test infrastructure for the Linkdeck workspace:
//! - Proptest generators for lists, URL items and reorders
//! - Scripted fetchers and enhancers, recording notifiers and failing cache
//!   backends
//! - Test fixtures for common list shapes
//! - Custom assertions for Linkdeck-specific validation

pub use linkdeck_core::{
    Actor, ChangeEvent, ChangeKind, Collaborator, EntityType, LinkdeckError, LinkdeckResult,
    List, PageMetadata, Role, StorageError, UrlId, UrlItem, UserId,
};

use async_trait::async_trait;
use linkdeck_core::{CacheError, EnrichmentError, NotificationError};
use linkdeck_enrich::{AiEnhancer, MetadataFetcher};
use linkdeck_events::ChangeNotifier;
use linkdeck_storage::{CacheBackend, CacheEntry, CacheKey, CacheStats};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// How [`ScriptedFetcher`] answers one URL.
#[derive(Debug, Clone)]
pub enum FetchScript {
    Page(PageMetadata),
    Fail,
    Delayed(Duration, PageMetadata),
}

/// Metadata fetcher with per-URL scripted answers.
///
/// Unscripted URLs answer immediately with `"Page at {url}"` as the title.
/// Records call counts and the peak number of concurrent fetches.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, FetchScript>>,
    latency: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency applied to every unscripted URL.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_page(self, url: impl Into<String>, page: PageMetadata) -> Self {
        self.script(url, FetchScript::Page(page));
        self
    }

    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.script(url, FetchScript::Fail);
        self
    }

    pub fn with_delay(self, url: impl Into<String>, delay: Duration, page: PageMetadata) -> Self {
        self.script(url, FetchScript::Delayed(delay, page));
        self
    }

    pub fn script(&self, url: impl Into<String>, script: FetchScript) {
        self.scripts.lock().unwrap().insert(url.into(), script);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn answer(&self, url: &str) -> FetchScript {
        self.scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                FetchScript::Delayed(self.latency, fixtures::page(&format!("Page at {}", url)))
            })
    }
}

#[async_trait]
impl MetadataFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, EnrichmentError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.answer(url) {
            FetchScript::Page(page) => Ok(page),
            FetchScript::Fail => Err(EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            }),
            FetchScript::Delayed(delay, page) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(page)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============================================================================
// MOCK ENHANCER
// ============================================================================

/// How [`ScriptedEnhancer`] answers every call.
#[derive(Debug, Clone)]
pub enum EnhanceScript {
    Answer(PageMetadata),
    Fail,
    Hang,
}

/// AI enhancer that gives one scripted answer to every page.
#[derive(Debug)]
pub struct ScriptedEnhancer {
    script: EnhanceScript,
    calls: AtomicUsize,
}

impl ScriptedEnhancer {
    /// Answers with the given category, tags and summary.
    pub fn answering(category: &str, tags: &[&str], summary: &str) -> Self {
        Self::new(EnhanceScript::Answer(PageMetadata {
            category: Some(category.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            summary: Some(summary.to_string()),
            ..Default::default()
        }))
    }

    pub fn failing() -> Self {
        Self::new(EnhanceScript::Fail)
    }

    /// Never answers; the caller's timeout has to fire.
    pub fn hanging() -> Self {
        Self::new(EnhanceScript::Hang)
    }

    pub fn new(script: EnhanceScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiEnhancer for ScriptedEnhancer {
    async fn enhance(
        &self,
        url: &str,
        _page: &PageMetadata,
    ) -> Result<PageMetadata, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            EnhanceScript::Answer(extra) => Ok(extra.clone()),
            EnhanceScript::Fail => Err(EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: "scripted enhancer failure".to_string(),
            }),
            EnhanceScript::Hang => {
                std::future::pending::<()>().await;
                Err(EnrichmentError::FetchFailed {
                    url: url.to_string(),
                    reason: "unreachable".to_string(),
                })
            }
        }
    }
}

// ============================================================================
// MOCK NOTIFIER
// ============================================================================

/// Notifier that records every published event. Can be switched into a
/// failing mode to exercise best-effort delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ChangeEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(ChangeEvent::action_name)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn publish(&self, event: &ChangeEvent) -> Result<usize, NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::DeliveryFailed {
                channel: format!("list:{}", event.list_id),
                reason: "scripted failure".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(1)
    }
}

// ============================================================================
// MOCK CACHE BACKEND
// ============================================================================

/// Cache backend whose every operation fails, as an unreachable cache
/// server would.
#[derive(Debug, Default)]
pub struct FailingCacheBackend {
    attempts: AtomicUsize,
}

impl FailingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> LinkdeckResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LinkdeckError::Cache(CacheError::Unavailable {
            reason: "connection refused".to_string(),
        }))
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &CacheKey) -> LinkdeckResult<Option<CacheEntry>> {
        self.fail()
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _payload: serde_json::Value,
        _ttl: Duration,
    ) -> LinkdeckResult<()> {
        self.fail()
    }

    async fn del(&self, _key: &CacheKey) -> LinkdeckResult<()> {
        self.fail()
    }

    async fn stats(&self) -> LinkdeckResult<CacheStats> {
        self.fail()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        any::<u128>().prop_map(Uuid::from_u128)
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Owner), Just(Role::Editor), Just(Role::Viewer)]
    }

    /// An http(s) URL on a small set of hosts, so duplicates occur.
    pub fn arb_url_string() -> impl Strategy<Value = String> {
        (
            prop_oneof![Just("http"), Just("https")],
            prop_oneof![
                Just("example.com"),
                Just("docs.example.org"),
                Just("news.example.net"),
                Just("blog.example.dev"),
            ],
            "[a-z]{1,8}",
        )
            .prop_map(|(scheme, host, path)| format!("{}://{}/{}", scheme, host, path))
    }

    /// Items with distinct ids and contiguous positions `0..n`.
    pub fn arb_url_items(max: usize) -> impl Strategy<Value = Vec<UrlItem>> {
        prop::collection::vec(arb_url_string(), 0..=max).prop_map(|urls| {
            urls.into_iter()
                .enumerate()
                .map(|(i, url)| UrlItem::new(url, i as i64))
                .collect()
        })
    }

    /// Like [`arb_url_items`] but never empty.
    pub fn arb_nonempty_url_items(max: usize) -> impl Strategy<Value = Vec<UrlItem>> {
        prop::collection::vec(arb_url_string(), 1..=max.max(1)).prop_map(|urls| {
            urls.into_iter()
                .enumerate()
                .map(|(i, url)| UrlItem::new(url, i as i64))
                .collect()
        })
    }

    pub fn arb_list(max_urls: usize) -> impl Strategy<Value = List> {
        (arb_user_id(), arb_url_items(max_urls), any::<bool>()).prop_map(
            |(owner, urls, is_public)| {
                let mut list = List::new(owner, "generated", "Generated");
                list.urls = urls;
                list.is_public = is_public;
                list
            },
        )
    }

    /// A list together with a shuffled copy of its id sequence.
    pub fn arb_list_with_permutation(max_urls: usize) -> impl Strategy<Value = (List, Vec<UrlId>)> {
        arb_list(max_urls).prop_flat_map(|list| {
            let ids = list.url_ids();
            (Just(list), Just(ids).prop_shuffle())
        })
    }

    pub fn arb_page_metadata() -> impl Strategy<Value = PageMetadata> {
        (
            proptest::option::of("[A-Za-z ]{1,24}"),
            proptest::option::of("[A-Za-z ]{1,48}"),
            proptest::option::of(prop_oneof![Just("reading"), Just("tools"), Just("news")]),
        )
            .prop_map(|(title, description, category)| PageMetadata {
                title,
                description,
                category: category.map(str::to_string),
                ..Default::default()
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use uuid::Uuid;

    pub fn url_at(i: usize) -> String {
        format!("https://site{}.example/page", i)
    }

    /// A private list owned by a fresh user with `n` URLs at positions `0..n`.
    pub fn owned_list(slug: &str, n: usize) -> List {
        let mut list = List::new(Uuid::now_v7(), slug, slug);
        list.urls = (0..n).map(|i| UrlItem::new(url_at(i), i as i64)).collect();
        list
    }

    /// A collaborative list with an editor and a viewer.
    pub struct SharedList {
        pub list: List,
        pub owner: Actor,
        pub editor: Actor,
        pub viewer: Actor,
        pub stranger: Actor,
    }

    pub fn shared_list(slug: &str, n: usize) -> SharedList {
        let mut list = owned_list(slug, n);
        let editor = Uuid::now_v7();
        let viewer = Uuid::now_v7();
        list.collaborators = vec![
            Collaborator {
                user_id: editor,
                role: Role::Editor,
            },
            Collaborator {
                user_id: viewer,
                role: Role::Viewer,
            },
        ];
        SharedList {
            owner: Actor::new(list.owner_id),
            editor: Actor::new(editor),
            viewer: Actor::new(viewer),
            stranger: Actor::new(Uuid::now_v7()),
            list,
        }
    }

    pub fn page(title: &str) -> PageMetadata {
        PageMetadata {
            title: Some(title.to_string()),
            description: Some(format!("About {}", title)),
            ..Default::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    use super::*;

    #[track_caller]
    pub fn assert_permission_denied<T: std::fmt::Debug>(result: &LinkdeckResult<T>) {
        match result {
            Err(LinkdeckError::PermissionDenied { .. }) => {}
            other => panic!("Expected PermissionDenied, got {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &LinkdeckResult<T>, entity_type: EntityType) {
        match result {
            Err(LinkdeckError::Storage(StorageError::NotFound {
                entity_type: actual,
                ..
            })) => assert_eq!(*actual, entity_type, "Wrong entity type in NotFound"),
            other => panic!("Expected NotFound({:?}), got {:?}", entity_type, other),
        }
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &LinkdeckResult<T>) {
        match result {
            Err(LinkdeckError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    /// Positions of the active URLs are exactly `0..n` in array order.
    #[track_caller]
    pub fn assert_positions_contiguous(list: &List) {
        let positions: Vec<i64> = list.urls.iter().map(|u| u.position).collect();
        let expected: Vec<i64> = (0..list.urls.len() as i64).collect();
        assert_eq!(positions, expected, "Positions are not contiguous");
    }
}

// ============================================================================
// TESTS
// ============================================================================
