//! Persisted list store seam.
//!
//! The real store is a relational database outside this workspace; the sync
//! engine only needs get-by-id, get-by-slug and whole-record put. Writes are
//! last-write-wins: there is no version check, so two writers racing on the
//! same list both succeed and the later `put` is what remains.

use async_trait::async_trait;
use linkdeck_core::{EntityType, LinkdeckError, LinkdeckResult, List, ListId, StorageError};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Async access to persisted lists.
#[async_trait]
pub trait ListStore: Send + Sync {
    async fn get_by_id(&self, id: ListId) -> LinkdeckResult<Option<List>>;

    async fn get_by_slug(&self, slug: &str) -> LinkdeckResult<Option<List>>;

    /// Insert or replace the whole record.
    async fn put(&self, list: &List) -> LinkdeckResult<()>;

    /// Remove a list. Returns whether it existed.
    async fn delete(&self, id: ListId) -> LinkdeckResult<bool>;

    /// Resolve a route key that is either a list id or a slug.
    async fn resolve(&self, key: &str) -> LinkdeckResult<Option<List>> {
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(list) = self.get_by_id(id).await? {
                return Ok(Some(list));
            }
        }
        self.get_by_slug(key).await
    }

    /// Like [`ListStore::resolve`] but a missing list is an error.
    async fn require(&self, key: &str) -> LinkdeckResult<List> {
        self.resolve(key)
            .await?
            .ok_or_else(|| LinkdeckError::not_found(EntityType::List, key))
    }
}

/// In-memory store for tests and the development server.
#[derive(Debug, Default)]
pub struct InMemoryListStore {
    lists: RwLock<HashMap<ListId, List>>,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, bypassing slug checks.
    pub fn with_lists(lists: impl IntoIterator<Item = List>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.lists.write() {
            for list in lists {
                guard.insert(list.id, list);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.lists.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> LinkdeckError {
    LinkdeckError::Storage(StorageError::LockPoisoned)
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn get_by_id(&self, id: ListId) -> LinkdeckResult<Option<List>> {
        let lists = self.lists.read().map_err(poisoned)?;
        Ok(lists.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> LinkdeckResult<Option<List>> {
        let lists = self.lists.read().map_err(poisoned)?;
        Ok(lists.values().find(|l| l.slug == slug).cloned())
    }

    async fn put(&self, list: &List) -> LinkdeckResult<()> {
        let mut lists = self.lists.write().map_err(poisoned)?;
        if lists
            .values()
            .any(|other| other.slug == list.slug && other.id != list.id)
        {
            return Err(LinkdeckError::Storage(StorageError::WriteFailed {
                entity_type: EntityType::List,
                reason: format!("slug '{}' already taken", list.slug),
            }));
        }
        lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn delete(&self, id: ListId) -> LinkdeckResult<bool> {
        let mut lists = self.lists.write().map_err(poisoned)?;
        Ok(lists.remove(&id).is_some())
    }
}
