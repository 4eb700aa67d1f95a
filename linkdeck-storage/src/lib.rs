//! Linkdeck Storage - Cache Tier and List Store
//!
//! The cache tier ([`cache`]) is a pure performance layer with per-key TTLs.
//! The list store ([`list_store`]) is the seam to the persisted record,
//! which is always authoritative.

pub mod cache;
pub mod list_store;

pub use cache::{
    spawn_cleanup_task, CacheBackend, CacheEntry, CacheFamily, CacheKey, CacheRead, CacheStats,
    InMemoryCacheBackend, ListBundle, SafeCache,
};
pub use list_store::{InMemoryListStore, ListStore};
