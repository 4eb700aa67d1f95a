//! Server-side cache tier.
//!
//! Holds three key families (list bundles, per-URL metadata and derived
//! suggestions), each with its own TTL. Nothing here is authoritative: any
//! entry can be dropped at any time and rebuilt from the persisted store.
//!
//! Mutation paths talk to the cache through [`SafeCache`], which swallows
//! backend failures. Bundle reads go through [`SafeCache::read_bundle`],
//! which enforces id-set validity against the caller's canonical items.

pub mod bundle;
pub mod keys;
pub mod memory;
pub mod read;
pub mod safe;
pub mod traits;

pub use bundle::ListBundle;
pub use keys::{CacheFamily, CacheKey};
pub use memory::{spawn_cleanup_task, InMemoryCacheBackend};
pub use read::CacheRead;
pub use safe::SafeCache;
pub use traits::{CacheBackend, CacheEntry, CacheStats};
