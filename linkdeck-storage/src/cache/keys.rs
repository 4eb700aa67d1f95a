//! Cache key scheme.
//!
//! Three families share one flat keyspace. Keys can only be built from the
//! enum, so a list id can never be rendered into the wrong family by a stray
//! `format!`.

use linkdeck_core::ListId;
use std::fmt;

/// Prefix of per-list bundles.
pub const LIST_BUNDLE_PREFIX: &str = "list-urls";
/// Prefix of per-URL metadata entries.
pub const URL_METADATA_PREFIX: &str = "url-metadata";
/// Prefix of derived collection suggestions.
pub const SUGGESTIONS_PREFIX: &str = "collections:suggestions";

/// Which family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    ListBundle,
    UrlMetadata,
    Suggestions,
}

/// A key into the cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `list-urls:{listId}`
    ListBundle(ListId),
    /// `url-metadata:{normalizedUrl}`. The URL must already be normalized.
    UrlMetadata(String),
    /// `collections:suggestions:{listId}`
    Suggestions(ListId),
}

impl CacheKey {
    pub fn list_bundle(list_id: ListId) -> Self {
        CacheKey::ListBundle(list_id)
    }

    pub fn url_metadata(normalized_url: impl Into<String>) -> Self {
        CacheKey::UrlMetadata(normalized_url.into())
    }

    pub fn suggestions(list_id: ListId) -> Self {
        CacheKey::Suggestions(list_id)
    }

    pub fn family(&self) -> CacheFamily {
        match self {
            CacheKey::ListBundle(_) => CacheFamily::ListBundle,
            CacheKey::UrlMetadata(_) => CacheFamily::UrlMetadata,
            CacheKey::Suggestions(_) => CacheFamily::Suggestions,
        }
    }

    /// Render the key in its wire form.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ListBundle(id) => write!(f, "{}:{}", LIST_BUNDLE_PREFIX, id),
            CacheKey::UrlMetadata(url) => write!(f, "{}:{}", URL_METADATA_PREFIX, url),
            CacheKey::Suggestions(id) => write!(f, "{}:{}", SUGGESTIONS_PREFIX, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_key_rendering() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::list_bundle(id).render(),
            "list-urls:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            CacheKey::suggestions(id).render(),
            "collections:suggestions:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            CacheKey::url_metadata("https://example.com/a").render(),
            "url-metadata:https://example.com/a"
        );
    }

    #[test]
    fn test_families_do_not_collide() {
        let id = Uuid::now_v7();
        assert_ne!(
            CacheKey::list_bundle(id).render(),
            CacheKey::suggestions(id).render()
        );
        assert_eq!(CacheKey::list_bundle(id).family(), CacheFamily::ListBundle);
    }
}
