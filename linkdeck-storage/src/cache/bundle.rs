//! Per-list cache bundle.

use chrono::Utc;
use linkdeck_core::{same_id_set, PageMetadata, Timestamp, UrlItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cached pairing of a list's URL array with resolved metadata keyed by URL.
///
/// The bundle remembers the exact items it was computed from. It is only
/// reusable while that id set equals the canonical one; differences in order
/// or in item content are tolerated since per-URL metadata carries its own
/// TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBundle {
    pub urls: Vec<UrlItem>,
    #[serde(default)]
    pub metadata: HashMap<String, PageMetadata>,
    pub fetched_at: Timestamp,
}

impl ListBundle {
    pub fn new(urls: Vec<UrlItem>, metadata: HashMap<String, PageMetadata>) -> Self {
        Self {
            urls,
            metadata,
            fetched_at: Utc::now(),
        }
    }

    /// Whether this bundle may be served for the given canonical items.
    pub fn is_valid_for(&self, canonical: &[UrlItem]) -> bool {
        same_id_set(&self.urls, canonical)
    }
}
