//! Derived per-list suggestions.
//!
//! Suggestions are cached under `collections:suggestions:{listId}` and
//! dropped whenever list membership or any URL string changes. The only
//! suggestion computed today is duplicate detection over normalized URLs.

use std::collections::HashMap;

use linkdeck_core::{List, ListId, Timestamp, UrlId};
use linkdeck_enrich::normalize_url;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// URLs in one list that normalize to the same address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DuplicateGroup {
    pub normalized_url: String,
    /// Member ids in canonical (position) order.
    #[schema(value_type = Vec<String>)]
    pub url_ids: Vec<UrlId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Suggestions {
    #[schema(value_type = String, format = "uuid")]
    pub list_id: ListId,
    pub duplicates: Vec<DuplicateGroup>,
    #[schema(value_type = String, format = "date-time")]
    pub computed_at: Timestamp,
}

impl Suggestions {
    pub fn compute(list: &List) -> Self {
        Self {
            list_id: list.id,
            duplicates: find_duplicates(list),
            computed_at: chrono::Utc::now(),
        }
    }
}

/// Group active URLs by normalized form, keeping groups of two or more.
///
/// Groups are ordered by the position of their first member.
pub fn find_duplicates(list: &List) -> Vec<DuplicateGroup> {
    let mut ordered = list.urls.clone();
    linkdeck_core::sort_by_position(&mut ordered);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for item in &ordered {
        let normalized = normalize_url(&item.url);
        match index.get(&normalized) {
            Some(&i) => groups[i].url_ids.push(item.id),
            None => {
                index.insert(normalized.clone(), groups.len());
                groups.push(DuplicateGroup {
                    normalized_url: normalized,
                    url_ids: vec![item.id],
                });
            }
        }
    }

    groups.retain(|g| g.url_ids.len() > 1);
    groups
}
