//! Snapshot comparison.
//!
//! Four independent flags describe how an incoming server snapshot differs
//! from the held one. The merge rules in [`crate::store`] are defined purely
//! in terms of these flags.

use linkdeck_core::{id_sequence, id_set, List, UrlItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotDiff {
    /// id, title, description, visibility or collaborators differ.
    pub metadata_changed: bool,
    pub urls_length_changed: bool,
    /// The id sequence differs.
    pub urls_order_changed: bool,
    /// Ids were added or removed, or a shared id differs in a non-order field.
    pub urls_content_changed: bool,
}

impl SnapshotDiff {
    pub fn between(held: &List, incoming: &List) -> Self {
        Self {
            metadata_changed: metadata_differs(held, incoming),
            urls_length_changed: held.urls.len() != incoming.urls.len(),
            urls_order_changed: id_sequence(&held.urls) != id_sequence(&incoming.urls),
            urls_content_changed: content_differs(&held.urls, &incoming.urls),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SnapshotDiff::default()
    }

    pub fn is_order_only(&self) -> bool {
        self.urls_order_changed
            && !self.metadata_changed
            && !self.urls_length_changed
            && !self.urls_content_changed
    }
}

fn metadata_differs(held: &List, incoming: &List) -> bool {
    held.id != incoming.id
        || held.title != incoming.title
        || held.description != incoming.description
        || held.is_public != incoming.is_public
        || held.collaborators != incoming.collaborators
}

fn content_differs(held: &[UrlItem], incoming: &[UrlItem]) -> bool {
    if id_set(held) != id_set(incoming) {
        return true;
    }
    held.iter().any(|h| {
        incoming
            .iter()
            .find(|i| i.id == h.id)
            .is_some_and(|i| !same_content(h, i))
    })
}

/// Field equality ignoring `position`, which belongs to order.
pub fn same_content(a: &UrlItem, b: &UrlItem) -> bool {
    let a = UrlItem {
        position: 0,
        ..a.clone()
    };
    let b = UrlItem {
        position: 0,
        ..b.clone()
    };
    a == b
}
