//! Drag-Order Shadow Cache
//!
//! Holds the order a user is dragging toward before it is persisted. The
//! reconciliation store consults it so that a background refresh carrying
//! the old order cannot snap the list back mid-gesture.
//!
//! A shadow lives from [`DragOrderShadow::begin`] until it is cleared, either
//! after the reorder is persisted or when a validation finds the server's id
//! set no longer matches. [`DragOrderShadow::end`] only marks the gesture as
//! finished; the shadow keeps protecting the order while the reorder request
//! is in flight.

use std::collections::HashMap;
use std::fmt;

use linkdeck_core::{id_sequence, same_id_set, ListId, UrlId, UrlItem};
use tracing::debug;

/// Outcome of checking a shadow against server URLs, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragReason {
    EmptyList,
    LengthMismatch,
    IdsMismatch,
    Valid,
}

impl DragReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DragReason::EmptyList => "empty_list",
            DragReason::LengthMismatch => "length_mismatch",
            DragReason::IdsMismatch => "ids_mismatch",
            DragReason::Valid => "valid",
        }
    }
}

impl fmt::Display for DragReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragValidation {
    pub valid: bool,
    pub reason: DragReason,
}

impl DragValidation {
    fn from_reason(reason: DragReason) -> Self {
        Self {
            valid: reason == DragReason::Valid,
            reason,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Shadow {
    urls: Vec<UrlItem>,
    active: bool,
}

/// Per-session map of list id to shadowed order.
#[derive(Debug, Clone, Default)]
pub struct DragOrderShadow {
    shadows: HashMap<ListId, Shadow>,
}

impl DragOrderShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a gesture on `list_id` from its current `urls`.
    pub fn begin(&mut self, list_id: ListId, urls: &[UrlItem]) {
        debug!(list_id = %list_id, "Drag began");
        self.shadows.insert(
            list_id,
            Shadow {
                urls: urls.to_vec(),
                active: true,
            },
        );
    }

    /// Record the order the gesture currently shows. Ignored when no drag
    /// was begun for the list.
    pub fn update(&mut self, list_id: ListId, urls: Vec<UrlItem>) {
        match self.shadows.get_mut(&list_id) {
            Some(shadow) => shadow.urls = urls,
            None => debug!(list_id = %list_id, "Drag update without begin ignored"),
        }
    }

    /// The pointer was released. The shadow stays until cleared.
    pub fn end(&mut self, list_id: ListId) {
        if let Some(shadow) = self.shadows.get_mut(&list_id) {
            shadow.active = false;
        }
    }

    pub fn clear(&mut self, list_id: ListId) {
        if self.shadows.remove(&list_id).is_some() {
            debug!(list_id = %list_id, "Drag shadow cleared");
        }
    }

    pub fn clear_all(&mut self) {
        self.shadows.clear();
    }

    /// Whether the pointer is still down on this list.
    pub fn is_active(&self, list_id: ListId) -> bool {
        self.shadows.get(&list_id).is_some_and(|s| s.active)
    }

    /// Whether a shadow exists, active or awaiting persist.
    pub fn has_shadow(&self, list_id: ListId) -> bool {
        self.shadows.contains_key(&list_id)
    }

    pub fn shadow_urls(&self, list_id: ListId) -> Option<&[UrlItem]> {
        self.shadows.get(&list_id).map(|s| s.urls.as_slice())
    }

    pub fn shadow_ids(&self, list_id: ListId) -> Option<Vec<UrlId>> {
        self.shadow_urls(list_id).map(id_sequence)
    }

    /// Check the shadow against the server's URLs. Returns `None` when there
    /// is no shadow for the list. Any invalid result clears the shadow.
    pub fn validate(&mut self, list_id: ListId, server_urls: &[UrlItem]) -> Option<DragValidation> {
        let shadow = self.shadows.get(&list_id)?;

        let reason = if server_urls.is_empty() {
            DragReason::EmptyList
        } else if server_urls.len() != shadow.urls.len() {
            DragReason::LengthMismatch
        } else if !same_id_set(server_urls, &shadow.urls) {
            DragReason::IdsMismatch
        } else {
            DragReason::Valid
        };

        let validation = DragValidation::from_reason(reason);
        if !validation.valid {
            debug!(list_id = %list_id, reason = %reason, "Drag shadow invalidated");
            self.shadows.remove(&list_id);
        }
        Some(validation)
    }
}
