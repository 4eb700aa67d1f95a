//! Change events emitted after every successful list mutation.
//!
//! `ChangeKind` is a closed tagged union: the `action` tag plus the payload
//! that action carries. Consumers branch on [`ChangeCategory`], which is
//! derived from the kind once when the event is built and re-checked when an
//! event crosses a serialization boundary.

use crate::{
    new_entity_id, Actor, EntityId, ListId, Role, SessionId, Timestamp, UrlId, UserId,
    ValidationError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CATEGORY & PRIORITY
// ============================================================================

/// What part of a list a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    /// The set of URL ids changed.
    Membership,
    /// Fields of an existing URL or of the list itself changed.
    Content,
    /// Only the order of URLs changed.
    Order,
    /// Collaborators or roles changed.
    Permission,
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeCategory::Membership => "membership",
            ChangeCategory::Content => "content",
            ChangeCategory::Order => "order",
            ChangeCategory::Permission => "permission",
        };
        write!(f, "{}", s)
    }
}

/// Delivery hint for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    #[default]
    Normal,
    /// Background results (enrichment) that never need an immediate resync.
    Low,
}

// ============================================================================
// CHANGE KIND
// ============================================================================

/// The mutation an event reports, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeKind {
    UrlAdded {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        url_count: usize,
    },
    UrlUpdated {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
    },
    UrlFavorited {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        is_favorite: bool,
    },
    UrlPinned {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        is_pinned: bool,
    },
    UrlDeleted {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        url_count: usize,
    },
    UrlReordered {
        url_count: usize,
    },
    UrlArchived {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        url_count: usize,
    },
    UrlRestored {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
        url_count: usize,
    },
    /// Background enrichment filled in metadata for a URL.
    UrlEnriched {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        url_id: UrlId,
    },
    CollaboratorRoleUpdated {
        #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
        user_id: UserId,
        role: Role,
    },
    ListUpdated,
}

impl ChangeKind {
    pub fn category(&self) -> ChangeCategory {
        match self {
            ChangeKind::UrlAdded { .. }
            | ChangeKind::UrlDeleted { .. }
            | ChangeKind::UrlArchived { .. }
            | ChangeKind::UrlRestored { .. } => ChangeCategory::Membership,
            ChangeKind::UrlUpdated { .. }
            | ChangeKind::UrlFavorited { .. }
            | ChangeKind::UrlPinned { .. }
            | ChangeKind::UrlEnriched { .. }
            | ChangeKind::ListUpdated => ChangeCategory::Content,
            ChangeKind::UrlReordered { .. } => ChangeCategory::Order,
            ChangeKind::CollaboratorRoleUpdated { .. } => ChangeCategory::Permission,
        }
    }

    /// Wire name of the `action` tag.
    pub fn action_name(&self) -> &'static str {
        match self {
            ChangeKind::UrlAdded { .. } => "url_added",
            ChangeKind::UrlUpdated { .. } => "url_updated",
            ChangeKind::UrlFavorited { .. } => "url_favorited",
            ChangeKind::UrlPinned { .. } => "url_pinned",
            ChangeKind::UrlDeleted { .. } => "url_deleted",
            ChangeKind::UrlReordered { .. } => "url_reordered",
            ChangeKind::UrlArchived { .. } => "url_archived",
            ChangeKind::UrlRestored { .. } => "url_restored",
            ChangeKind::UrlEnriched { .. } => "url_enriched",
            ChangeKind::CollaboratorRoleUpdated { .. } => "collaborator_role_updated",
            ChangeKind::ListUpdated => "list_updated",
        }
    }

    /// The URL this change targets, if it targets one.
    pub fn url_id(&self) -> Option<UrlId> {
        match self {
            ChangeKind::UrlAdded { url_id, .. }
            | ChangeKind::UrlUpdated { url_id }
            | ChangeKind::UrlFavorited { url_id, .. }
            | ChangeKind::UrlPinned { url_id, .. }
            | ChangeKind::UrlDeleted { url_id, .. }
            | ChangeKind::UrlArchived { url_id, .. }
            | ChangeKind::UrlRestored { url_id, .. }
            | ChangeKind::UrlEnriched { url_id } => Some(*url_id),
            ChangeKind::UrlReordered { .. }
            | ChangeKind::CollaboratorRoleUpdated { .. }
            | ChangeKind::ListUpdated => None,
        }
    }
}

// ============================================================================
// ACTIVITY RECORD
// ============================================================================

/// Audit entry describing who did what to a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityRecord {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub list_id: ListId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub actor_id: UserId,
    /// Client session that issued the change, when known.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub action: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub url_id: Option<UrlId>,
    pub detail: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl ActivityRecord {
    pub fn for_change(list_id: ListId, actor_id: UserId, change: &ChangeKind) -> Self {
        Self {
            id: new_entity_id(),
            list_id,
            actor_id,
            session_id: None,
            action: change.action_name().to_string(),
            url_id: change.url_id(),
            detail: None,
            created_at: Utc::now(),
        }
    }

    /// Record made on behalf of `actor`, carrying its session.
    pub fn by_actor(list_id: ListId, actor: &Actor, change: &ChangeKind) -> Self {
        Self {
            session_id: actor.session_id,
            ..Self::for_change(list_id, actor.user_id, change)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ============================================================================
// CHANGE EVENT
// ============================================================================

/// A published change to one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChangeEvent {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub event_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub list_id: ListId,
    #[serde(flatten)]
    pub change: ChangeKind,
    pub category: ChangeCategory,
    #[serde(default)]
    pub priority: EventPriority,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub timestamp: Timestamp,
    pub activity: Option<ActivityRecord>,
}

impl ChangeEvent {
    pub fn new(list_id: ListId, change: ChangeKind) -> Self {
        let category = change.category();
        Self {
            event_id: new_entity_id(),
            list_id,
            change,
            category,
            priority: EventPriority::Normal,
            timestamp: Utc::now(),
            activity: None,
        }
    }

    pub fn low_priority(mut self) -> Self {
        self.priority = EventPriority::Low;
        self
    }

    pub fn with_activity(mut self, activity: ActivityRecord) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn action_name(&self) -> &'static str {
        self.change.action_name()
    }

    /// Check that the event is internally consistent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.list_id.is_nil() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "list_id".to_string(),
            });
        }
        if self.category != self.change.category() {
            return Err(ValidationError::ConstraintViolation {
                constraint: "category_matches_action".to_string(),
                reason: format!(
                    "action {} belongs to {}, event says {}",
                    self.change.action_name(),
                    self.change.category(),
                    self.category
                ),
            });
        }
        if let Some(activity) = &self.activity {
            if activity.list_id != self.list_id {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "activity_list_matches".to_string(),
                    reason: "activity record belongs to another list".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Decode and validate an event received from a transport.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        let event: ChangeEvent =
            serde_json::from_value(value).map_err(|e| ValidationError::InvalidValue {
                field: "change_event".to_string(),
                reason: e.to_string(),
            })?;
        event.validate()?;
        Ok(event)
    }
}
