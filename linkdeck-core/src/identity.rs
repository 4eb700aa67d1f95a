//! Identity types for Linkdeck entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Stable identity of a list. Lists also carry a human-readable slug.
pub type ListId = Uuid;

/// Identity of a URL item, assigned once at creation and never changed.
pub type UrlId = Uuid;

/// Identity of a user (owner, collaborator or anonymous viewer).
pub type UserId = Uuid;

/// Identity of one signed-in client session of a user.
pub type SessionId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
