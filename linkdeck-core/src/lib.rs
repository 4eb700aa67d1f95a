//! Linkdeck Core - Entity Types
//!
//! Data structures shared by every Linkdeck crate: lists and their URL
//! items, change events, capabilities, ordering helpers and the error
//! taxonomy. Nothing in here performs I/O.

pub mod capability;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod event;
pub mod health;
pub mod identity;
pub mod metadata;
pub mod operation;
pub mod order;

pub use capability::{Actor, Capability, PermissionEvaluator, RolePermissions};
pub use config::SyncConfig;
pub use entities::{Collaborator, List, UrlItem, UrlPatch};
pub use enums::{EntityType, Role};
pub use error::{
    CacheError, ConfigError, EnrichmentError, ErrorKind, LinkdeckError, LinkdeckResult,
    NotificationError, StorageError, ValidationError,
};
pub use event::{ActivityRecord, ChangeCategory, ChangeEvent, ChangeKind, EventPriority};
pub use health::{HealthCheck, HealthStatus};
pub use identity::{new_entity_id, EntityId, ListId, SessionId, Timestamp, UrlId, UserId};
pub use metadata::PageMetadata;
pub use operation::{
    apply_operation, fill_item_metadata, AppliedChange, ListPatch, NewUrl, ReorderInput,
    UrlOperation,
};
pub use order::{
    id_sequence, id_set, next_position, reassign_positions, same_id_set, sort_by_position,
};
