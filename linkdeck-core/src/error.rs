//! Error types for Linkdeck operations
//!
//! Permission denied, not found and validation errors surface to callers
//! and are never retried; so does a failed persisted write. Cache,
//! enrichment and notification failures are swallowed at the component that produced them and only
//! logged; they exist here so the components can report them uniformly.

use crate::{Capability, EntityType, ListId, UserId};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Write failed for {entity_type}: {reason}")]
    WriteFailed { entity_type: EntityType, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Cache tier errors. Callers degrade these to a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache payload for {key} could not be (de)serialized: {reason}")]
    Serialization { key: String, reason: String },
}

/// Enrichment errors. Callers degrade these to fallback metadata.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Fetch of {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Fetch of {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
}

/// Notification errors. Publishers log these and move on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Delivery to channel {channel} failed: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Rejected malformed change event: {reason}")]
    InvalidEvent { reason: String },
}

/// Coarse classification used to decide what a caller gets to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Validation,
    CacheUnavailable,
    EnrichmentFailure,
    NotificationDeliveryFailure,
    Internal,
}

impl ErrorKind {
    /// Whether this kind is surfaced to the end user. Internal covers a
    /// failed persisted-store write, the only non-domain failure that must
    /// reach the caller.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ErrorKind::PermissionDenied
                | ErrorKind::NotFound
                | ErrorKind::Validation
                | ErrorKind::Internal
        )
    }
}

/// Master error type for all Linkdeck errors.
#[derive(Debug, Clone, Error)]
pub enum LinkdeckError {
    #[error("Permission denied: user {actor} lacks {capability} on list {list_id}")]
    PermissionDenied {
        actor: UserId,
        capability: Capability,
        list_id: ListId,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl LinkdeckError {
    pub fn not_found(entity_type: EntityType, id: impl std::fmt::Display) -> Self {
        LinkdeckError::Storage(StorageError::NotFound {
            entity_type,
            id: id.to_string(),
        })
    }

    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LinkdeckError::Validation(ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        LinkdeckError::Validation(ValidationError::RequiredFieldMissing {
            field: field.into(),
        })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkdeckError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            LinkdeckError::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            LinkdeckError::Storage(_) => ErrorKind::Internal,
            LinkdeckError::Validation(_) => ErrorKind::Validation,
            LinkdeckError::Config(_) => ErrorKind::Internal,
            LinkdeckError::Cache(_) => ErrorKind::CacheUnavailable,
            LinkdeckError::Enrichment(_) => ErrorKind::EnrichmentFailure,
            LinkdeckError::Notification(_) => ErrorKind::NotificationDeliveryFailure,
        }
    }
}

/// Result type alias for Linkdeck operations.
pub type LinkdeckResult<T> = Result<T, LinkdeckError>;

// =============================================================================
// TESTS
// =============================================================================
