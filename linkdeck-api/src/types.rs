//! API Request and Response Types
//!
//! Request bodies mostly reuse the domain inputs from `linkdeck_core`
//! (`NewUrl`, `UrlPatch`, `ReorderInput`, `ListPatch`). The types here wrap
//! results with cache provenance and enrichment status. They are shared
//! with the client crate.

use std::collections::HashMap;

use linkdeck_core::{ChangeEvent, List, ListId, PageMetadata, Role, Timestamp, UrlItem};
use linkdeck_storage::{CacheRead, ListBundle};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::gateway::GatewayOutcome;
use crate::suggestions::Suggestions;

// ============================================================================
// READ RESPONSES
// ============================================================================

/// A list's URLs in canonical order with resolved metadata keyed by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UrlListResponse {
    #[schema(value_type = String, format = "uuid")]
    pub list_id: ListId,
    pub urls: Vec<UrlItem>,
    pub metadata: HashMap<String, PageMetadata>,
    /// Whether the bundle came from the cache.
    pub cached: bool,
    #[schema(value_type = String, format = "date-time")]
    pub cached_at: Timestamp,
    /// When the bundle's metadata was resolved.
    #[schema(value_type = String, format = "date-time")]
    pub fetched_at: Timestamp,
}

impl UrlListResponse {
    pub fn from_read(list_id: ListId, read: CacheRead<ListBundle>) -> Self {
        let cached = read.was_cache_hit();
        let cached_at = read.cached_at();
        let bundle = read.into_value();
        Self {
            list_id,
            urls: bundle.urls,
            metadata: bundle.metadata,
            cached,
            cached_at,
            fetched_at: bundle.fetched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Suggestions,
    pub cached: bool,
    #[schema(value_type = String, format = "date-time")]
    pub cached_at: Timestamp,
}

impl From<CacheRead<Suggestions>> for SuggestionsResponse {
    fn from(read: CacheRead<Suggestions>) -> Self {
        let cached = read.was_cache_hit();
        let cached_at = read.cached_at();
        Self {
            suggestions: read.into_value(),
            cached,
            cached_at,
        }
    }
}

// ============================================================================
// MUTATION TYPES
// ============================================================================

/// Result of any mutation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse {
    /// The list as persisted after the mutation.
    pub list: List,
    /// The published change event.
    pub event: ChangeEvent,
    /// The affected item, for URL-level operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<UrlItem>,
    /// Metadata used to fill the item. A fallback when enrichment was slow
    /// or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    /// True when a slower fetch is still running and will publish a
    /// `url_enriched` event if it improves the item.
    #[serde(default)]
    pub enrichment_pending: bool,
}

impl From<GatewayOutcome> for MutationResponse {
    fn from(outcome: GatewayOutcome) -> Self {
        let enrichment_pending = outcome.enrichment_pending();
        Self {
            list: outcome.list,
            event: outcome.event,
            url: outcome.url,
            metadata: outcome.metadata,
            enrichment_pending,
        }
    }
}

/// Request to set a collaborator's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CollaboratorRoleRequest {
    pub role: Role,
}
