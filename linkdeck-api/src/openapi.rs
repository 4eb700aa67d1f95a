//! OpenAPI Specification for the Linkdeck API
//!
//! Generated with utoipa from the route annotations and schema derives.
//! Served at `/openapi.json`.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, lists};
use crate::suggestions::{DuplicateGroup, Suggestions};
use crate::types::{CollaboratorRoleRequest, MutationResponse, SuggestionsResponse, UrlListResponse};

use linkdeck_core::{
    ActivityRecord, ChangeCategory, ChangeEvent, ChangeKind, Collaborator, EventPriority,
    HealthCheck, HealthStatus as UrlHealthStatus, List, ListPatch, NewUrl, PageMetadata,
    ReorderInput, Role, UrlItem, UrlPatch,
};
use linkdeck_events::Notification;

/// OpenAPI document for the Linkdeck API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Linkdeck API",
        version = "0.4.0",
        description = "Collaborative URL lists with cached reads, metadata enrichment and real-time change streams",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "Linkdeck", url = "https://linkdeck.dev")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Lists", description = "List reads, URL mutations and collaborator roles"),
        (name = "Health", description = "Liveness and readiness")
    ),
    paths(
        lists::get_list,
        lists::list_urls,
        lists::get_suggestions,
        lists::add_url,
        lists::update_url,
        lists::delete_url,
        lists::reorder_urls,
        lists::archive_url,
        lists::restore_url,
        lists::update_list,
        lists::update_collaborator_role,
        health::ping,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        List,
        UrlItem,
        Collaborator,
        Role,
        UrlHealthStatus,
        HealthCheck,
        PageMetadata,
        NewUrl,
        UrlPatch,
        ReorderInput,
        ListPatch,
        ChangeEvent,
        ChangeKind,
        ChangeCategory,
        EventPriority,
        ActivityRecord,
        Notification,
        UrlListResponse,
        MutationResponse,
        CollaboratorRoleRequest,
        Suggestions,
        DuplicateGroup,
        SuggestionsResponse,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::CacheHealth,
    ))
)]
pub struct ApiDoc;
