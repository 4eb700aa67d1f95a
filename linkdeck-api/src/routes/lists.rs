//! List REST API Routes
//!
//! Reads go through [`ListReader`]; every mutation goes through
//! [`MutationGateway`]. The `{key}` path segment is a list id or slug.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use linkdeck_core::{List, ListPatch, NewUrl, ReorderInput, UrlPatch};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extractors::RequestActor,
    gateway::MutationGateway,
    reader::ListReader,
    state::AppState,
    types::{CollaboratorRoleRequest, MutationResponse, SuggestionsResponse, UrlListResponse},
    ws,
};

// ============================================================================
// READ HANDLERS
// ============================================================================

/// GET /api/v1/lists/{key} - Fetch a list record
#[utoipa::path(
    get,
    path = "/api/v1/lists/{key}",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    responses(
        (status = 200, description = "List record", body = List),
        (status = 401, description = "Missing actor", body = ApiError),
        (status = 403, description = "No view access", body = ApiError),
        (status = 404, description = "List not found", body = ApiError),
    )
)]
pub async fn get_list(
    State(reader): State<Arc<ListReader>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
) -> ApiResult<Json<List>> {
    let list = reader.get_list(&key, &actor).await?;
    Ok(Json(list))
}

/// GET /api/v1/lists/{key}/urls - URLs with resolved metadata
#[utoipa::path(
    get,
    path = "/api/v1/lists/{key}/urls",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    responses(
        (status = 200, description = "URLs in canonical order with metadata", body = UrlListResponse),
        (status = 403, description = "No view access", body = ApiError),
        (status = 404, description = "List not found", body = ApiError),
    )
)]
pub async fn list_urls(
    State(reader): State<Arc<ListReader>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
) -> ApiResult<Json<UrlListResponse>> {
    let list = reader.get_list(&key, &actor).await?;
    let read = reader.bundle_for(&list).await;
    Ok(Json(UrlListResponse::from_read(list.id, read)))
}

/// GET /api/v1/lists/{key}/suggestions - Duplicate suggestions
#[utoipa::path(
    get,
    path = "/api/v1/lists/{key}/suggestions",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    responses(
        (status = 200, description = "Cached or freshly computed suggestions", body = SuggestionsResponse),
        (status = 403, description = "No view access", body = ApiError),
        (status = 404, description = "List not found", body = ApiError),
    )
)]
pub async fn get_suggestions(
    State(reader): State<Arc<ListReader>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let list = reader.get_list(&key, &actor).await?;
    Ok(Json(reader.suggestions_for(&list).await.into()))
}

// ============================================================================
// MUTATION HANDLERS
// ============================================================================

/// POST /api/v1/lists/{key}/urls - Add a URL
#[utoipa::path(
    post,
    path = "/api/v1/lists/{key}/urls",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    request_body = NewUrl,
    responses(
        (status = 201, description = "URL added", body = MutationResponse),
        (status = 400, description = "Invalid URL", body = ApiError),
        (status = 403, description = "No edit access", body = ApiError),
        (status = 404, description = "List not found", body = ApiError),
    )
)]
pub async fn add_url(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
    Json(new_url): Json<NewUrl>,
) -> ApiResult<impl IntoResponse> {
    let outcome = gateway.add_url(&key, new_url, actor).await?;
    Ok((StatusCode::CREATED, Json(MutationResponse::from(outcome))))
}

/// PATCH /api/v1/lists/{key}/urls/{url_id} - Update a URL
#[utoipa::path(
    patch,
    path = "/api/v1/lists/{key}/urls/{url_id}",
    tag = "Lists",
    params(
        ("key" = String, Path, description = "List id or slug"),
        ("url_id" = String, Path, description = "URL item id"),
    ),
    request_body = UrlPatch,
    responses(
        (status = 200, description = "URL updated", body = MutationResponse),
        (status = 400, description = "Empty or invalid patch", body = ApiError),
        (status = 403, description = "No edit access", body = ApiError),
        (status = 404, description = "List or URL not found", body = ApiError),
    )
)]
pub async fn update_url(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path((key, url_id)): Path<(String, Uuid)>,
    Json(patch): Json<UrlPatch>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.update_url(&key, url_id, patch, actor).await?;
    Ok(Json(outcome.into()))
}

/// DELETE /api/v1/lists/{key}/urls/{url_id} - Delete a URL
#[utoipa::path(
    delete,
    path = "/api/v1/lists/{key}/urls/{url_id}",
    tag = "Lists",
    params(
        ("key" = String, Path, description = "List id or slug"),
        ("url_id" = String, Path, description = "URL item id"),
    ),
    responses(
        (status = 200, description = "URL deleted", body = MutationResponse),
        (status = 403, description = "No edit access", body = ApiError),
        (status = 404, description = "List or URL not found", body = ApiError),
    )
)]
pub async fn delete_url(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path((key, url_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.delete_url(&key, url_id, actor).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/lists/{key}/urls/reorder - Reorder all active URLs
#[utoipa::path(
    post,
    path = "/api/v1/lists/{key}/urls/reorder",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    request_body = ReorderInput,
    responses(
        (status = 200, description = "URLs reordered", body = MutationResponse),
        (status = 400, description = "Id set does not match the list", body = ApiError),
        (status = 403, description = "No edit access", body = ApiError),
    )
)]
pub async fn reorder_urls(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
    Json(input): Json<ReorderInput>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.reorder_urls(&key, input, actor).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/lists/{key}/urls/{url_id}/archive - Archive a URL
#[utoipa::path(
    post,
    path = "/api/v1/lists/{key}/urls/{url_id}/archive",
    tag = "Lists",
    params(
        ("key" = String, Path, description = "List id or slug"),
        ("url_id" = String, Path, description = "URL item id"),
    ),
    responses(
        (status = 200, description = "URL archived", body = MutationResponse),
        (status = 403, description = "No edit access", body = ApiError),
        (status = 404, description = "List or URL not found", body = ApiError),
    )
)]
pub async fn archive_url(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path((key, url_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.archive_url(&key, url_id, actor).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/v1/lists/{key}/urls/{url_id}/restore - Restore an archived URL
#[utoipa::path(
    post,
    path = "/api/v1/lists/{key}/urls/{url_id}/restore",
    tag = "Lists",
    params(
        ("key" = String, Path, description = "List id or slug"),
        ("url_id" = String, Path, description = "Archived URL item id"),
    ),
    responses(
        (status = 200, description = "URL restored to the end of the list", body = MutationResponse),
        (status = 403, description = "No edit access", body = ApiError),
        (status = 404, description = "List or archived URL not found", body = ApiError),
    )
)]
pub async fn restore_url(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path((key, url_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.restore_url(&key, url_id, actor).await?;
    Ok(Json(outcome.into()))
}

/// PATCH /api/v1/lists/{key} - Update list fields
#[utoipa::path(
    patch,
    path = "/api/v1/lists/{key}",
    tag = "Lists",
    params(("key" = String, Path, description = "List id or slug")),
    request_body = ListPatch,
    responses(
        (status = 200, description = "List updated", body = MutationResponse),
        (status = 400, description = "Empty patch", body = ApiError),
        (status = 403, description = "No edit access", body = ApiError),
    )
)]
pub async fn update_list(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
    Json(patch): Json<ListPatch>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway.update_list(&key, patch, actor).await?;
    Ok(Json(outcome.into()))
}

/// PUT /api/v1/lists/{key}/collaborators/{user_id} - Set a collaborator's role
#[utoipa::path(
    put,
    path = "/api/v1/lists/{key}/collaborators/{user_id}",
    tag = "Lists",
    params(
        ("key" = String, Path, description = "List id or slug"),
        ("user_id" = String, Path, description = "Collaborator user id"),
    ),
    request_body = CollaboratorRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = MutationResponse),
        (status = 400, description = "Owner role cannot be granted or changed", body = ApiError),
        (status = 403, description = "No manage access", body = ApiError),
    )
)]
pub async fn update_collaborator_role(
    State(gateway): State<Arc<MutationGateway>>,
    RequestActor(actor): RequestActor,
    Path((key, user_id)): Path<(String, Uuid)>,
    Json(req): Json<CollaboratorRoleRequest>,
) -> ApiResult<Json<MutationResponse>> {
    let outcome = gateway
        .update_collaborator_role(&key, user_id, req.role, actor)
        .await?;
    Ok(Json(outcome.into()))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/:key", get(get_list).patch(update_list))
        .route("/:key/urls", get(list_urls).post(add_url))
        .route("/:key/urls/reorder", post(reorder_urls))
        .route("/:key/urls/:url_id", patch(update_url).delete(delete_url))
        .route("/:key/urls/:url_id/archive", post(archive_url))
        .route("/:key/urls/:url_id/restore", post(restore_url))
        .route("/:key/collaborators/:user_id", put(update_collaborator_role))
        .route("/:key/suggestions", get(get_suggestions))
        .route("/:key/ws", get(ws::ws_handler))
        .with_state(state)
}
