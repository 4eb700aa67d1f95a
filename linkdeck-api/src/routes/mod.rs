//! REST API Routes Module
//!
//! Includes:
//! - List reads and mutations under /api/v1/lists
//! - Per-list WebSocket change stream under /api/v1/lists/{key}/ws
//! - Health check endpoints
//! - CORS support for browser-based clients

pub mod health;
pub mod lists;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::extractors::ACTOR_HEADER;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub use health::create_router as health_router;
pub use lists::create_router as lists_router;

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Build the full application router.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let api_routes = Router::new().nest("/lists", lists::create_router(state.clone()));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health::create_router(state.cache.clone()))
        .route("/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(api_config)),
        )
}

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(ACTOR_HEADER),
        ]);

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter(|o| !o.starts_with("*."))
            .filter_map(|o| o.parse().ok())
            .collect();
        if origins.len() == config.cors_origins.len() {
            cors.allow_origin(origins)
        } else {
            // Wildcard subdomains need a predicate.
            let config = config.clone();
            cors.allow_origin(tower_http::cors::AllowOrigin::predicate(
                move |origin: &HeaderValue, _| {
                    origin
                        .to_str()
                        .map(|o| config.is_origin_allowed(o))
                        .unwrap_or(false)
                },
            ))
        }
    }
}
