//! Linkdeck API Server Entry Point
//!
//! Bootstraps configuration and tracing, wires the in-process list store,
//! cache tier, enrichment pipeline and notifier, and starts the Axum HTTP
//! server.

use std::sync::Arc;

use axum::Router;
use linkdeck_api::{create_api_router, telemetry::init_tracing, ApiConfig, ApiError, ApiResult, AppState};
use linkdeck_core::{RolePermissions, SyncConfig};
use linkdeck_enrich::{EnrichmentPipeline, HtmlMetadataFetcher, OpenAIEnhancer};
use linkdeck_events::BroadcastNotifier;
use linkdeck_storage::{spawn_cleanup_task, InMemoryCacheBackend, InMemoryListStore, SafeCache};

const CACHE_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> ApiResult<()> {
    let api_config = ApiConfig::from_env()?;
    init_tracing(&api_config)?;

    let sync_config = SyncConfig::from_env();
    sync_config
        .validate()
        .map_err(|e| ApiError::internal_error(format!("Invalid sync configuration: {}", e)))?;

    let store = Arc::new(InMemoryListStore::new());
    let backend = Arc::new(InMemoryCacheBackend::new());
    let _sweeper = spawn_cleanup_task(backend.clone(), CACHE_SWEEP_INTERVAL);
    let cache = SafeCache::new(backend);

    let fetcher = HtmlMetadataFetcher::new(sync_config.fetch_timeout).map_err(|e| {
        ApiError::internal_error(format!("Failed to build metadata fetcher: {}", e))
    })?;
    let mut enrichment = EnrichmentPipeline::new(Arc::new(fetcher), cache.clone(), &sync_config);
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        tracing::info!("AI enhancement enabled");
        enrichment = enrichment.with_enhancer(Arc::new(OpenAIEnhancer::with_default_model(key)));
    }

    let notifier = Arc::new(BroadcastNotifier::new(api_config.broadcast_capacity));

    let state = AppState::new(
        store,
        cache,
        enrichment,
        notifier,
        Arc::new(RolePermissions),
        sync_config,
    );
    let app: Router = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Linkdeck API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
