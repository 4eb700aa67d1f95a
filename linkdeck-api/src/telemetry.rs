//! Tracing subscriber setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str =
    "linkdeck_api=debug,linkdeck_enrich=info,linkdeck_events=info,tower_http=debug,info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Call once at startup; a second call fails.
pub fn init_tracing(config: &ApiConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(json_logs = config.json_logs, "Tracing initialized");
    Ok(())
}
