//! Linkdeck API - Mutation Gateway, HTTP and WebSocket Layer
//!
//! Every list mutation runs through [`MutationGateway`]: capability check,
//! validation, bounded metadata enrichment, persisted write, cache
//! invalidation and change publication. Reads go through [`ListReader`],
//! which serves cached bundles only while their id set matches the
//! persisted list. Real-time changes are streamed per list over WebSocket.

pub mod background;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod macros;
pub mod openapi;
pub mod reader;
pub mod routes;
pub mod state;
pub mod suggestions;
pub mod telemetry;
pub mod types;
pub mod ws;

// Re-export commonly used types
pub use background::{BackgroundEnricher, CompletionOutcome, EnrichmentJob};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::{RequestActor, ACTOR_HEADER, SESSION_HEADER};
pub use gateway::{authorize, GatewayOutcome, MutationGateway};
pub use openapi::ApiDoc;
pub use reader::ListReader;
pub use routes::create_api_router;
pub use state::AppState;
pub use suggestions::{find_duplicates, DuplicateGroup, Suggestions};
pub use types::*;
pub use ws::WsFrame;
