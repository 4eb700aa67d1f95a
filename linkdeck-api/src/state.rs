//! Shared application state for Axum routers.

use std::sync::Arc;

use linkdeck_core::{PermissionEvaluator, SyncConfig};
use linkdeck_enrich::EnrichmentPipeline;
use linkdeck_events::BroadcastNotifier;
use linkdeck_storage::{ListStore, SafeCache};

use crate::gateway::MutationGateway;
use crate::impl_from_ref;
use crate::reader::ListReader;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Every mutation goes through here.
    pub gateway: Arc<MutationGateway>,
    /// Cache-backed read paths.
    pub reader: Arc<ListReader>,
    /// In-process fan-out; also the source for WebSocket subscriptions.
    pub notifier: Arc<BroadcastNotifier>,
    pub cache: SafeCache,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ListStore>,
        cache: SafeCache,
        enrichment: EnrichmentPipeline,
        notifier: Arc<BroadcastNotifier>,
        permissions: Arc<dyn PermissionEvaluator>,
        config: SyncConfig,
    ) -> Self {
        let gateway = MutationGateway::new(
            store.clone(),
            cache.clone(),
            notifier.clone(),
            permissions.clone(),
            enrichment.clone(),
            config.clone(),
        );
        let reader = ListReader::new(store, cache.clone(), enrichment, permissions, config);
        Self {
            gateway: Arc::new(gateway),
            reader: Arc::new(reader),
            notifier,
            cache,
        }
    }
}

impl_from_ref!(Arc<MutationGateway>, gateway);
impl_from_ref!(Arc<ListReader>, reader);
impl_from_ref!(Arc<BroadcastNotifier>, notifier);
impl_from_ref!(SafeCache, cache);
