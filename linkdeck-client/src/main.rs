//! Linkdeck watch: follows one list and logs every reconciled change.

use linkdeck_client::api_client::{RestClient, WsClient};
use linkdeck_client::config::ClientConfig;
use linkdeck_client::error::ClientError;
use linkdeck_client::events::ClientEvent;
use linkdeck_client::realtime::spawn_ws_manager;
use linkdeck_client::session::SessionContext;
use linkdeck_client::store::ReconciliationStore;
use linkdeck_core::Actor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::load()?;
    let session = SessionContext::new(Actor::new(config.actor_id));
    let mut rest = RestClient::new(&config)?;
    if let Some(session_id) = session.session_id() {
        rest = rest.with_session(session_id)?;
    }
    let ws = WsClient::new(&config)?;

    let mut store = ReconciliationStore::new(Arc::new(rest), session, config.list_key.clone());

    let list = store.load().await?;
    info!(list_id = %list.id, title = %list.title, urls = list.urls.len(), "Loaded list");

    let (event_tx, mut event_rx) = mpsc::channel::<ClientEvent>(256);
    let ws_task = spawn_ws_manager(ws, config.list_key.clone(), event_tx);
    let mut ticker = tokio::time::interval(config.refresh_interval());

    loop {
        let event = tokio::select! {
            _ = ticker.tick() => ClientEvent::Tick,
            Some(event) = event_rx.recv() => event,
            _ = tokio::signal::ctrl_c() => break,
        };

        let result = match &event {
            ClientEvent::Ws(frame) => store.handle_frame(frame).await,
            ClientEvent::Tick => store.refetch().await.map(Some),
            ClientEvent::Disconnected { reason } => {
                warn!(reason = %reason, "Change stream disconnected");
                Ok(None)
            }
            ClientEvent::Error(message) => {
                warn!(error = %message, "Change stream error");
                Ok(None)
            }
        };

        match result {
            Ok(Some(decision)) if decision.needs_render() => {
                if let Some(list) = store.snapshot() {
                    info!(decision = %decision, urls = list.urls.len(), "List changed");
                    for url in &list.urls {
                        info!(
                            position = url.position,
                            url = %url.url,
                            title = url.title.as_deref().unwrap_or("-"),
                            "  item"
                        );
                    }
                }
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Sync step failed"),
        }
    }

    ws_task.abort();
    store.into_session().end();
    info!("Stopped");
    Ok(())
}
