//! WebSocket realtime manager with reconnect backoff.

use crate::api_client::WsClient;
use crate::error::{ClientError, ClientResult};
use crate::events::ClientEvent;
use futures_util::StreamExt;
use linkdeck_api::WsFrame;
use linkdeck_core::ChangeEvent;
use linkdeck_events::Notification;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Keep a change stream open for `list_key`, forwarding frames to `sender`
/// and reconnecting with jittered exponential backoff. Stops when the
/// receiver is dropped.
pub fn spawn_ws_manager(
    ws: WsClient,
    list_key: String,
    sender: mpsc::Sender<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = ws.reconnect_config().initial_ms;
        loop {
            match ws.connect(&list_key).await {
                Ok(mut stream) => {
                    debug!(list_key = %list_key, "Change stream connected");
                    backoff = ws.reconnect_config().initial_ms;

                    while let Some(message) = stream.next().await {
                        let event = match message {
                            Ok(Message::Text(text)) => match decode_frame(&text) {
                                Ok(frame) => ClientEvent::Ws(Box::new(frame)),
                                Err(err) => {
                                    warn!(list_key = %list_key, error = %err, "Dropped change stream frame");
                                    ClientEvent::Error(format!("WS decode error: {}", err))
                                }
                            },
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(err) => {
                                warn!(list_key = %list_key, error = %err, "Change stream error");
                                break;
                            }
                        };
                        if sender.send(event).await.is_err() {
                            return;
                        }
                    }

                    let closed = ClientEvent::Disconnected {
                        reason: "connection closed".to_string(),
                    };
                    if sender.send(closed).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    warn!(list_key = %list_key, error = %err, "Change stream connect failed");
                    if sender.send(ClientEvent::Error(err.to_string())).await.is_err() {
                        return;
                    }
                }
            }

            let delay = jittered_backoff(backoff, ws.reconnect_config().jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * ws.reconnect_config().multiplier) as u64;
            backoff = next.min(ws.reconnect_config().max_ms);
        }
    })
}

/// Decode a server frame. Change events are checked for internal
/// consistency here, since the store branches on their category.
pub fn decode_frame(text: &str) -> ClientResult<WsFrame> {
    let frame: WsFrame = serde_json::from_str(text)?;
    if let WsFrame::Notification {
        notification: Notification::Change(event),
        ..
    } = &frame
    {
        check_event(event)?;
    }
    Ok(frame)
}

pub(crate) fn check_event(event: &ChangeEvent) -> ClientResult<()> {
    event
        .validate()
        .map_err(|e| ClientError::InvalidResponse(format!("Invalid change event: {}", e)))
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}
