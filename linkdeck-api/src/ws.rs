//! WebSocket Change Streaming
//!
//! A client opens `/api/v1/lists/{key}/ws` and receives every notification
//! published on the list's two channels, `list:{id}` and
//! `list-activity:{id}`, as JSON [`WsFrame`]s.
//!
//! ## Protocol
//!
//! 1. Client connects with the `X-Actor-Id` header
//! 2. Server checks View access and upgrades
//! 3. Server sends `connected` with the subscribed channel names
//! 4. Server streams `notification` frames; a slow client gets `lagged`
//!    with the number of skipped messages and should refetch
//! 5. On close the server sends `disconnected`

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use linkdeck_core::ListId;
use linkdeck_events::{BroadcastNotifier, Channel, Notification};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

use crate::error::ApiResult;
use crate::extractors::RequestActor;
use crate::reader::ListReader;

/// Server-to-client WebSocket message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsFrame {
    Connected {
        list_id: ListId,
        channels: Vec<String>,
    },
    Notification {
        channel: String,
        notification: Notification,
    },
    /// The subscriber fell behind and `skipped` notifications were dropped.
    Lagged { skipped: u64 },
    Disconnected { reason: String },
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(reader): State<Arc<ListReader>>,
    State(notifier): State<Arc<BroadcastNotifier>>,
    RequestActor(actor): RequestActor,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let list = reader.get_list(&key, &actor).await?;

    info!(
        list_id = %list.id,
        actor = %actor.user_id,
        "WebSocket connection request"
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, notifier, list.id)))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, notifier: Arc<BroadcastNotifier>, list_id: ListId) {
    info!(list_id = %list_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    let [list_channel, activity_channel] = Channel::for_list(list_id);
    let channels = vec![list_channel.to_string(), activity_channel.to_string()];
    let mut events = tokio_stream::StreamExt::merge(
        BroadcastStream::new(notifier.subscribe(list_channel)),
        BroadcastStream::new(notifier.subscribe(activity_channel)),
    );

    if let Err(e) = send_frame(&mut sender, &WsFrame::Connected { list_id, channels }).await {
        error!(list_id = %list_id, error = %e, "Failed to send Connected frame");
        return;
    }

    // Client messages are ignored; this task only notices the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!(list_id = %list_id, "Client sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(list_id = %list_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            next = events.next() => {
                let frame = match next {
                    Some(Ok(notification)) => WsFrame::Notification {
                        channel: notification.channel().to_string(),
                        notification,
                    },
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(list_id = %list_id, skipped, "Client lagged, notifications were dropped");
                        WsFrame::Lagged { skipped }
                    }
                    None => {
                        info!(list_id = %list_id, "Notification channels closed");
                        break;
                    }
                };
                if let Err(e) = send_frame(&mut sender, &frame).await {
                    error!(list_id = %list_id, error = %e, "Failed to send frame, closing connection");
                    break;
                }
            }

            _ = &mut recv_task => {
                debug!(list_id = %list_id, "Receiver task finished");
                break;
            }
        }
    }

    recv_task.abort();
    drop(events);
    let released = notifier.release_list(list_id);
    debug!(list_id = %list_id, released, "Released idle notification channels");
    let _ = send_frame(
        &mut sender,
        &WsFrame::Disconnected {
            reason: "Connection closed".to_string(),
        },
    )
    .await;

    info!(list_id = %list_id, "WebSocket disconnected");
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &WsFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(|e| {
        error!(error = %e, "Failed to serialize frame");
        axum::Error::new(e)
    })?;
    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_core::{ChangeEvent, ChangeKind};
    use uuid::Uuid;

    #[test]
    fn test_frame_wire_format() {
        let list_id = Uuid::now_v7();
        let event = ChangeEvent::new(list_id, ChangeKind::UrlReordered { url_count: 3 });
        let frame = WsFrame::Notification {
            channel: Channel::List(list_id).to_string(),
            notification: Notification::Change(event),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["channel"], format!("list:{}", list_id));

        let back: WsFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_lagged_frame() {
        let json = serde_json::to_string(&WsFrame::Lagged { skipped: 7 }).unwrap();
        assert_eq!(json, r#"{"type":"lagged","skipped":7}"#);
    }
}
