//! Event types for the client event loop.

use linkdeck_api::WsFrame;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A frame from the list's change stream.
    Ws(Box<WsFrame>),
    /// The stream dropped and will be retried.
    Disconnected { reason: String },
    /// Periodic self-healing refetch.
    Tick,
    Error(String),
}
