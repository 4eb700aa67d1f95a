//! Linkdeck Events - Change Notification
//!
//! Every list has two channels: `list:{listId}` for change events and
//! `list-activity:{listId}` for audit records. The transport is pluggable
//! behind [`ChangeNotifier`]; [`BroadcastNotifier`] fans out in process over
//! tokio broadcast channels and backs the server's WebSocket endpoint.
//!
//! Events are validated at this boundary before dispatch. Delivery failures
//! never propagate to the mutation that produced the event.

mod channel;
mod notifier;

pub use channel::{Channel, Notification};
pub use notifier::{
    publish_best_effort, validate_for_dispatch, BroadcastNotifier, ChangeNotifier,
};
