//! Change notifier seam and the in-process broadcast implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use linkdeck_core::{ChangeEvent, ListId, NotificationError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::channel::{Channel, Notification};

/// Fans change events out to a list's subscribers.
///
/// Delivery is at-least-once at best and unordered across channels. Within
/// one `publish` call the change goes out before its activity record.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// Validate and deliver `event`. Returns how many subscribers received
    /// the change message.
    async fn publish(&self, event: &ChangeEvent) -> Result<usize, NotificationError>;
}

/// Publish without letting a failure escape. Returns whether it was sent.
pub async fn publish_best_effort(notifier: &dyn ChangeNotifier, event: &ChangeEvent) -> bool {
    match notifier.publish(event).await {
        Ok(_) => true,
        Err(e) => {
            warn!(
                list_id = %event.list_id,
                action = event.action_name(),
                error = %e,
                "Change notification dropped"
            );
            false
        }
    }
}

/// Reject events that are not internally consistent before they reach any
/// subscriber.
pub fn validate_for_dispatch(event: &ChangeEvent) -> Result<(), NotificationError> {
    event
        .validate()
        .map_err(|e| NotificationError::InvalidEvent {
            reason: e.to_string(),
        })
}

/// In-process notifier backed by one tokio broadcast channel per list
/// channel name.
#[derive(Debug)]
pub struct BroadcastNotifier {
    channels: DashMap<Channel, broadcast::Sender<Notification>>,
    capacity: usize,
}

impl BroadcastNotifier {
    /// Create a notifier whose per-channel buffers hold `capacity` messages.
    /// Slow subscribers beyond that lag and miss messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a channel, creating it if needed.
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<Notification> {
        self.channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels currently held open.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drop a list's two channels once their last subscriber has gone.
    /// Called when a subscription ends. Returns how many were removed.
    pub fn release_list(&self, list_id: ListId) -> usize {
        Channel::for_list(list_id)
            .iter()
            .filter(|channel| {
                self.channels
                    .remove_if(*channel, |_, tx| tx.receiver_count() == 0)
                    .is_some()
            })
            .count()
    }

    /// Drop channels nobody listens to any more.
    pub fn prune(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, tx| tx.receiver_count() > 0);
        before.saturating_sub(self.channels.len())
    }

    fn send(&self, message: Notification) -> usize {
        let channel = message.channel();
        let Some(tx) = self.channels.get(&channel) else {
            debug!(channel = %channel, "No subscribers for channel");
            return 0;
        };
        match tx.send(message) {
            Ok(receivers) => {
                debug!(channel = %channel, receivers, "Broadcast notification");
                receivers
            }
            Err(_) => {
                // Every receiver has gone away.
                debug!(channel = %channel, "No receivers for notification");
                0
            }
        }
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl ChangeNotifier for BroadcastNotifier {
    async fn publish(&self, event: &ChangeEvent) -> Result<usize, NotificationError> {
        validate_for_dispatch(event)?;
        let delivered = self.send(Notification::Change(event.clone()));
        if let Some(activity) = &event.activity {
            self.send(Notification::Activity(activity.clone()));
        }
        Ok(delivered)
    }
}
