//! Channel naming and the messages carried on each channel.

use linkdeck_core::{ActivityRecord, ChangeEvent, ListId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A list-scoped notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `list:{listId}`: change events for the list.
    List(ListId),
    /// `list-activity:{listId}`: audit records for the list.
    Activity(ListId),
}

impl Channel {
    pub fn list_id(&self) -> ListId {
        match self {
            Channel::List(id) | Channel::Activity(id) => *id,
        }
    }

    /// Both channels of a list, list updates first.
    pub fn for_list(list_id: ListId) -> [Channel; 2] {
        [Channel::List(list_id), Channel::Activity(list_id)]
    }

    /// Parse a rendered channel name.
    pub fn parse(name: &str) -> Option<Channel> {
        if let Some(rest) = name.strip_prefix("list-activity:") {
            return uuid::Uuid::parse_str(rest).ok().map(Channel::Activity);
        }
        if let Some(rest) = name.strip_prefix("list:") {
            return uuid::Uuid::parse_str(rest).ok().map(Channel::List);
        }
        None
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::List(id) => write!(f, "list:{}", id),
            Channel::Activity(id) => write!(f, "list-activity:{}", id),
        }
    }
}

/// What subscribers receive. JSON only, no binary fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Notification {
    Change(ChangeEvent),
    Activity(ActivityRecord),
}

impl Notification {
    pub fn list_id(&self) -> ListId {
        match self {
            Notification::Change(event) => event.list_id,
            Notification::Activity(record) => record.list_id,
        }
    }

    /// The channel this message belongs on.
    pub fn channel(&self) -> Channel {
        match self {
            Notification::Change(event) => Channel::List(event.list_id),
            Notification::Activity(record) => Channel::Activity(record.list_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkdeck_core::ChangeKind;
    use uuid::Uuid;

    #[test]
    fn test_channel_names() {
        let id = Uuid::nil();
        assert_eq!(
            Channel::List(id).to_string(),
            "list:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            Channel::Activity(id).to_string(),
            "list-activity:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_channel_parse_inverts_display() {
        let id = Uuid::now_v7();
        for channel in Channel::for_list(id) {
            assert_eq!(Channel::parse(&channel.to_string()), Some(channel));
        }
        assert_eq!(Channel::parse("list:not-a-uuid"), None);
        assert_eq!(Channel::parse("board:123"), None);
    }

    #[test]
    fn test_notification_routing() {
        let id = Uuid::now_v7();
        let change = Notification::Change(ChangeEvent::new(id, ChangeKind::ListUpdated));
        assert_eq!(change.channel(), Channel::List(id));
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "change");
        assert_eq!(json["data"]["action"], "list_updated");
    }
}
