//! Event types pushed to live socket connections.
//!
//! `RealtimeEvent` is the unified outbound event. All variants are
//! Clone + Send + Sync so one event can be enqueued on many connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;
use crate::presence::PresenceRecord;

/// Events delivered to socket clients.
///
/// Serialized with a `type` tag in SCREAMING_SNAKE_CASE
/// (`NEW_MESSAGE`, `PRESENCE`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealtimeEvent {
    /// Sent once right after a successful handshake.
    ConnectionSuccess { user_id: Uuid },

    /// A message was persisted in a session the connection subscribes to.
    NewMessage { message: Message },

    /// A mentor went online or offline. Delivered to every connection.
    Presence {
        mentor_id: Uuid,
        is_online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    },

    /// The other participant started or stopped typing.
    Typing {
        session_id: Uuid,
        user_id: Uuid,
        is_typing: bool,
    },

    /// Acknowledges a subscribe command.
    Subscribed { session_id: Uuid },

    /// A client command was rejected.
    Error { message: String },

    /// Reply to a client ping.
    Pong,
}

impl From<&PresenceRecord> for RealtimeEvent {
    fn from(record: &PresenceRecord) -> Self {
        RealtimeEvent::Presence {
            mentor_id: record.mentor_id,
            is_online: record.is_online,
            last_seen_at: record.last_seen_at,
        }
    }
}

impl RealtimeEvent {
    /// The session this event is scoped to, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            RealtimeEvent::NewMessage { message } => Some(message.session_id),
            RealtimeEvent::Typing { session_id, .. } => Some(*session_id),
            RealtimeEvent::Subscribed { session_id } => Some(*session_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_event_tag() {
        let record = PresenceRecord {
            mentor_id: Uuid::now_v7(),
            is_online: true,
            last_seen_at: None,
        };
        let json = serde_json::to_value(RealtimeEvent::from(&record)).unwrap();
        assert_eq!(json["type"], "PRESENCE");
        assert_eq!(json["is_online"], true);
    }

    #[test]
    fn test_pong_serializes_as_bare_tag() {
        let json = serde_json::to_string(&RealtimeEvent::Pong).unwrap();
        assert_eq!(json, r#"{"type":"PONG"}"#);
    }

    #[test]
    fn test_connection_success_tag() {
        let id = Uuid::now_v7();
        let json = serde_json::to_value(RealtimeEvent::ConnectionSuccess { user_id: id }).unwrap();
        assert_eq!(json["type"], "CONNECTION_SUCCESS");
        assert_eq!(json["user_id"], id.to_string());
    }
}
