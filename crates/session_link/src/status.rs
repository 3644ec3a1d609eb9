//! Connection state and the status notifications pushed to the consumer.

use crate::queue::Message;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the single connection owned by a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// A reconnect loop is active. Nothing else sets this state.
    Reconnecting,
    ReconnectFailed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ConnectionState {
    /// Whether a polling session is running for this state.
    pub fn has_session(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnecting)
    }
}

/// Payload of a `connection_status` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Reconnecting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Reconnected {
        attempts: u32,
    },
    ReconnectFailed {
        reason: String,
    },
}

impl ConnectionStatus {
    /// Announcement that the connection was lost and retries are starting.
    pub fn connection_lost(timeout_secs: u64) -> Self {
        Self::Reconnecting {
            attempt: None,
            remaining: None,
            timeout: Some(timeout_secs),
        }
    }

    pub fn attempt(attempt: u32, remaining_secs: u64) -> Self {
        Self::Reconnecting {
            attempt: Some(attempt),
            remaining: Some(remaining_secs),
            timeout: None,
        }
    }

    pub fn timed_out() -> Self {
        Self::ReconnectFailed {
            reason: "timeout".to_string(),
        }
    }

    /// Encodes the notification in the same envelope the server uses.
    pub fn to_message(&self) -> Message {
        let envelope = StatusEnvelope {
            kind: StatusEnvelope::KIND.to_string(),
            payload: self.clone(),
        };
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

/// `{"type": "connection_status", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: ConnectionStatus,
}

impl StatusEnvelope {
    pub const KIND: &'static str = "connection_status";

    /// Parses a queued message back into a status notification, if it is one.
    pub fn parse(message: &str) -> Option<ConnectionStatus> {
        serde_json::from_str::<StatusEnvelope>(message)
            .ok()
            .filter(|envelope| envelope.kind == Self::KIND)
            .map(|envelope| envelope.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn as_json(status: ConnectionStatus) -> Value {
        serde_json::from_str(&status.to_message()).unwrap()
    }

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            as_json(ConnectionStatus::connection_lost(300)),
            json!({"type": "connection_status", "payload": {"status": "reconnecting", "timeout": 300}})
        );
        assert_eq!(
            as_json(ConnectionStatus::attempt(3, 290)),
            json!({"type": "connection_status", "payload": {"status": "reconnecting", "attempt": 3, "remaining": 290}})
        );
        assert_eq!(
            as_json(ConnectionStatus::Reconnected { attempts: 4 }),
            json!({"type": "connection_status", "payload": {"status": "reconnected", "attempts": 4}})
        );
        assert_eq!(
            as_json(ConnectionStatus::timed_out()),
            json!({"type": "connection_status", "payload": {"status": "reconnect_failed", "reason": "timeout"}})
        );
    }

    #[test]
    fn test_parse_ignores_game_messages() {
        assert_eq!(
            StatusEnvelope::parse(&ConnectionStatus::timed_out().to_message()),
            Some(ConnectionStatus::timed_out())
        );
        assert_eq!(StatusEnvelope::parse(r#"{"type":"move","payload":{}}"#), None);
        assert_eq!(StatusEnvelope::parse("not json"), None);
    }
}
