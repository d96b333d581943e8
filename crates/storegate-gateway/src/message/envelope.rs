//! The wire message envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{MessageStatus, MessageType};

/// Wire-level message exchanged with clients and collaborator services.
///
/// The `type` field is a raw string on the wire; [`MessageType`] parses
/// it into the closed set. Optional fields stay optional here so the
/// validator can report missing ones instead of deserialization
/// rejecting the whole frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Message type tag (SCREAMING_SNAKE_CASE).
    #[serde(rename = "type", default)]
    pub message_type: String,
    /// Hierarchical destination path.
    #[serde(default)]
    pub destination: String,
    /// Gateway-owned timestamp; client values are overwritten by the
    /// pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Application payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    /// Pipeline-owned metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Processing status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl GatewayMessage {
    /// Creates a message of the given type addressed to `destination`,
    /// timestamped now with an empty payload and SUCCESS status.
    pub fn new(message_type: MessageType, destination: impl Into<String>) -> Self {
        Self {
            message_type: message_type.as_wire().to_string(),
            destination: destination.into(),
            timestamp: Some(Utc::now()),
            payload: Some(Map::new()),
            metadata: None,
            status: Some(MessageStatus::Success),
        }
    }

    /// Sets the payload map.
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Inserts one payload entry, creating the map if needed.
    pub fn insert_payload(&mut self, key: impl Into<String>, value: Value) {
        self.payload
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }

    /// Inserts one metadata entry, creating the map if needed.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }

    /// Parses the wire type into the closed set, if it is a member.
    pub fn typed(&self) -> Option<MessageType> {
        MessageType::from_wire(&self.message_type)
    }

    /// Whether the status is SUCCESS.
    pub fn is_success(&self) -> bool {
        self.status == Some(MessageStatus::Success)
    }

    /// Whether the status is ERROR.
    pub fn is_error(&self) -> bool {
        self.status == Some(MessageStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        let json: Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(json["type"], "ALERT");
        assert_eq!(json["destination"], "/topic/alerts");
        assert_eq!(json["status"], "SUCCESS");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_partial_frame_deserializes() {
        // Missing fields become None so the validator can report them.
        let msg: GatewayMessage = serde_json::from_str(r#"{"type":"ALERT"}"#).unwrap();
        assert_eq!(msg.message_type, "ALERT");
        assert!(msg.timestamp.is_none());
        assert!(msg.payload.is_none());
        assert!(msg.status.is_none());
    }

    #[test]
    fn test_typed_parsing() {
        let mut msg = GatewayMessage::new(MessageType::DataSync, "/topic/data/sync");
        assert_eq!(msg.typed(), Some(MessageType::DataSync));
        msg.message_type = "NOT_A_TYPE".to_string();
        assert_eq!(msg.typed(), None);
    }
}
