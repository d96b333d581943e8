//! Factory helpers for common message shapes.

use chrono::Utc;
use serde_json::{Value, json};

use super::catalog;
use super::envelope::GatewayMessage;
use super::types::{MessageStatus, MessageType, Priority};

/// Builds an analytics update carrying arbitrary metric data.
pub fn analytics_update(destination: &str, data: serde_json::Map<String, Value>) -> GatewayMessage {
    GatewayMessage::new(MessageType::AnalyticsUpdate, destination).with_payload(data)
}

/// Builds an alert with a priority.
pub fn alert(destination: &str, message: &str, priority: Priority) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::Alert, destination);
    msg.insert_payload("message", json!(message));
    msg.insert_payload("priority", json!(priority));
    msg
}

/// Builds a user-facing notification.
pub fn notification(destination: &str, title: &str, message: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::Notification, destination);
    msg.insert_payload("title", json!(title));
    msg.insert_payload("message", json!(message));
    msg
}

/// Builds a status update.
pub fn status_update(destination: &str, status: &str, details: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::StatusUpdate, destination);
    msg.insert_payload("status", json!(status));
    msg.insert_payload("details", json!(details));
    msg
}

/// Builds a progress update with PROCESSING status.
pub fn progress_update(destination: &str, progress: u8, details: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::ProgressUpdate, destination)
        .with_status(MessageStatus::Processing);
    msg.insert_payload("progress", json!(progress));
    msg.insert_payload("details", json!(details));
    msg
}

/// Builds a data sync message.
pub fn data_sync(destination: &str, data: serde_json::Map<String, Value>) -> GatewayMessage {
    GatewayMessage::new(MessageType::DataSync, destination).with_payload(data)
}

/// Builds a system status message.
pub fn system_status(destination: &str, status: &str, details: Value) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::SystemStatus, destination);
    msg.insert_payload("status", json!(status));
    msg.insert_payload("details", details);
    msg
}

/// Builds a generic error envelope with ERROR status.
pub fn error(destination: &str, error: &str, details: &str) -> GatewayMessage {
    let mut msg =
        GatewayMessage::new(MessageType::Error, destination).with_status(MessageStatus::Error);
    msg.insert_payload("error", json!(error));
    msg.insert_payload("details", json!(details));
    msg
}

/// Builds the structured response for a failed validation, carrying
/// every accumulated error string.
pub fn validation_error(errors: &[String]) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::Error, "/user/queue/errors")
        .with_status(MessageStatus::Error);
    msg.insert_payload("error", json!("Message validation failed"));
    msg.insert_payload("details", json!(errors));
    msg
}

/// Builds the structured response for a message whose type has no
/// registered handler.
pub fn unknown_type_error(wire_type: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::Error, "/user/queue/errors")
        .with_status(MessageStatus::Error);
    msg.insert_payload("error", json!("Unknown message type"));
    msg.insert_payload("type", json!(wire_type));
    msg
}

/// Builds the structured response for a pipeline or handler failure.
pub fn processing_error(details: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::Error, "/user/queue/errors")
        .with_status(MessageStatus::Error);
    msg.insert_payload("error", json!("Message processing failed"));
    msg.insert_payload("details", json!(details));
    msg
}

/// Builds the one-time welcome sent to a freshly registered session.
pub fn welcome(session_id: &str, username: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::SystemStatus, "/user/queue/welcome");
    msg.insert_payload("message", json!(format!("Welcome {username}")));
    msg.insert_payload("sessionId", json!(session_id));
    msg.insert_payload("timestamp", json!(Utc::now().timestamp_millis()));
    msg
}

/// Builds the best-effort expiration notice sent before eviction.
pub fn expiration(session_id: &str, reason: &str) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::SystemStatus, "/user/queue/expiration")
        .with_status(MessageStatus::Error);
    msg.insert_payload("reason", json!(reason));
    msg.insert_payload("sessionId", json!(session_id));
    msg.insert_payload("timestamp", json!(Utc::now().timestamp_millis()));
    msg
}

/// Builds the periodic liveness frame.
pub fn heartbeat() -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::SystemStatus, catalog::HEARTBEAT);
    msg.insert_payload("timestamp", json!(Utc::now().timestamp_millis()));
    msg.insert_payload("type", json!("HEARTBEAT"));
    msg
}

/// Builds the admin event announcing a connection or disconnection.
pub fn admin_connection_event(
    session_id: &str,
    username: &str,
    connected: bool,
    active_connections: usize,
) -> GatewayMessage {
    let mut msg = GatewayMessage::new(MessageType::SystemStatus, catalog::ADMIN_CONNECTIONS);
    msg.insert_payload(
        "event",
        json!(if connected { "CONNECTION" } else { "DISCONNECTION" }),
    );
    msg.insert_payload("sessionId", json!(session_id));
    msg.insert_payload("username", json!(username));
    msg.insert_payload("activeConnections", json!(active_connections));
    msg.insert_payload("timestamp", json!(Utc::now().timestamp_millis()));
    msg
}
