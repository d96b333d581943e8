//! Structural message validation.
//!
//! A single pass accumulates every violated rule; no short-circuiting
//! after the first failure. Pure over its input, no side effects.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};

use super::envelope::GatewayMessage;
use super::types::MessageType;

/// Hard cap for the whole estimated message size.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
/// Separate, smaller cap for the payload alone.
pub const MAX_PAYLOAD_SIZE: usize = 512 * 1024;
/// Maximum destination length.
pub const MAX_DESTINATION_LENGTH: usize = 255;
/// Maximum type tag length.
pub const MAX_TYPE_LENGTH: usize = 50;
/// Tolerated clock skew for future timestamps.
const FUTURE_SKEW_SECONDS: i64 = 60;

/// Ordered list of human-readable violations; empty means valid.
///
/// Transient: created per validation call, never retained.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    /// Records one violation.
    pub fn add(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Whether any rule was violated.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The accumulated violations, in check order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// All violations joined into one line.
    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validates a message, reporting every violated rule in one pass.
pub fn validate(message: &GatewayMessage) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_type(&message.message_type, &mut report);
    validate_destination(&message.destination, &mut report);
    validate_timestamp(message, &mut report);
    validate_payload(message.payload.as_ref(), &mut report);
    if let Some(metadata) = &message.metadata {
        validate_entries(metadata, "Metadata", &mut report);
    }
    if message.status.is_none() {
        report.add("Message status cannot be null");
    }
    validate_message_size(message, &mut report);

    report
}

fn validate_type(wire_type: &str, report: &mut ValidationReport) {
    if wire_type.is_empty() {
        report.add("Message type cannot be null or empty");
        return;
    }
    if wire_type.len() > MAX_TYPE_LENGTH {
        report.add("Message type exceeds maximum length");
        return;
    }
    if !wire_type
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == '_')
    {
        report.add("Invalid message type format");
        return;
    }
    if MessageType::from_wire(wire_type).is_none() {
        report.add(format!("Unsupported message type: {wire_type}"));
    }
}

fn validate_destination(destination: &str, report: &mut ValidationReport) {
    if destination.is_empty() {
        report.add("Message destination cannot be null or empty");
        return;
    }
    if destination.len() > MAX_DESTINATION_LENGTH {
        report.add("Destination exceeds maximum length");
        return;
    }
    if !is_valid_destination(destination) {
        report.add("Invalid destination format");
    }
}

/// Path grammar: leading `/`, then path-safe characters only.
fn is_valid_destination(destination: &str) -> bool {
    let Some(rest) = destination.strip_prefix('/') else {
        return false;
    };
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
}

fn validate_timestamp(message: &GatewayMessage, report: &mut ValidationReport) {
    match message.timestamp {
        None => report.add("Message timestamp cannot be null"),
        Some(ts) => {
            if ts > Utc::now() + Duration::seconds(FUTURE_SKEW_SECONDS) {
                report.add("Message timestamp cannot be in the future");
            }
        }
    }
}

fn validate_payload(payload: Option<&Map<String, Value>>, report: &mut ValidationReport) {
    let Some(payload) = payload else {
        report.add("Message payload cannot be null");
        return;
    };

    if estimate_map_size(payload) > MAX_PAYLOAD_SIZE {
        report.add("Payload size exceeds maximum limit");
        return;
    }

    validate_structure(payload, "Payload", report);
}

/// Recursive key/value check: nested maps get the same rule.
fn validate_structure(map: &Map<String, Value>, label: &str, report: &mut ValidationReport) {
    for (key, value) in map {
        if key.is_empty() {
            report.add(format!("{label} contains null or empty key"));
            continue;
        }
        match value {
            Value::Null => report.add(format!("{label} contains null value for key: {key}")),
            Value::Object(nested) => validate_structure(nested, label, report),
            _ => {}
        }
    }
}

/// Flat key/value check for metadata.
fn validate_entries(map: &Map<String, Value>, label: &str, report: &mut ValidationReport) {
    for (key, value) in map {
        if key.is_empty() {
            report.add(format!("{label} contains null or empty key"));
            continue;
        }
        if value.is_null() {
            report.add(format!("{label} contains null value for key: {key}"));
        }
    }
}

fn validate_message_size(message: &GatewayMessage, report: &mut ValidationReport) {
    if estimate_message_size(message) > MAX_MESSAGE_SIZE {
        report.add("Total message size exceeds maximum limit");
    }
}

/// Estimated serialized size of a map, in bytes.
pub fn estimate_map_size(map: &Map<String, Value>) -> usize {
    serde_json::to_string(map).map(|s| s.len()).unwrap_or(0)
}

/// Estimated total message size: type + destination + payload + metadata.
pub fn estimate_message_size(message: &GatewayMessage) -> usize {
    let mut size = message.message_type.len() + message.destination.len();
    if let Some(payload) = &message.payload {
        size += estimate_map_size(payload);
    }
    if let Some(metadata) = &message.metadata {
        size += estimate_map_size(metadata);
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use serde_json::json;

    fn valid_message() -> GatewayMessage {
        let mut msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        msg.insert_payload("message", json!("shelf restocked"));
        msg
    }

    #[test]
    fn test_valid_message_passes() {
        let report = validate(&valid_message());
        assert!(!report.has_errors(), "unexpected: {}", report.message());
    }

    #[test]
    fn test_all_failures_reported_in_one_pass() {
        let msg = GatewayMessage {
            message_type: String::new(),
            destination: String::new(),
            timestamp: None,
            payload: None,
            metadata: None,
            status: None,
        };
        let report = validate(&msg);
        // type, destination, timestamp, payload, status
        assert_eq!(report.errors().len(), 5);
    }

    #[test]
    fn test_unlisted_type_rejected() {
        let mut msg = valid_message();
        msg.message_type = "BOGUS_TYPE".to_string();
        let report = validate(&msg);
        assert!(report.message().contains("Unsupported message type: BOGUS_TYPE"));
    }

    #[test]
    fn test_lowercase_type_is_a_format_error() {
        let mut msg = valid_message();
        msg.message_type = "alert".to_string();
        let report = validate(&msg);
        assert!(report.message().contains("Invalid message type format"));
    }

    #[test]
    fn test_destination_grammar() {
        for bad in ["topic/alerts", "/", "/topic/al erts", "/topic/a;b"] {
            let mut msg = valid_message();
            msg.destination = bad.to_string();
            assert!(validate(&msg).has_errors(), "accepted {bad:?}");
        }
        let mut msg = valid_message();
        msg.destination = "/topic/orders/item_12.v2-final".to_string();
        assert!(!validate(&msg).has_errors());
    }

    #[test]
    fn test_future_timestamp_rejected_past_allowed() {
        let mut msg = valid_message();
        msg.timestamp = Some(Utc::now() + Duration::minutes(5));
        assert!(validate(&msg).has_errors());

        msg.timestamp = Some(Utc::now() - Duration::days(1));
        assert!(!validate(&msg).has_errors());
    }

    #[test]
    fn test_nested_payload_nulls_reported() {
        let mut msg = valid_message();
        msg.insert_payload("nested", json!({"inner": null, "": "x"}));
        let report = validate(&msg);
        assert!(report.message().contains("null value for key: inner"));
        assert!(report.message().contains("null or empty key"));
    }

    #[test]
    fn test_payload_cap_distinct_from_message_cap() {
        // Oversized payload trips the payload-specific error.
        let mut msg = valid_message();
        msg.insert_payload("blob", json!("x".repeat(MAX_PAYLOAD_SIZE + 1)));
        let report = validate(&msg);
        assert!(report.message().contains("Payload size exceeds maximum limit"));

        // Payload under its cap but metadata pushing the total over the
        // hard cap trips the message-level error instead.
        let mut msg = valid_message();
        msg.insert_payload("blob", json!("x".repeat(400 * 1024)));
        msg.insert_metadata("blob", json!("y".repeat(700 * 1024)));
        let report = validate(&msg);
        assert!(!report.message().contains("Payload size exceeds maximum limit"));
        assert!(report.message().contains("Total message size exceeds maximum limit"));
    }

    #[test]
    fn test_deterministic() {
        let mut msg = valid_message();
        msg.message_type = "BOGUS".to_string();
        msg.destination = "bad".to_string();
        let a = validate(&msg);
        let b = validate(&msg);
        assert_eq!(a.errors(), b.errors());
    }
}
