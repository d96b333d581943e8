//! Built-in pipeline stages, in canonical order.

use chrono::Utc;
use serde_json::json;

use storegate_core::result::AppResult;

use crate::message::GatewayMessage;
use crate::message::validator::estimate_message_size;

use super::MessageStage;

/// Overwrites the message timestamp with the gateway's current time.
///
/// Client timestamps are never trusted by ordering-sensitive consumers.
pub struct TimestampStage;

impl MessageStage for TimestampStage {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn apply(&self, mut message: GatewayMessage) -> AppResult<GatewayMessage> {
        message.timestamp = Some(Utc::now());
        Ok(message)
    }
}

/// Ensures a metadata map exists and stamps `processedAt`.
pub struct MetadataStage;

impl MessageStage for MetadataStage {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn apply(&self, mut message: GatewayMessage) -> AppResult<GatewayMessage> {
        message.insert_metadata("processedAt", json!(Utc::now().timestamp_millis()));
        Ok(message)
    }
}

/// Ensures a payload map exists and stamps `processedTimestamp` inside
/// it, separate from message-level metadata.
pub struct PayloadMarkerStage;

impl MessageStage for PayloadMarkerStage {
    fn name(&self) -> &'static str {
        "payload-marker"
    }

    fn apply(&self, mut message: GatewayMessage) -> AppResult<GatewayMessage> {
        message.insert_payload("processedTimestamp", json!(Utc::now().timestamp_millis()));
        Ok(message)
    }
}

/// Records the estimated serialized size into metadata.
pub struct SizeAccountingStage;

impl MessageStage for SizeAccountingStage {
    fn name(&self) -> &'static str {
        "size-accounting"
    }

    fn apply(&self, mut message: GatewayMessage) -> AppResult<GatewayMessage> {
        let size = estimate_message_size(&message);
        message.insert_metadata("messageSize", json!(size));
        Ok(message)
    }
}

/// No-op extension point for payload compression.
pub struct CompressionStage;

impl MessageStage for CompressionStage {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn apply(&self, message: GatewayMessage) -> AppResult<GatewayMessage> {
        Ok(message)
    }
}

/// No-op extension point for payload encryption.
pub struct EncryptionStage;

impl MessageStage for EncryptionStage {
    fn name(&self) -> &'static str {
        "encryption"
    }

    fn apply(&self, message: GatewayMessage) -> AppResult<GatewayMessage> {
        Ok(message)
    }
}
