//! Ordered, pluggable message processing pipeline.

pub mod stages;

use std::sync::{Arc, RwLock};

use storegate_core::result::AppResult;
use tracing::info;

use crate::message::GatewayMessage;

/// One transformation applied to every message passing the gateway.
///
/// Stages must not swallow failures: an `Err` propagates to the caller,
/// which treats it like a validation failure (structured error response,
/// connection survives).
pub trait MessageStage: Send + Sync {
    /// Stable stage name, used for removal and logging.
    fn name(&self) -> &'static str;

    /// Transforms the message.
    fn apply(&self, message: GatewayMessage) -> AppResult<GatewayMessage>;
}

/// Mutable, ordered list of stages applied left-to-right.
///
/// Registration and removal take the write lock; application clones the
/// stage list first (copy-on-iterate), so concurrent processing never
/// observes a half-mutated pipeline.
pub struct Pipeline {
    stages: RwLock<Vec<Arc<dyn MessageStage>>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self {
            stages: RwLock::new(Vec::new()),
        }
    }

    /// Creates the canonical pipeline: timestamp, metadata, payload
    /// marker, size accounting, compression, encryption.
    pub fn standard() -> Self {
        let pipeline = Self::new();
        pipeline.register(Arc::new(stages::TimestampStage));
        pipeline.register(Arc::new(stages::MetadataStage));
        pipeline.register(Arc::new(stages::PayloadMarkerStage));
        pipeline.register(Arc::new(stages::SizeAccountingStage));
        pipeline.register(Arc::new(stages::CompressionStage));
        pipeline.register(Arc::new(stages::EncryptionStage));
        pipeline
    }

    /// Appends a stage.
    pub fn register(&self, stage: Arc<dyn MessageStage>) {
        let name = stage.name();
        self.stages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(stage);
        info!(stage = name, "Registered pipeline stage");
    }

    /// Removes a stage by name. Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> bool {
        let mut stages = self.stages.write().unwrap_or_else(|e| e.into_inner());
        let before = stages.len();
        stages.retain(|s| s.name() != name);
        let removed = stages.len() < before;
        if removed {
            info!(stage = name, "Removed pipeline stage");
        }
        removed
    }

    /// Applies every stage left-to-right. Stage failures propagate.
    pub fn process(&self, message: GatewayMessage) -> AppResult<GatewayMessage> {
        let snapshot: Vec<Arc<dyn MessageStage>> = self
            .stages
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut current = message;
        for stage in snapshot {
            current = stage.apply(current)?;
        }
        Ok(current)
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.stages.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use storegate_core::error::AppError;

    struct FailingStage;

    impl MessageStage for FailingStage {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&self, _message: GatewayMessage) -> AppResult<GatewayMessage> {
            Err(AppError::processing("stage blew up"))
        }
    }

    #[test]
    fn test_standard_order_and_effects() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.len(), 6);

        let mut msg = GatewayMessage::new(MessageType::DataUpdate, "/topic/data/updates");
        // Forged client timestamp far in the past.
        msg.timestamp = Some(Utc::now() - Duration::hours(3));

        let out = pipeline.process(msg).unwrap();

        // Timestamp overwritten with gateway time.
        assert!(out.timestamp.unwrap() > Utc::now() - Duration::minutes(1));
        let metadata = out.metadata.as_ref().unwrap();
        assert!(metadata.contains_key("processedAt"));
        assert!(metadata.contains_key("messageSize"));
        assert!(out.payload.as_ref().unwrap().contains_key("processedTimestamp"));
    }

    #[test]
    fn test_stage_failure_propagates() {
        let pipeline = Pipeline::new();
        pipeline.register(Arc::new(FailingStage));

        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        let err = pipeline.process(msg).unwrap_err();
        assert_eq!(err.kind, storegate_core::ErrorKind::Processing);
    }

    #[test]
    fn test_register_and_remove() {
        let pipeline = Pipeline::standard();
        assert!(pipeline.remove("compression"));
        assert!(!pipeline.remove("compression"));
        assert_eq!(pipeline.len(), 5);
    }

    #[test]
    fn test_missing_maps_are_created() {
        let pipeline = Pipeline::standard();
        let msg = GatewayMessage {
            message_type: "ALERT".to_string(),
            destination: "/topic/alerts".to_string(),
            timestamp: None,
            payload: None,
            metadata: None,
            status: None,
        };
        let out = pipeline.process(msg).unwrap();
        assert!(out.metadata.is_some());
        assert!(out.payload.is_some());
    }

    #[test]
    fn test_payload_marker_distinct_from_metadata() {
        let pipeline = Pipeline::standard();
        let mut msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        msg.insert_payload("k", json!("v"));
        let out = pipeline.process(msg).unwrap();

        // Consumers that only see the payload still get a marker.
        assert!(out.payload.as_ref().unwrap().contains_key("processedTimestamp"));
        assert!(!out.metadata.as_ref().unwrap().contains_key("processedTimestamp"));
    }
}
