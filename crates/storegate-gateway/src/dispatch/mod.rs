//! Message dispatch: validation, pipeline processing, and routing to
//! the type's handler.
//!
//! Routing over the closed [`MessageType`] set is a plain match; the
//! handler table is the escape hatch for extensions, consulted before
//! the built-in arms. Handler execution is bounded by a semaphore and
//! isolated in a task so a panicking handler is contained at this
//! boundary and never tears down the connection.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use storegate_core::error::AppError;
use storegate_core::result::AppResult;

use crate::delivery::DeliveryService;
use crate::message::{GatewayMessage, builder, catalog, validate};
use crate::pipeline::Pipeline;
use crate::session::Session;

/// Application-level handler for one wire type.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles a validated, pipeline-processed message from `session`.
    async fn handle(&self, session: Arc<Session>, message: GatewayMessage) -> AppResult<()>;
}

/// Routes validated messages to their handlers.
pub struct MessageDispatcher {
    pipeline: Arc<Pipeline>,
    delivery: Arc<DeliveryService>,
    /// wire type -> extension handler, consulted before the built-in
    /// routing table
    handlers: DashMap<String, Arc<dyn MessageHandler>>,
    permits: Arc<Semaphore>,
}

impl MessageDispatcher {
    pub fn new(pipeline: Arc<Pipeline>, delivery: Arc<DeliveryService>, workers: usize) -> Self {
        Self {
            pipeline,
            delivery,
            handlers: DashMap::new(),
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Registers an extension handler for a wire type. Registration
    /// also admits the type past validation.
    pub fn register_handler(&self, wire_type: &str, handler: Arc<dyn MessageHandler>) {
        info!(wire_type, "registered message handler");
        self.handlers.insert(wire_type.to_string(), handler);
    }

    /// Removes an extension handler. Returns whether one was present.
    pub fn deregister_handler(&self, wire_type: &str) -> bool {
        let removed = self.handlers.remove(wire_type).is_some();
        if removed {
            info!(wire_type, "deregistered message handler");
        }
        removed
    }

    /// Validates and dispatches one inbound message.
    ///
    /// A validation failure produces a structured error response on the
    /// sender's error queue and nothing else; the session survives every
    /// outcome except its own disconnect.
    pub async fn dispatch(&self, session: Arc<Session>, message: GatewayMessage) -> AppResult<()> {
        let custom = self
            .handlers
            .get(&message.message_type)
            .map(|h| Arc::clone(&h));

        let errors = self.validation_errors(&message, custom.is_some());
        if !errors.is_empty() {
            warn!(session_id = %session.id, errors = errors.len(), "message failed validation");
            let response = builder::validation_error(&errors);
            return self
                .delivery
                .send_to_session(session.id, catalog::QUEUE_ERRORS, &response);
        }

        session.touch();

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::internal("Dispatch semaphore closed"))?;

        let pipeline = Arc::clone(&self.pipeline);
        let delivery = Arc::clone(&self.delivery);
        let cancel = session.cancellation_token().clone();
        let task_session = Arc::clone(&session);
        let task_message = message;

        // Spawned so a handler panic surfaces as a join error instead of
        // unwinding through the transport loop. The caller awaits the
        // result, keeping per-session ordering.
        let handle = tokio::spawn(async move {
            let _permit = permit;
            tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                result = run(pipeline, delivery, custom, task_session, task_message) => result,
            }
        });

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!(session_id = %session.id, error = %err, "message processing failed");
                let response = builder::processing_error(&err.message);
                self.delivery
                    .send_to_session(session.id, catalog::QUEUE_ERRORS, &response)
            }
            Err(join_err) if join_err.is_panic() => {
                error!(session_id = %session.id, "message handler panicked");
                let response = builder::processing_error("Internal handler failure");
                self.delivery
                    .send_to_session(session.id, catalog::QUEUE_ERRORS, &response)
            }
            Err(_) => Ok(()),
        }
    }

    /// Validates and pipeline-processes a server-originated message
    /// without sending it.
    ///
    /// Publishers call this before handing the result to the delivery
    /// service; a failure is returned to the publisher instead of
    /// surfacing on any client queue.
    pub fn process_outgoing(&self, message: GatewayMessage) -> AppResult<GatewayMessage> {
        let report = validate(&message);
        if report.has_errors() {
            return Err(AppError::validation(report.message()));
        }
        self.pipeline.process(message)
    }

    /// Validation errors for the message. A registered extension handler
    /// admits its wire type, so the unsupported-type violation is waived
    /// for it.
    fn validation_errors(&self, message: &GatewayMessage, has_custom: bool) -> Vec<String> {
        let report = validate(message);
        let waived = format!("Unsupported message type: {}", message.message_type);
        report
            .errors()
            .iter()
            .filter(|e| !(has_custom && **e == waived))
            .cloned()
            .collect()
    }
}

/// Pipeline processing plus routing, inside the bounded task.
async fn run(
    pipeline: Arc<Pipeline>,
    delivery: Arc<DeliveryService>,
    custom: Option<Arc<dyn MessageHandler>>,
    session: Arc<Session>,
    message: GatewayMessage,
) -> AppResult<()> {
    let processed = pipeline.process(message)?;

    if let Some(handler) = custom {
        return handler.handle(session, processed).await;
    }

    match processed.typed() {
        Some(message_type) => {
            let mut routed = processed;
            routed.destination = message_type.topic().to_string();
            delivery.send(&routed);
            Ok(())
        }
        // Only reachable if a stage rewrote the type tag.
        None => {
            let response = builder::unknown_type_error(&processed.message_type);
            delivery.send_to_session(session.id, catalog::QUEUE_ERRORS, &response)
        }
    }
}
