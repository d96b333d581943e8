//! Message delivery: topic fan-out, point-to-point queues, and
//! recent-update bookkeeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use storegate_core::result::AppResult;

use crate::message::{GatewayMessage, builder, catalog};
use crate::session::{SessionId, SessionRegistry};

/// Delivers messages to subscribed sessions and tracks the last update
/// per destination.
#[derive(Debug)]
pub struct DeliveryService {
    registry: Arc<SessionRegistry>,
    /// destination -> last successful delivery time
    last_updates: DashMap<String, DateTime<Utc>>,
}

impl DeliveryService {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            last_updates: DashMap::new(),
        }
    }

    /// Fans a message out to every subscriber of its destination.
    ///
    /// A destination with no subscribers is a successful no-op. A
    /// failure for one subscriber never blocks the rest; each failure
    /// is reported on the error topic. Returns the number of sessions
    /// the message was queued to.
    pub fn send(&self, message: &GatewayMessage) -> usize {
        let destination = message.destination.clone();
        let subscribers = self.registry.sessions_for(&destination);
        if subscribers.is_empty() {
            debug!(destination, "no subscribers, message dropped");
            return 0;
        }

        let mut delivered = 0;
        for session in subscribers {
            match session.send_message(message) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(session_id = %session.id, destination, error = %err,
                        "delivery to subscriber failed");
                    self.report_failure(&destination, &err.to_string());
                }
            }
        }

        if delivered > 0 {
            self.last_updates.insert(destination, Utc::now());
        }
        delivered
    }

    /// Sends a message to one session's private queue.
    pub fn send_to_session(
        &self,
        session_id: SessionId,
        queue_suffix: &str,
        message: &GatewayMessage,
    ) -> AppResult<()> {
        let Some(session) = self.registry.get(session_id) else {
            debug!(session_id = %session_id, "session gone, message dropped");
            return Ok(());
        };
        let mut message = message.clone();
        message.destination = catalog::user_queue(&session_id.to_string(), queue_suffix);
        session.send_message(&message)
    }

    /// Sends a message to every session authenticated as `username`.
    pub fn send_to_user(&self, username: &str, queue_suffix: &str, message: &GatewayMessage) {
        for session in self.registry.sessions_for_user(username) {
            let mut message = message.clone();
            message.destination = catalog::user_queue(&session.id.to_string(), queue_suffix);
            if let Err(err) = session.send_message(&message) {
                warn!(session_id = %session.id, username, error = %err,
                    "user delivery failed");
            }
        }
    }

    /// Broadcasts a delivery failure on the error topic.
    ///
    /// Failures while reporting are logged and not re-reported, so a
    /// broken error subscriber cannot recurse.
    fn report_failure(&self, destination: &str, details: &str) {
        let notice = builder::error(catalog::ERROR_BROADCAST, "Message delivery failed", details);
        for session in self.registry.sessions_for(catalog::ERROR_BROADCAST) {
            if let Err(err) = session.send_message(&notice) {
                debug!(session_id = %session.id, source_destination = destination,
                    error = %err, "error broadcast not delivered");
            }
        }
    }

    /// Last successful delivery time for a destination.
    pub fn last_update(&self, destination: &str) -> Option<DateTime<Utc>> {
        self.last_updates.get(destination).map(|t| *t)
    }

    /// Whether a destination saw a delivery within the window ending at
    /// `now`.
    pub fn has_recent_update(&self, destination: &str, window: Duration, now: DateTime<Utc>) -> bool {
        self.last_update(destination)
            .is_some_and(|t| now - t <= window)
    }

    /// Drops bookkeeping entries older than the retention window.
    pub fn clear_old_updates(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let before = self.last_updates.len();
        self.last_updates.retain(|_, t| now - *t <= retention);
        before - self.last_updates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use crate::session::session::{Identity, Session};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn setup() -> (Arc<SessionRegistry>, DeliveryService) {
        let registry = Arc::new(SessionRegistry::new());
        let service = DeliveryService::new(Arc::clone(&registry));
        (registry, service)
    }

    async fn subscribed_session(
        registry: &SessionRegistry,
        destination: &str,
        buffer: usize,
    ) -> (SessionId, mpsc::Receiver<String>) {
        let (tx, mut rx) = mpsc::channel(buffer);
        let session = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
        let id = session.id;
        registry.register(session).unwrap();
        rx.recv().await.unwrap(); // welcome
        registry.subscribe(id, destination).unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_fan_out_reaches_all_subscribers() {
        let (registry, service) = setup();
        let (_a, mut rx_a) = subscribed_session(&registry, "/topic/alerts", 8).await;
        let (_b, mut rx_b) = subscribed_session(&registry, "/topic/alerts", 8).await;

        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        assert_eq!(service.send(&msg), 2);
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
        assert!(service.last_update("/topic/alerts").is_some());
    }

    #[tokio::test]
    async fn test_no_subscribers_is_a_noop() {
        let (_registry, service) = setup();
        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        assert_eq!(service.send(&msg), 0);
        assert!(service.last_update("/topic/alerts").is_none());
    }

    #[tokio::test]
    async fn test_one_failed_subscriber_does_not_block_the_rest() {
        let (registry, service) = setup();
        // Buffer of 1 is consumed by the welcome message, so delivery fails.
        let (_stuck, _stuck_rx) = subscribed_session(&registry, "/topic/alerts", 1).await;
        let (_ok, mut ok_rx) = subscribed_session(&registry, "/topic/alerts", 8).await;
        let (_watcher, mut err_rx) =
            subscribed_session(&registry, catalog::ERROR_BROADCAST, 8).await;

        // Re-fill the stuck session's buffer: the welcome was consumed
        // by subscribed_session, so occupy the single slot again.
        registry
            .get(_stuck)
            .unwrap()
            .send_frame("occupied".into())
            .unwrap();

        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        assert_eq!(service.send(&msg), 1);

        assert!(ok_rx.recv().await.is_some());
        let report = err_rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed["destination"], "/topic/errors");
        assert_eq!(parsed["payload"]["error"], "Message delivery failed");
    }

    #[tokio::test]
    async fn test_send_to_session_targets_private_queue() {
        let (registry, service) = setup();
        let (tx, mut rx) = mpsc::channel(8);
        let session = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
        let id = session.id;
        registry.register(session).unwrap();
        rx.recv().await.unwrap(); // welcome

        let msg = GatewayMessage::new(MessageType::Notification, "");
        service
            .send_to_session(id, catalog::QUEUE_NOTIFICATIONS, &msg)
            .unwrap();

        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            parsed["destination"],
            format!("/user/{id}/queue/notifications")
        );
    }

    #[tokio::test]
    async fn test_send_to_missing_session_is_a_noop() {
        let (_registry, service) = setup();
        let msg = GatewayMessage::new(MessageType::Notification, "");
        service
            .send_to_session(Uuid::new_v4(), catalog::QUEUE_NOTIFICATIONS, &msg)
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_bookkeeping_window_and_retention() {
        let (registry, service) = setup();
        let (_id, _rx) = subscribed_session(&registry, "/topic/orders/new", 8).await;
        let msg = GatewayMessage::new(MessageType::DataUpdate, "/topic/orders/new");
        service.send(&msg);

        let now = Utc::now();
        assert!(service.has_recent_update("/topic/orders/new", Duration::seconds(60), now));
        assert!(!service.has_recent_update(
            "/topic/orders/new",
            Duration::seconds(60),
            now + Duration::seconds(120),
        ));

        let removed =
            service.clear_old_updates(Duration::seconds(300), now + Duration::seconds(301));
        assert_eq!(removed, 1);
        assert!(service.last_update("/topic/orders/new").is_none());
    }
}
