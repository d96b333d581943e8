//! Lifecycle event bridge: connection and subscription events flow
//! through here into the registry, with admin notifications and
//! category-specific initial-data pushes as side effects.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use storegate_core::result::AppResult;

use crate::delivery::DeliveryService;
use crate::message::types::MessageType;
use crate::message::{GatewayMessage, builder};
use crate::session::{Session, SessionId, SessionRegistry};

/// Initial-data category resolved from a subscribed destination.
fn initial_data_kind(destination: &str) -> Option<&'static str> {
    if destination.starts_with("/topic/analytics") {
        Some("INITIAL_DATA")
    } else if destination.starts_with("/topic/alerts") {
        Some("PENDING_ALERTS")
    } else if destination.starts_with("/user/") {
        Some("USER_DATA")
    } else {
        None
    }
}

/// Translates connection lifecycle events into registry mutations,
/// admin notifications, and initial-data pushes.
pub struct LifecycleBridge {
    registry: Arc<SessionRegistry>,
    delivery: Arc<DeliveryService>,
}

impl LifecycleBridge {
    pub fn new(registry: Arc<SessionRegistry>, delivery: Arc<DeliveryService>) -> Self {
        Self { registry, delivery }
    }

    /// Registers a freshly connected session and announces it on the
    /// admin topic.
    pub fn on_connect(&self, session: Arc<Session>) -> AppResult<()> {
        let id = session.id;
        let username = session.identity.username.clone();
        self.registry.register(session)?;
        self.notify_admins(id, &username, true);
        Ok(())
    }

    /// Removes a disconnected session and announces it. Idempotent; a
    /// session already evicted by the sweep produces no event.
    pub fn on_disconnect(&self, id: SessionId) {
        let Some(session) = self.registry.remove(id) else {
            debug!(session_id = %id, "disconnect for unknown session ignored");
            return;
        };
        self.notify_admins(id, &session.identity.username, false);
    }

    /// Records a subscription and pushes the category's initial data to
    /// the subscriber. Categories without initial data subscribe silently.
    pub fn on_subscribe(&self, id: SessionId, destination: &str) -> AppResult<()> {
        self.registry.subscribe(id, destination)?;

        let Some(kind) = initial_data_kind(destination) else {
            return Ok(());
        };
        let Some(session) = self.registry.get(id) else {
            return Ok(());
        };

        let mut push = GatewayMessage::new(MessageType::DataSync, destination);
        push.insert_payload("dataType", json!(kind));
        push.insert_payload("destination", json!(destination));
        if let Err(err) = session.send_message(&push) {
            debug!(session_id = %id, destination, error = %err,
                "initial data push not delivered");
        } else {
            info!(session_id = %id, destination, kind, "initial data pushed");
        }
        Ok(())
    }

    /// Drops a subscription. Idempotent.
    pub fn on_unsubscribe(&self, id: SessionId, destination: &str) {
        self.registry.unsubscribe(id, destination);
    }

    fn notify_admins(&self, id: SessionId, username: &str, connected: bool) {
        let event = builder::admin_connection_event(
            &id.to_string(),
            username,
            connected,
            self.registry.count(),
        );
        self.delivery.send(&event);
        info!(session_id = %id, username, connected, "connection event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::catalog;
    use crate::session::Identity;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn setup() -> (Arc<SessionRegistry>, LifecycleBridge) {
        let registry = Arc::new(SessionRegistry::new());
        let delivery = Arc::new(DeliveryService::new(Arc::clone(&registry)));
        let bridge = LifecycleBridge::new(Arc::clone(&registry), delivery);
        (registry, bridge)
    }

    async fn connected(
        registry: &SessionRegistry,
        bridge: &LifecycleBridge,
    ) -> (Arc<Session>, mpsc::Receiver<String>) {
        let (tx, mut rx) = mpsc::channel(16);
        let session = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
        bridge.on_connect(Arc::clone(&session)).unwrap();
        rx.recv().await.unwrap(); // welcome
        (session, rx)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_notify_admins() {
        let (registry, bridge) = setup();
        let (admin, mut admin_rx) = connected(&registry, &bridge).await;
        registry
            .subscribe(admin.id, catalog::ADMIN_CONNECTIONS)
            .unwrap();

        let (watched, _watched_rx) = connected(&registry, &bridge).await;

        let frame = admin_rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["destination"], "/topic/admin/connections");
        assert_eq!(parsed["payload"]["event"], "CONNECTION");
        assert_eq!(parsed["payload"]["activeConnections"], 2);

        bridge.on_disconnect(watched.id);
        let frame = admin_rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["payload"]["event"], "DISCONNECTION");
        assert_eq!(parsed["payload"]["activeConnections"], 1);
    }

    #[tokio::test]
    async fn test_disconnect_after_sweep_is_silent() {
        let (registry, bridge) = setup();
        let (admin, mut admin_rx) = connected(&registry, &bridge).await;
        registry
            .subscribe(admin.id, catalog::ADMIN_CONNECTIONS)
            .unwrap();

        bridge.on_disconnect(Uuid::new_v4());
        assert!(admin_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_analytics_subscribe_gets_initial_data() {
        let (registry, bridge) = setup();
        let (session, mut rx) = connected(&registry, &bridge).await;

        bridge
            .on_subscribe(session.id, "/topic/analytics/dashboard")
            .unwrap();

        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "DATA_SYNC");
        assert_eq!(parsed["payload"]["dataType"], "INITIAL_DATA");
        assert!(session.is_subscribed("/topic/analytics/dashboard"));
    }

    #[tokio::test]
    async fn test_alerts_and_user_queue_categories() {
        let (registry, bridge) = setup();
        let (session, mut rx) = connected(&registry, &bridge).await;

        bridge.on_subscribe(session.id, "/topic/alerts").unwrap();
        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["payload"]["dataType"], "PENDING_ALERTS");

        let queue = catalog::user_queue(&session.id.to_string(), catalog::QUEUE_NOTIFICATIONS);
        bridge.on_subscribe(session.id, &queue).unwrap();
        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["payload"]["dataType"], "USER_DATA");
    }

    #[tokio::test]
    async fn test_unknown_category_subscribes_silently() {
        let (registry, bridge) = setup();
        let (session, mut rx) = connected(&registry, &bridge).await;

        bridge
            .on_subscribe(session.id, "/topic/orders/new")
            .unwrap();
        assert!(session.is_subscribed("/topic/orders/new"));
        assert!(rx.try_recv().is_err());

        bridge.on_unsubscribe(session.id, "/topic/orders/new");
        assert!(!session.is_subscribed("/topic/orders/new"));
    }
}
