//! Per-connection session state.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use storegate_auth::{Principal, Role};
use storegate_core::error::AppError;
use storegate_core::result::AppResult;

use crate::message::GatewayMessage;

/// Opaque, transport-assigned connection identifier.
pub type SessionId = Uuid;

/// Identity attached to a session.
#[derive(Debug, Clone)]
pub struct Identity {
    /// User ID, absent for anonymous sessions.
    pub user_id: Option<Uuid>,
    /// Username, `"anonymous"` until authenticated.
    pub username: String,
    /// Role set resolved at authentication.
    pub roles: Vec<Role>,
}

impl Identity {
    /// The pre-authentication identity.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            username: "anonymous".to_string(),
            roles: Vec::new(),
        }
    }
}

impl From<Principal> for Identity {
    fn from(p: Principal) -> Self {
        Self {
            user_id: Some(p.user_id),
            username: p.username,
            roles: p.roles,
        }
    }
}

/// Server-side record of one live client connection.
///
/// Owned exclusively by the [`registry`](super::registry); handlers
/// never mutate session state directly, only through registry
/// operations.
#[derive(Debug)]
pub struct Session {
    /// Connection identifier.
    pub id: SessionId,
    /// Authenticated identity.
    pub identity: Identity,
    /// When the session was registered.
    pub created_at: DateTime<Utc>,
    /// Last inbound activity.
    last_activity: RwLock<DateTime<Utc>>,
    /// Subscribed destinations with their subscription timestamps.
    subscriptions: RwLock<HashMap<String, DateTime<Utc>>>,
    /// Arbitrary attribute bag.
    attributes: RwLock<HashMap<String, Value>>,
    /// Outbound frame sender.
    sender: mpsc::Sender<String>,
    /// Cancels in-flight dispatch work on disconnect.
    cancel: CancellationToken,
}

impl Session {
    /// Creates a session with the given identity and outbound sender.
    pub fn new(id: SessionId, identity: Identity, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            identity,
            created_at: now,
            last_activity: RwLock::new(now),
            subscriptions: RwLock::new(HashMap::new()),
            attributes: RwLock::new(HashMap::new()),
            sender,
            cancel: CancellationToken::new(),
        }
    }

    /// Queues a raw frame for this session's outbound writer.
    pub fn send_frame(&self, frame: String) -> AppResult<()> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::delivery(format!("Outbound buffer full for session {}", self.id))
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::delivery(format!("Outbound channel closed for session {}", self.id))
            }
        })
    }

    /// Serializes and queues a message for this session.
    pub fn send_message(&self, message: &GatewayMessage) -> AppResult<()> {
        let frame = serde_json::to_string(message)?;
        self.send_frame(frame)
    }

    /// Records inbound activity.
    pub fn touch(&self) {
        *self
            .last_activity
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }

    /// Last recorded activity.
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Session age relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Idle time relative to `now`.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity()
    }

    /// Records a subscription (registry use only).
    pub(crate) fn add_subscription(&self, destination: &str) {
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(destination.to_string(), Utc::now());
    }

    /// Removes a subscription (registry use only).
    pub(crate) fn remove_subscription(&self, destination: &str) {
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(destination);
    }

    /// Snapshot of subscribed destinations.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// When this session subscribed to `destination`, if it did.
    pub fn subscribed_at(&self, destination: &str) -> Option<DateTime<Utc>> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(destination)
            .copied()
    }

    /// Whether this session is subscribed to `destination`.
    pub fn is_subscribed(&self, destination: &str) -> bool {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(destination)
    }

    /// Sets an attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: Value) {
        self.attributes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value);
    }

    /// Reads an attribute.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Token cancelled when the session is removed.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageType;
    use serde_json::json;

    fn session(buffer: usize) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Session::new(Uuid::new_v4(), Identity::anonymous(), tx), rx)
    }

    #[tokio::test]
    async fn test_send_message_serializes() {
        let (session, mut rx) = session(4);
        let msg = GatewayMessage::new(MessageType::Alert, "/topic/alerts");
        session.send_message(&msg).unwrap();

        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "ALERT");
    }

    #[tokio::test]
    async fn test_full_buffer_is_a_delivery_error() {
        let (session, _rx) = session(1);
        session.send_frame("a".into()).unwrap();
        let err = session.send_frame("b".into()).unwrap_err();
        assert_eq!(err.kind, storegate_core::ErrorKind::Delivery);
    }

    #[test]
    fn test_attribute_bag() {
        let (session, _rx) = session(1);
        session.set_attribute("register", json!(7));
        assert_eq!(session.attribute("register"), Some(json!(7)));
        assert_eq!(session.attribute("missing"), None);
    }

    #[test]
    fn test_touch_moves_last_activity() {
        let (session, _rx) = session(1);
        let before = session.last_activity();
        std::thread::sleep(std::time::Duration::from_millis(5));
        session.touch();
        assert!(session.last_activity() > before);
    }
}
