//! The session registry: single owner of live sessions and the
//! destination subscription index.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use storegate_core::error::AppError;
use storegate_core::result::AppResult;

use crate::message::builder;
use super::session::{Session, SessionId};

/// Registry of live sessions, keyed by session id, with a reverse
/// index from destination to subscriber set.
///
/// Every external mutation of session membership or subscriptions goes
/// through here so the two maps stay consistent.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    /// destination -> subscribed session ids
    subscribers: DashMap<String, HashSet<SessionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and sends it the welcome message.
    ///
    /// Fails with a conflict if the id is already present; the existing
    /// session is left untouched. The welcome send is best effort.
    pub fn register(&self, session: Arc<Session>) -> AppResult<()> {
        let id = session.id;
        match self.sessions.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(AppError::conflict(format!(
                    "Session {id} is already registered"
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&session));
            }
        }
        info!(session_id = %id, username = %session.identity.username, "session registered");

        let welcome = builder::welcome(&id.to_string(), &session.identity.username);
        if let Err(err) = session.send_message(&welcome) {
            warn!(session_id = %id, error = %err, "failed to deliver welcome message");
        }
        Ok(())
    }

    /// Removes a session, cancels its in-flight work, and drops every
    /// subscription it held. Idempotent.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(&id)?;
        session.cancellation_token().cancel();
        for destination in session.subscriptions() {
            self.drop_subscriber(&destination, id);
        }
        info!(session_id = %id, "session removed");
        Some(session)
    }

    /// Records inbound activity for the session, if it is still live.
    pub fn touch(&self, id: SessionId) {
        if let Some(session) = self.sessions.get(&id) {
            session.touch();
        }
    }

    /// Looks up a live session.
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(&s))
    }

    /// Subscribes a session to a destination. Errs if the session is
    /// not registered; re-subscribing is a no-op.
    pub fn subscribe(&self, id: SessionId, destination: &str) -> AppResult<()> {
        let session = self
            .get(id)
            .ok_or_else(|| AppError::conflict(format!("Session {id} is not registered")))?;
        session.add_subscription(destination);
        self.subscribers
            .entry(destination.to_string())
            .or_default()
            .insert(id);
        debug!(session_id = %id, destination, "subscribed");
        Ok(())
    }

    /// Unsubscribes a session from a destination. Idempotent.
    pub fn unsubscribe(&self, id: SessionId, destination: &str) {
        if let Some(session) = self.get(id) {
            session.remove_subscription(destination);
        }
        self.drop_subscriber(destination, id);
        debug!(session_id = %id, destination, "unsubscribed");
    }

    fn drop_subscriber(&self, destination: &str, id: SessionId) {
        if let Some(mut entry) = self.subscribers.get_mut(destination) {
            entry.remove(&id);
            if entry.is_empty() {
                drop(entry);
                // Remove only if still empty; a concurrent subscribe wins.
                self.subscribers
                    .remove_if(destination, |_, set| set.is_empty());
            }
        }
    }

    /// Live sessions subscribed to `destination`.
    pub fn sessions_for(&self, destination: &str) -> Vec<Arc<Session>> {
        let Some(ids) = self.subscribers.get(destination) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Live sessions authenticated as `username`.
    pub fn sessions_for_user(&self, username: &str) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|s| s.identity.username == username)
            .map(|s| Arc::clone(&s))
            .collect()
    }

    /// Snapshot of all live sessions.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| Arc::clone(&s)).collect()
    }

    /// Count of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session::Identity;
    use storegate_core::ErrorKind;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn make_session(registry: &SessionRegistry) -> (Arc<Session>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let session = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
        registry.register(Arc::clone(&session)).unwrap();
        (session, rx)
    }

    #[tokio::test]
    async fn test_register_sends_welcome() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = make_session(&registry);

        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["destination"], "/user/queue/welcome");
        assert_eq!(parsed["payload"]["sessionId"], session.id.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_register_is_a_conflict() {
        let registry = SessionRegistry::new();
        let (session, _rx) = make_session(&registry);
        let err = registry.register(Arc::clone(&session)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_cleans_subscriptions() {
        let registry = SessionRegistry::new();
        let (session, _rx) = make_session(&registry);
        registry.subscribe(session.id, "/topic/alerts").unwrap();
        assert_eq!(registry.sessions_for("/topic/alerts").len(), 1);

        assert!(registry.remove(session.id).is_some());
        assert!(registry.remove(session.id).is_none());
        assert!(registry.sessions_for("/topic/alerts").is_empty());
        assert!(session.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe_read_after_write() {
        let registry = SessionRegistry::new();
        let (session, _rx) = make_session(&registry);

        registry.subscribe(session.id, "/topic/orders/new").unwrap();
        assert!(session.is_subscribed("/topic/orders/new"));
        assert_eq!(registry.sessions_for("/topic/orders/new").len(), 1);

        registry.unsubscribe(session.id, "/topic/orders/new");
        assert!(!session.is_subscribed("/topic/orders/new"));
        assert!(registry.sessions_for("/topic/orders/new").is_empty());

        // Idempotent
        registry.unsubscribe(session.id, "/topic/orders/new");
    }

    #[tokio::test]
    async fn test_subscribe_unknown_session_fails() {
        let registry = SessionRegistry::new();
        let err = registry.subscribe(Uuid::new_v4(), "/topic/alerts").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_sessions_for_user() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let identity = Identity {
            user_id: Some(Uuid::new_v4()),
            username: "svendsen".to_string(),
            roles: Vec::new(),
        };
        let session = Arc::new(Session::new(Uuid::new_v4(), identity, tx));
        registry.register(session).unwrap();

        assert_eq!(registry.sessions_for_user("svendsen").len(), 1);
        assert!(registry.sessions_for_user("nobody").is_empty());
    }
}
