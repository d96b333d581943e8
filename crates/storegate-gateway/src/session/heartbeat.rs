//! Periodic liveness broadcast to every live session.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::message::builder;
use super::registry::SessionRegistry;

/// Sends one heartbeat frame to every live session.
///
/// Per-session failures are logged and do not affect other sessions;
/// the sweep handles dead connections.
pub fn broadcast_heartbeat(registry: &SessionRegistry) -> usize {
    let frame = builder::heartbeat();
    let mut delivered = 0;
    for session in registry.all() {
        match session.send_message(&frame) {
            Ok(()) => delivered += 1,
            Err(err) => {
                debug!(session_id = %session.id, error = %err, "heartbeat not delivered");
            }
        }
    }
    delivered
}

/// Background heartbeat loop. Exits when the shutdown channel fires.
pub async fn run_heartbeat(
    registry: Arc<SessionRegistry>,
    interval_seconds: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let delivered = broadcast_heartbeat(&registry);
                debug!(delivered, "heartbeat broadcast");
            }
            _ = shutdown.recv() => {
                info!("heartbeat loop shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::session::{Identity, Session};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_heartbeat_reaches_each_session() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (tx, mut rx) = mpsc::channel(8);
            let session = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
            registry.register(session).unwrap();
            rx.recv().await.unwrap(); // welcome
            receivers.push(rx);
        }

        assert_eq!(broadcast_heartbeat(&registry), 3);
        for rx in receivers.iter_mut() {
            let frame = rx.recv().await.unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(parsed["destination"], "/topic/heartbeat");
        }
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_broadcast() {
        let registry = SessionRegistry::new();

        let (full_tx, _full_rx) = mpsc::channel(1);
        let stuck = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), full_tx));
        registry.register(stuck).unwrap(); // welcome fills the buffer

        let (tx, mut rx) = mpsc::channel(8);
        let healthy = Arc::new(Session::new(Uuid::new_v4(), Identity::anonymous(), tx));
        registry.register(healthy).unwrap();
        rx.recv().await.unwrap(); // welcome

        assert_eq!(broadcast_heartbeat(&registry), 1);
        assert!(rx.recv().await.is_some());
    }
}
