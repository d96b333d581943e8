//! Periodic expiration sweep over the session registry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::message::builder;
use super::registry::SessionRegistry;
use super::session::SessionId;

/// Checks one session against the timeout policy.
///
/// The absolute limit is checked before the idle limit, so a session
/// exceeding both is reported as `"Session timeout"`. A session
/// exactly at a limit is not yet expired.
fn expiry_reason(
    age: Duration,
    idle: Duration,
    absolute: Duration,
    inactive: Duration,
) -> Option<&'static str> {
    if age > absolute {
        Some("Session timeout")
    } else if idle > inactive {
        Some("Inactivity timeout")
    } else {
        None
    }
}

/// Runs one sweep pass at the given instant, evicting expired sessions.
///
/// For each evicted session a best-effort expiration notice is queued
/// before removal. Returns the evicted session ids.
pub fn sweep_once(
    registry: &SessionRegistry,
    absolute: Duration,
    inactive: Duration,
    now: DateTime<Utc>,
) -> Vec<SessionId> {
    let mut evicted = Vec::new();
    for session in registry.all() {
        let Some(reason) = expiry_reason(session.age(now), session.idle_for(now), absolute, inactive)
        else {
            continue;
        };
        let notice = builder::expiration(&session.id.to_string(), reason);
        if let Err(err) = session.send_message(&notice) {
            debug!(session_id = %session.id, error = %err, "expiration notice not delivered");
        }
        registry.remove(session.id);
        info!(session_id = %session.id, reason, "session expired");
        evicted.push(session.id);
    }
    evicted
}

/// Background sweep loop. Exits when the shutdown channel fires.
pub async fn run_sweeper(
    registry: Arc<SessionRegistry>,
    absolute_minutes: i64,
    inactive_minutes: i64,
    interval_seconds: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let absolute = Duration::minutes(absolute_minutes);
    let inactive = Duration::minutes(inactive_minutes);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = sweep_once(&registry, absolute, inactive, Utc::now());
                if !evicted.is_empty() {
                    warn!(count = evicted.len(), "expiration sweep evicted sessions");
                }
            }
            _ = shutdown.recv() => {
                info!("expiration sweeper shutting down");
                return;
            }
        }
    }
}
