//! Real-time gateway configuration.

use serde::{Deserialize, Serialize};

/// Session, dispatch, and transport settings for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Absolute session lifetime in minutes.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: i64,
    /// Idle timeout in minutes before a session is evicted.
    #[serde(default = "default_inactive_timeout")]
    pub inactive_timeout_minutes: i64,
    /// Interval between expiration sweep passes, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Interval between heartbeat broadcasts, in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Per-session outbound channel capacity (frames).
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_frames: usize,
    /// Number of concurrent dispatch workers for handler execution.
    #[serde(default = "default_dispatch_workers")]
    pub dispatch_workers: usize,
    /// Maximum inbound frame size at the transport level, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Maximum outbound buffer size, in bytes.
    #[serde(default = "default_max_outbound_bytes")]
    pub max_outbound_bytes: usize,
    /// Outbound send timeout in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
    /// Handshake-to-first-message timeout in seconds.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
    /// Retention window for delivery bookkeeping, in seconds.
    #[serde(default = "default_update_retention")]
    pub update_retention_seconds: i64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: default_session_timeout(),
            inactive_timeout_minutes: default_inactive_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            outbound_buffer_frames: default_outbound_buffer(),
            dispatch_workers: default_dispatch_workers(),
            max_frame_bytes: default_max_frame_bytes(),
            max_outbound_bytes: default_max_outbound_bytes(),
            send_timeout_seconds: default_send_timeout(),
            handshake_timeout_seconds: default_handshake_timeout(),
            update_retention_seconds: default_update_retention(),
        }
    }
}

fn default_session_timeout() -> i64 {
    30
}

fn default_inactive_timeout() -> i64 {
    15
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_dispatch_workers() -> usize {
    10
}

fn default_max_frame_bytes() -> usize {
    128 * 1024
}

fn default_max_outbound_bytes() -> usize {
    512 * 1024
}

fn default_send_timeout() -> u64 {
    20
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_update_retention() -> i64 {
    300
}
