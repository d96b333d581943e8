//! Client frame codec.
//!
//! Every inbound text frame is one JSON object tagged with `frame`.
//! The connect frame has no wire form; connecting is the upgrade
//! itself.

use serde::Deserialize;

use storegate_auth::FrameKind;

use crate::message::GatewayMessage;

/// One inbound client frame.
#[derive(Debug, Deserialize)]
#[serde(tag = "frame", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Subscribe to a destination.
    Subscribe { destination: String },
    /// Drop a subscription.
    Unsubscribe { destination: String },
    /// Send an application message.
    Send { message: GatewayMessage },
    /// Liveness frame; refreshes the idle clock.
    Heartbeat,
    /// Orderly teardown.
    Disconnect,
}

impl ClientFrame {
    /// The frame kind, for authorization.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Subscribe { .. } => FrameKind::Subscribe,
            Self::Unsubscribe { .. } => FrameKind::Unsubscribe,
            Self::Send { .. } => FrameKind::Send,
            Self::Heartbeat => FrameKind::Heartbeat,
            Self::Disconnect => FrameKind::Disconnect,
        }
    }

    /// The destination the frame targets, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Subscribe { destination } | Self::Unsubscribe { destination } => {
                Some(destination)
            }
            Self::Send { message } => Some(&message.destination),
            Self::Heartbeat | Self::Disconnect => None,
        }
    }
}
