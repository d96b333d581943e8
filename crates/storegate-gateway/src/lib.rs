//! # storegate-gateway
//!
//! Real-time session and messaging gateway for StoreGate. Provides:
//!
//! - Typed wire messages with structural validation
//! - An ordered, pluggable processing pipeline
//! - Session registry with subscription tracking, expiration sweep,
//!   and heartbeat broadcast
//! - Type-based dispatch with bounded async handler execution
//! - Topic fan-out and per-user queue delivery with error containment
//! - A lifecycle bridge translating transport events into registry and
//!   notification calls
//! - An axum WebSocket transport with per-frame authorization

pub mod bridge;
pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod message;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use bridge::LifecycleBridge;
pub use delivery::DeliveryService;
pub use dispatch::{MessageDispatcher, MessageHandler};
pub use engine::GatewayEngine;
pub use message::GatewayMessage;
pub use pipeline::Pipeline;
pub use session::{Identity, Session, SessionId, SessionRegistry};
