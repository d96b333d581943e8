//! Session lifecycle: per-connection state, the registry owning it,
//! and the timer-driven expiration sweep and heartbeat broadcast.

pub mod heartbeat;
pub mod registry;
pub mod session;
pub mod sweeper;

pub use registry::SessionRegistry;
pub use session::{Identity, Session, SessionId};
