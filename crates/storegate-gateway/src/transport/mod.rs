//! WebSocket transport: upgrade handler and the client frame codec.

pub mod frame;
pub mod ws;

pub use frame::ClientFrame;
pub use ws::{WsQuery, router, ws_handler};
