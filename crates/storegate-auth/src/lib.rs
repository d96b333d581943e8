//! # storegate-auth
//!
//! Authentication and authorization for the StoreGate gateway:
//!
//! - JWT access-token claims, signing, and validation
//! - Staff role enumeration
//! - Destination policy table (path-prefix → required roles)
//! - Per-frame gatekeeper used by the transport layer

pub mod gatekeeper;
pub mod jwt;
pub mod policy;
pub mod role;

pub use gatekeeper::{FrameKind, Gatekeeper, Principal};
pub use jwt::{Claims, JwtCodec};
pub use policy::PolicyTable;
pub use role::Role;
