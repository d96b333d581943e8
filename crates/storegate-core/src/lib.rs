//! # storegate-core
//!
//! Shared foundation for the StoreGate real-time gateway:
//!
//! - Unified error type ([`error::AppError`]) and result alias
//! - Configuration schemas loaded from TOML + environment overrides

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
