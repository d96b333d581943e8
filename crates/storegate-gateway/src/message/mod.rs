//! Wire message model: envelope, typed enumerations, destination
//! catalog, builders, and structural validation.

pub mod builder;
pub mod catalog;
pub mod envelope;
pub mod types;
pub mod validator;

pub use envelope::GatewayMessage;
pub use types::{MessageStatus, MessageType, Priority};
pub use validator::{ValidationReport, validate};
