//! Unified application error types for StoreGate.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The handshake credential was missing or invalid. Terminal: no session.
    ConnectionRejected,
    /// A single frame failed the destination policy check. The session survives.
    AuthorizationDenied,
    /// Structural message validation failed.
    Validation,
    /// A pipeline stage or message handler failed.
    Processing,
    /// Fan-out or point-to-point delivery to a subscriber failed.
    Delivery,
    /// The session was evicted by the expiration sweep.
    SessionExpired,
    /// A conflict occurred (duplicate session id, concurrent registration).
    Conflict,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRejected => write!(f, "CONNECTION_REJECTED"),
            Self::AuthorizationDenied => write!(f, "AUTHORIZATION_DENIED"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Delivery => write!(f, "DELIVERY"),
            Self::SessionExpired => write!(f, "SESSION_EXPIRED"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout StoreGate.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. Everything except
/// [`ErrorKind::ConnectionRejected`] is session-local and recoverable; a
/// connection is never torn down as a side effect of one bad message.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection-rejected error (handshake refused).
    pub fn connection_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionRejected, message)
    }

    /// Create a per-frame authorization-denied error.
    pub fn authorization_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationDenied, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a processing error.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Processing, message)
    }

    /// Create a delivery error.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Delivery, message)
    }

    /// Create a session-expired error.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionExpired, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Short machine-readable code carried in error envelopes sent to clients.
    pub fn code(&self) -> &'static str {
        match self.kind {
            ErrorKind::ConnectionRejected => "CONNECTION_REJECTED",
            ErrorKind::AuthorizationDenied => "FORBIDDEN",
            ErrorKind::Validation => "VALIDATION_FAILED",
            ErrorKind::Processing => "PROCESSING_FAILED",
            ErrorKind::Delivery => "DELIVERY_FAILED",
            ErrorKind::SessionExpired => "SESSION_EXPIRED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Serialization => "SERIALIZATION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
