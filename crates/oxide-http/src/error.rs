//! Error types for server setup.

use thiserror::Error;

/// Setup-time server errors.
///
/// Request-time problems never show up here: a missing route becomes a
/// 404 response and a malformed body is decoded lossily.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    /// The port is zero, negative or out of range.
    #[error("invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(i32),

    /// The listener runtime could not provide a listener for the port.
    #[error("no listener available on port {0}")]
    ListenerUnavailable(u16),

    /// The listener rejected the route path.
    #[error("invalid route path: '{0}'")]
    InvalidRoutePath(String),

    /// A route path could not be compiled into a matcher.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
