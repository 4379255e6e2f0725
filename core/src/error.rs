//! Error types for swarm-bench-core

use thiserror::Error;

use crate::config::ConfigError;

/// Failure of a single session step
///
/// Every variant except [`SessionError::Cancelled`] consumes one unit of the
/// session's retry budget. Errors never escape the session task that raised
/// them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The routing path source has nothing to hand out
    #[error("no routing paths available")]
    RoutingPathExhausted,

    /// The session provider could not issue a credential
    #[error("credential acquisition failed: {0}")]
    CredentialAcquisitionFailed(String),

    /// The transport could not establish a connection
    #[error("dial failed: {0}")]
    DialFailed(String),

    /// A keepalive message could not be sent on an established connection
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Operator-requested shutdown
    #[error("cancelled by shutdown")]
    Cancelled,
}

impl SessionError {
    /// Create a credential acquisition error
    pub fn credential(message: impl Into<String>) -> Self {
        Self::CredentialAcquisitionFailed(message.into())
    }

    /// Create a dial error
    pub fn dial(message: impl Into<String>) -> Self {
        Self::DialFailed(message.into())
    }

    /// Create a send error
    pub fn send(message: impl Into<String>) -> Self {
        Self::SendFailed(message.into())
    }

    /// Whether this error is a genuine fault rather than a shutdown request
    pub fn is_fault(&self) -> bool {
        !matches!(self, SessionError::Cancelled)
    }
}

/// Run-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid run configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A builder was missing a required collaborator
    #[error("missing required field: {0}")]
    MissingConfig(&'static str),

    /// The session provider could not resolve the target
    #[error("failed to resolve target '{target}': {message}")]
    TargetResolution {
        /// Target name as given by the operator
        target: String,
        /// Provider-supplied reason
        message: String,
    },
}

impl Error {
    /// Create a target resolution error
    pub fn target_resolution(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TargetResolution {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T, E = Error> = std::result::Result<T, E>;
