//! Collaborator traits consumed by the session task
//!
//! These traits are defined in core so that concrete providers, transports
//! and routing sources can live in their own crates (vendors/) without
//! circular dependencies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::message::KeepaliveMessage;
use crate::session::SessionUpdate;

// ============================================================================
// Identifiers
// ============================================================================

/// Internal identifier a target name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound routing path (proxy) a session's traffic goes through
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RoutingPath {
    /// Proxy host
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Proxy username
    pub username: String,
    /// Proxy password
    pub password: String,
}

impl RoutingPath {
    /// Create a routing path
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Proxy URL including credentials
    pub fn url(&self) -> String {
        format!(
            "http://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

impl fmt::Display for RoutingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for RoutingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingPath")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-session access token issued by a [`SessionProvider`]
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ============================================================================
// Session Provider
// ============================================================================

/// Resolves targets and issues per-session credentials
///
/// Implementations apply their own internal retry policy; an `Err` here is
/// final for the current dial attempt.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Provider identifier
    fn name(&self) -> &str;

    /// Resolve an operator-supplied target name to its internal identifier
    async fn resolve_target(&self, name: &str) -> Result<TargetId>;

    /// Issue a credential bound to `path`
    async fn acquire_credential(&self, path: &RoutingPath) -> Result<Credential, SessionError>;
}

// ============================================================================
// Transport
// ============================================================================

/// Dials persistent duplex connections to the remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport identifier
    fn name(&self) -> &str;

    /// Establish a connection through `path` using `credential`
    async fn dial(
        &self,
        credential: &Credential,
        path: &RoutingPath,
    ) -> Result<Box<dyn Connection>, SessionError>;
}

/// An established connection owned by exactly one session task
///
/// Implementations must release the underlying resource on drop as well as
/// on [`Connection::close`], so a connection is never leaked even when its
/// task unwinds.
#[async_trait]
pub trait Connection: Send {
    /// Send one structured message
    ///
    /// Failures are reported as [`SessionError::SendFailed`].
    async fn send(&mut self, message: &KeepaliveMessage) -> Result<(), SessionError>;

    /// Close the connection; calling it more than once is a no-op
    async fn close(&mut self);
}

// ============================================================================
// Routing Path Source
// ============================================================================

/// Read-only source of routing paths
pub trait RoutingPathSource: Send + Sync {
    /// Pick a routing path at random
    ///
    /// Returns [`SessionError::RoutingPathExhausted`] when the source is empty.
    fn select(&self) -> Result<RoutingPath, SessionError>;

    /// Number of available paths
    fn len(&self) -> usize;

    /// Whether no paths are available
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Sink for session status changes
///
/// The session task reports every transition here; whether that ends up in
/// the aggregator, a log, or a queue is the sink's business.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Deliver one status change
    async fn report(&self, update: SessionUpdate);
}

#[async_trait]
impl<R> Reporter for Arc<R>
where
    R: Reporter + ?Sized,
{
    async fn report(&self, update: SessionUpdate) {
        (**self).report(update).await
    }
}
