//! Builder pattern for SessionTask construction

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::traits::{Reporter, RoutingPathSource, SessionProvider, TargetId, Transport};

use super::executor::SessionTask;

use std::sync::Arc;

/// Builder for creating SessionTask instances
///
/// # Example
/// ```ignore
/// let task = SessionTaskBuilder::new(0)
///     .target(TargetId(1234))
///     .provider(provider)
///     .transport(transport)
///     .routes(routes)
///     .reporter(aggregator)
///     .build()?;
/// ```
pub struct SessionTaskBuilder {
    index: usize,
    target: Option<TargetId>,
    provider: Option<Arc<dyn SessionProvider>>,
    transport: Option<Arc<dyn Transport>>,
    routes: Option<Arc<dyn RoutingPathSource>>,
    reporter: Option<Arc<dyn Reporter>>,
    config: SessionConfig,
}

impl SessionTaskBuilder {
    /// Create a new builder for session `index`
    pub fn new(index: usize) -> Self {
        Self {
            index,
            target: None,
            provider: None,
            transport: None,
            routes: None,
            reporter: None,
            config: SessionConfig::default(),
        }
    }

    /// Set the target identifier
    pub fn target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the session provider
    pub fn provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the routing path source
    pub fn routes(mut self, routes: Arc<dyn RoutingPathSource>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Set the status reporter
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the retry and keepalive policy
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the SessionTask
    ///
    /// # Errors
    /// Returns an error if any required field is missing or the policy is
    /// invalid.
    pub fn build(self) -> Result<SessionTask> {
        let target = self.target.ok_or(Error::MissingConfig("target"))?;
        let provider = self.provider.ok_or(Error::MissingConfig("provider"))?;
        let transport = self.transport.ok_or(Error::MissingConfig("transport"))?;
        let routes = self.routes.ok_or(Error::MissingConfig("routes"))?;
        let reporter = self.reporter.ok_or(Error::MissingConfig("reporter"))?;
        self.config.validate()?;

        Ok(SessionTask::new(
            self.index, target, provider, transport, routes, reporter, self.config,
        ))
    }
}
