//! Builder pattern for Orchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RampConfig, RunConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::reporter::TracingReporter;
use crate::traits::{Reporter, RoutingPathSource, SessionProvider, Transport};

use super::aggregator::Aggregator;
use super::executor::Orchestrator;
use super::shutdown::ShutdownCoordinator;

/// Builder for creating an Orchestrator with proper configuration
///
/// Unless a custom reporter is given, session tasks report straight into
/// the orchestrator's aggregator.
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .sessions(500)
///     .batched(100, Duration::from_secs(30))
///     .provider(provider)
///     .transport(transport)
///     .routes(routes)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: RunConfig,
    provider: Option<Arc<dyn SessionProvider>>,
    transport: Option<Arc<dyn Transport>>,
    routes: Option<Arc<dyn RoutingPathSource>>,
    aggregator: Option<Arc<Aggregator>>,
    reporter: Option<Arc<dyn Reporter>>,
    shutdown: Option<ShutdownCoordinator>,
    verbose: bool,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            provider: None,
            transport: None,
            routes: None,
            aggregator: None,
            reporter: None,
            shutdown: None,
            verbose: false,
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of sessions
    pub fn sessions(mut self, total: usize) -> Self {
        self.config.total_sessions = total;
        self
    }

    /// Set the ramp-up mode
    pub fn ramp(mut self, ramp: RampConfig) -> Self {
        self.config.ramp = ramp;
        self
    }

    /// Ramp up in batches of `size`, pausing `delay` between them
    pub fn batched(mut self, size: usize, delay: Duration) -> Self {
        self.config = self.config.batched(size, delay);
        self
    }

    /// Set the per-session policy
    pub fn session_config(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
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

    /// Use an existing aggregator instead of creating one
    pub fn aggregator(mut self, aggregator: Arc<Aggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Report to `reporter` instead of the aggregator directly
    ///
    /// The caller is then responsible for feeding the aggregator, e.g. via
    /// [`crate::run_aggregation`].
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Share an existing shutdown coordinator
    pub fn shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Log every session transition
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator is not set, or if configuration
    /// validation fails.
    pub fn build(self) -> Result<Orchestrator> {
        let provider = self
            .provider
            .ok_or(Error::MissingConfig("provider"))?;

        let transport = self
            .transport
            .ok_or(Error::MissingConfig("transport"))?;

        let routes = self.routes.ok_or(Error::MissingConfig("routes"))?;

        self.config.validate()?;
        let plan = self.config.ramp_plan()?;

        let aggregator = self
            .aggregator
            .unwrap_or_else(|| Arc::new(Aggregator::new(self.config.total_sessions)));

        let sink = self
            .reporter
            .unwrap_or_else(|| Arc::clone(&aggregator) as Arc<dyn Reporter>);
        let reporter: Arc<dyn Reporter> = if self.verbose {
            Arc::new(TracingReporter::new(sink))
        } else {
            sink
        };

        Ok(Orchestrator {
            config: self.config,
            plan,
            provider,
            transport,
            routes,
            aggregator,
            reporter,
            shutdown: self.shutdown.unwrap_or_default(),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
