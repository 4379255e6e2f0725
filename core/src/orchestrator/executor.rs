//! Orchestrator execution logic

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;

use crate::config::RunConfig;
use crate::error::Result;
use crate::session::{SessionState, SessionStatus, SessionUpdate};
use crate::traits::{Reporter, RoutingPathSource, SessionProvider, TargetId, Transport};
use crate::worker::SessionTask;

use super::aggregator::{Aggregator, StatsSnapshot};
use super::ramp::{schedule, RampPlan};
use super::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Terminal tallies collected from session tasks as they exit
#[derive(Debug, Default)]
struct SessionTally {
    failed: AtomicUsize,
    cancelled: AtomicUsize,
    kept_alive: AtomicUsize,
    panicked: AtomicUsize,
}

impl SessionTally {
    fn record(&self, state: &SessionState) {
        match state.status {
            SessionStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            SessionStatus::Cancelled if state.has_connected() => {
                self.kept_alive.fetch_add(1, Ordering::Relaxed);
            }
            SessionStatus::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

/// Error recorded for a session whose task panicked
const PANIC_ERROR: &str = "session task panicked";

/// Forwards updates while remembering the attempt count last reported
///
/// Lets the launcher report a terminal status for a task that panicked.
struct LastAttempt {
    inner: Arc<dyn Reporter>,
    attempts: AtomicU32,
}

impl LastAttempt {
    fn new(inner: Arc<dyn Reporter>) -> Self {
        Self {
            inner,
            attempts: AtomicU32::new(0),
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Reporter for LastAttempt {
    async fn report(&self, update: SessionUpdate) {
        self.attempts.store(update.attempts, Ordering::Relaxed);
        self.inner.report(update).await;
    }
}

/// Result of one complete run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Sessions the scheduler launched
    pub launched: usize,

    /// Whether shutdown stopped the ramp-up before every session launched
    pub ramp_interrupted: bool,

    /// Sessions that ended `Failed`
    pub failed: usize,

    /// Sessions cancelled before they ever connected
    pub cancelled: usize,

    /// Sessions still in keepalive when shutdown arrived
    pub kept_alive: usize,

    /// Session tasks that panicked; the aggregate records them as `Failed`
    pub panicked: usize,

    /// Aggregate state after the join barrier
    pub snapshot: StatsSnapshot,

    /// Wall time from launch to join
    pub elapsed: Duration,
}

impl RunSummary {
    /// Success rate from the final snapshot
    pub fn success_rate(&self) -> f64 {
        self.snapshot.stats.success_rate
    }
}

/// Orchestrator manages the run lifecycle
///
/// Responsible for ramping up session tasks, coordinating shutdown,
/// and waiting for every task to exit. One orchestrator drives one run.
pub struct Orchestrator {
    /// Run configuration
    pub(crate) config: RunConfig,

    /// Ramp plan derived from the configuration
    pub(crate) plan: RampPlan,

    /// Session provider (shared across session tasks)
    pub(crate) provider: Arc<dyn SessionProvider>,

    /// Transport (shared across session tasks)
    pub(crate) transport: Arc<dyn Transport>,

    /// Routing path source (shared, read-only)
    pub(crate) routes: Arc<dyn RoutingPathSource>,

    /// Statistics store read by presentation
    pub(crate) aggregator: Arc<Aggregator>,

    /// Sink every session task reports to
    pub(crate) reporter: Arc<dyn Reporter>,

    /// Shutdown signal and join barrier
    pub(crate) shutdown: ShutdownCoordinator,
}

impl Orchestrator {
    /// Get the shared aggregator
    pub fn aggregator(&self) -> Arc<Aggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Get a handle on the shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown of the scheduler and all session tasks
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Resolve an operator-supplied target name
    pub async fn resolve_target(&self, name: &str) -> Result<TargetId> {
        let target = self.provider.resolve_target(name).await?;
        tracing::info!(target_name = name, target_id = %target, "Resolved target");
        Ok(target)
    }

    /// Run every session against `target`
    ///
    /// Ramps sessions up per the plan, then blocks until the join barrier
    /// resolves: every launched session has failed or observed shutdown.
    pub async fn run(&self, target: TargetId) -> Result<RunSummary> {
        let start = Instant::now();
        let signal = self.shutdown.signal();
        let tally = Arc::new(SessionTally::default());

        tracing::info!(
            sessions = self.plan.total(),
            target_id = %target,
            ramp = ?self.config.ramp,
            provider = self.provider.name(),
            transport = self.transport.name(),
            routes = self.routes.len(),
            "Starting run"
        );

        let outcome = schedule(&self.plan, &signal, |index| {
            self.launch(index, target, &signal, &tally)
        })
        .await;

        tracing::info!(
            launched = outcome.launched,
            interrupted = outcome.interrupted,
            "Ramp-up finished, waiting for sessions"
        );
        self.shutdown.join().await;

        let snapshot = self.aggregator.snapshot();
        let summary = RunSummary {
            launched: outcome.launched,
            ramp_interrupted: outcome.interrupted,
            failed: tally.failed.load(Ordering::Relaxed),
            cancelled: tally.cancelled.load(Ordering::Relaxed),
            kept_alive: tally.kept_alive.load(Ordering::Relaxed),
            panicked: tally.panicked.load(Ordering::Relaxed),
            snapshot,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            elapsed_secs = summary.elapsed.as_secs_f64(),
            launched = summary.launched,
            connected = summary.snapshot.stats.counts.connected,
            failed = summary.failed,
            cancelled = summary.cancelled,
            success_rate = summary.success_rate(),
            "Run completed"
        );

        Ok(summary)
    }

    /// Resolve `name`, then run against it
    pub async fn run_target(&self, name: &str) -> Result<RunSummary> {
        let target = self.resolve_target(name).await?;
        self.run(target).await
    }

    /// Run with Ctrl+C / SIGTERM handling
    ///
    /// Automatically triggers graceful shutdown on interrupt.
    pub async fn run_with_signal_handling(&self, target: TargetId) -> Result<RunSummary> {
        self.run_until(target, None).await
    }

    /// Run until interrupted or, when given, until `timeout` elapses
    ///
    /// Either event triggers the same graceful shutdown; the run then drains
    /// through the join barrier as usual.
    pub async fn run_until(&self, target: TargetId, timeout: Option<Duration>) -> Result<RunSummary> {
        let coordinator = self.shutdown.clone();

        // Spawn signal handler task
        let signal_handle = tokio::spawn(async move { coordinator.listen_for_interrupt().await });

        let result = match timeout {
            Some(timeout) => self.run_with_timeout(target, timeout).await,
            None => self.run(target).await,
        };

        // Abort signal handler if still running
        signal_handle.abort();

        result
    }

    /// Run with a timeout
    ///
    /// Automatically triggers shutdown when the timeout is reached.
    pub async fn run_with_timeout(&self, target: TargetId, timeout: Duration) -> Result<RunSummary> {
        let signal = self.shutdown.signal();

        let timeout_handle = tokio::spawn(async move {
            if signal.sleep(timeout).await == super::Wait::Elapsed {
                tracing::info!("Timeout reached, initiating shutdown...");
                signal.trigger();
            }
        });

        let result = self.run(target).await;

        timeout_handle.abort();

        result
    }

    /// Spawn one session task onto the join barrier
    fn launch(
        &self,
        index: usize,
        target: TargetId,
        signal: &ShutdownSignal,
        tally: &Arc<SessionTally>,
    ) {
        let reporter = Arc::new(LastAttempt::new(Arc::clone(&self.reporter)));
        let task = SessionTask::new(
            index,
            target,
            Arc::clone(&self.provider),
            Arc::clone(&self.transport),
            Arc::clone(&self.routes),
            reporter.clone(),
            self.config.session.clone(),
        );
        let signal = signal.clone();
        let tally = Arc::clone(tally);

        self.shutdown.spawn(async move {
            match AssertUnwindSafe(task.run(signal)).catch_unwind().await {
                Ok(state) => tally.record(&state),
                Err(_) => {
                    tally.panicked.fetch_add(1, Ordering::Relaxed);
                    let attempts = reporter.attempts();
                    tracing::error!(session = index, attempts, "Session task panicked");
                    // The task is gone; its last reported status must not outlive it.
                    reporter
                        .report(
                            SessionUpdate::new(index, SessionStatus::Failed, attempts)
                                .with_error(PANIC_ERROR),
                        )
                        .await;
                }
            }
        });
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("transport", &self.transport.name())
            .field("routes", &self.routes.len())
            .finish()
    }
}
