//! Cooperative shutdown shared by the scheduler and every session task

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Outcome of a cancellable wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The full duration elapsed
    Elapsed,
    /// Shutdown fired first
    Cancelled,
}

/// Latched, cloneable shutdown flag
///
/// Once triggered it stays triggered; every clone observes it, including
/// clones taken after the trigger.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Shutdown requested");
        }
        self.token.cancel();
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration` unless shutdown fires first
    ///
    /// A signal that is already triggered returns `Cancelled` without
    /// sleeping.
    pub async fn sleep(&self, duration: Duration) -> Wait {
        tokio::select! {
            biased;

            _ = self.token.cancelled() => Wait::Cancelled,
            _ = tokio::time::sleep(duration) => Wait::Elapsed,
        }
    }
}

/// Owns the shutdown signal and the set of in-flight session tasks
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh signal
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the shared signal
    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.signal.trigger();
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.signal.is_triggered()
    }

    /// Spawn a task that [`ShutdownCoordinator::join`] will wait for
    pub fn spawn<F>(&self, task: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of tracked tasks that have not finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every tracked task has exited
    ///
    /// No further tasks may be spawned afterwards.
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("All session tasks exited");
    }

    /// Trigger shutdown on Ctrl+C, or SIGTERM on unix
    ///
    /// Returns when a signal arrives or the coordinator is triggered by
    /// other means.
    pub async fn listen_for_interrupt(&self) {
        tokio::select! {
            _ = self.signal.triggered() => {}
            _ = interrupt() => {
                tracing::info!("Received interrupt, initiating graceful shutdown...");
                self.trigger();
            }
        }
    }
}

#[cfg(unix)]
async fn interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for SIGTERM");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn interrupt() {
    ctrl_c().await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
