//! Session task state machine

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::message::KeepaliveMessage;
use crate::orchestrator::{ShutdownSignal, Wait};
use crate::session::SessionState;
use crate::traits::{Connection, Reporter, RoutingPathSource, SessionProvider, TargetId, Transport};

use super::jitter::Jitter;

use std::sync::Arc;

/// Drives one session: connect -> retry with backoff -> keepalive
///
/// A session task owns its [`SessionState`] and its connection outright;
/// the rest of the world only sees the updates it hands to its reporter.
pub struct SessionTask {
    /// Stable session index
    index: usize,

    /// Internal identifier of the target
    target: TargetId,

    /// Credential issuer (shared across sessions via Arc)
    provider: Arc<dyn SessionProvider>,

    /// Connection dialer (shared across sessions via Arc)
    transport: Arc<dyn Transport>,

    /// Routing path pool (read-only, shared)
    routes: Arc<dyn RoutingPathSource>,

    /// Sink for status transitions
    reporter: Arc<dyn Reporter>,

    /// Retry budget, delays and dial timeout
    config: SessionConfig,

    /// Per-session delay generator
    jitter: Jitter,
}

impl SessionTask {
    /// Create a new session task
    ///
    /// Use `SessionTaskBuilder` for a more ergonomic construction.
    pub fn new(
        index: usize,
        target: TargetId,
        provider: Arc<dyn SessionProvider>,
        transport: Arc<dyn Transport>,
        routes: Arc<dyn RoutingPathSource>,
        reporter: Arc<dyn Reporter>,
        config: SessionConfig,
    ) -> Self {
        let jitter = Jitter::for_session(config.seed, index);
        Self {
            index,
            target,
            provider,
            transport,
            routes,
            reporter,
            config,
            jitter,
        }
    }

    /// Run the session until it reaches a terminal state
    ///
    /// Returns the final state: `Failed`, `Cancelled`, or `Cancelled` after
    /// having connected (the aggregate keeps such sessions at `Connected`).
    pub async fn run(mut self, signal: ShutdownSignal) -> SessionState {
        let mut state = SessionState::new(self.index);
        tracing::debug!(session = self.index, "Session task started");

        if let Some(mut conn) = self.connect(&mut state, &signal).await {
            state.mark_connected();
            self.report(&state).await;

            self.keepalive(&mut state, conn.as_mut(), &signal).await;
            conn.close().await;
        }

        tracing::debug!(
            session = self.index,
            status = %state.status,
            attempts = state.attempts,
            "Session task finished"
        );
        state
    }

    /// Dial until connected, out of attempts, or cancelled
    async fn connect(
        &mut self,
        state: &mut SessionState,
        signal: &ShutdownSignal,
    ) -> Option<Box<dyn Connection>> {
        loop {
            if signal.is_triggered() {
                self.cancel(state).await;
                return None;
            }

            state.begin_attempt();
            self.report(state).await;

            let err = match self.establish().await {
                Ok(conn) => return Some(conn),
                Err(err) => err,
            };

            if state.attempts >= self.config.max_attempts {
                tracing::debug!(
                    session = self.index,
                    attempts = state.attempts,
                    error = %err,
                    "Retry budget exhausted"
                );
                state.mark_failed(&err);
                self.report(state).await;
                return None;
            }

            state.mark_retrying(&err);
            self.report(state).await;

            let backoff = self.jitter.sample(&self.config.retry_delay);
            tracing::debug!(
                session = self.index,
                attempt = state.attempts,
                backoff_ms = backoff.as_millis() as u64,
                "Backing off before retry"
            );
            if signal.sleep(backoff).await == Wait::Cancelled {
                self.cancel(state).await;
                return None;
            }
        }
    }

    /// One credential + dial step, bounded by the dial timeout
    async fn establish(&self) -> Result<Box<dyn Connection>, SessionError> {
        let path = self.routes.select()?;

        let step = async {
            let credential = self.provider.acquire_credential(&path).await?;
            self.transport.dial(&credential, &path).await
        };

        match tokio::time::timeout(self.config.dial_timeout(), step).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::dial(format!(
                "timed out after {}ms via {}",
                self.config.dial_timeout_ms, path
            ))),
        }
    }

    /// Alternate handshake and ping until a send fails or shutdown fires
    ///
    /// Cancellation here is not reported, so the aggregate keeps the session
    /// at `Connected`.
    async fn keepalive(
        &mut self,
        state: &mut SessionState,
        conn: &mut dyn Connection,
        signal: &ShutdownSignal,
    ) {
        let mut iteration: u64 = 0;

        loop {
            if signal.is_triggered() {
                state.mark_cancelled();
                return;
            }

            iteration += 1;
            let message = KeepaliveMessage::for_iteration(iteration, self.target);
            if let Err(err) = conn.send(&message).await {
                tracing::debug!(
                    session = self.index,
                    iteration,
                    error = %err,
                    "Keepalive send failed"
                );
                state.mark_failed(&err);
                self.report(state).await;
                return;
            }
            tracing::trace!(session = self.index, iteration, kind = message.kind(), "Keepalive sent");

            let interval = self.jitter.sample(&self.config.keepalive_interval);
            if signal.sleep(interval).await == Wait::Cancelled {
                state.mark_cancelled();
                return;
            }
        }
    }

    async fn cancel(&self, state: &mut SessionState) {
        state.mark_cancelled();
        state.last_error = Some(SessionError::Cancelled.to_string());
        self.report(state).await;
    }

    async fn report(&self, state: &SessionState) {
        self.reporter.report(state.update()).await;
    }

    /// Get the session index
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Debug for SessionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTask")
            .field("index", &self.index)
            .field("target", &self.target)
            .field("provider", &self.provider.name())
            .field("transport", &self.transport.name())
            .field("routes", &self.routes.len())
            .field("config", &self.config)
            .finish()
    }
}
