//! Logging decorator for reporters

use async_trait::async_trait;

use crate::session::{SessionStatus, SessionUpdate};
use crate::traits::Reporter;

/// Logs every session transition, then forwards it to `inner`
///
/// Used in no-dashboard mode so the same session task can drive either
/// presentation style.
#[derive(Debug, Clone)]
pub struct TracingReporter<R> {
    inner: R,
}

impl<R> TracingReporter<R> {
    /// Wrap `inner`
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// The wrapped reporter
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Reporter> Reporter for TracingReporter<R> {
    async fn report(&self, update: SessionUpdate) {
        let session = update.index + 1;
        let attempt = update.attempts;
        let error = update.last_error.as_deref().unwrap_or("");

        match update.status {
            SessionStatus::Idle => {}
            SessionStatus::Connecting => {
                tracing::info!(session, attempt, "Session connecting");
            }
            SessionStatus::Connected => {
                tracing::info!(session, attempt, "Session connected");
            }
            SessionStatus::Retrying => {
                tracing::warn!(session, attempt, error, "Session attempt failed, retrying");
            }
            SessionStatus::Failed => {
                tracing::error!(session, attempt, error, "Session failed");
            }
            SessionStatus::Cancelled => {
                tracing::info!(session, attempt, "Session cancelled");
            }
        }

        self.inner.report(update).await
    }
}
