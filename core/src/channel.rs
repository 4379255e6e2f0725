//! Queue-based reporting: session tasks -> one aggregation task

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::orchestrator::Aggregator;
use crate::session::SessionUpdate;
use crate::traits::Reporter;

/// Channel buffer configuration for session reporting
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Update channel buffer size (session tasks -> aggregator)
    pub report_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            report_buffer: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom report buffer size
    pub fn with_report_buffer(mut self, size: usize) -> Self {
        self.report_buffer = size;
        self
    }
}

/// Reporter that forwards updates over a bounded queue
///
/// Pair it with [`run_aggregation`] so that only one task ever touches the
/// aggregator.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<SessionUpdate>,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its queue
    pub fn new(config: &ChannelConfig) -> (Self, mpsc::Receiver<SessionUpdate>) {
        let (tx, rx) = mpsc::channel(config.report_buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Reporter for ChannelReporter {
    async fn report(&self, update: SessionUpdate) {
        if self.tx.send(update).await.is_err() {
            tracing::debug!("Report channel closed, dropping update");
        }
    }
}

/// Drain `rx` into `aggregator` until every sender is dropped
///
/// Returns the number of updates applied.
pub async fn run_aggregation(
    mut rx: mpsc::Receiver<SessionUpdate>,
    aggregator: Arc<Aggregator>,
) -> usize {
    let mut applied = 0;
    while let Some(update) = rx.recv().await {
        aggregator.record(update);
        applied += 1;
    }
    tracing::debug!(applied, "Aggregation task finished");
    applied
}
