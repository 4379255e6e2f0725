//! Periodic log-line presentation for no-dashboard runs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use swarm_bench_core::{AggregateStats, Aggregator, ShutdownSignal, StatusCounts};

use crate::format::format_runtime;

/// Log a one-line summary every `interval` while the counts keep changing
///
/// Returns once `stop` fires.
pub async fn run_log_presenter(aggregator: Arc<Aggregator>, stop: ShutdownSignal, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last: Option<(StatusCounts, u64)> = None;

    loop {
        tokio::select! {
            biased;

            _ = stop.triggered() => break,
            _ = ticker.tick() => {
                let stats = aggregator.stats();
                let key = (stats.counts, stats.total_attempts);
                if last != Some(key) {
                    tracing::info!("{}", summary_line(&stats));
                    last = Some(key);
                }
            }
        }
    }
}

/// One-line summary of the aggregate
pub fn summary_line(stats: &AggregateStats) -> String {
    let c = &stats.counts;
    format!(
        "[{}] connected {}/{} ({:.1}%) | connecting {} | retrying {} | failed {} | cancelled {} | attempts {}",
        format_runtime(stats.runtime(Utc::now())),
        c.connected,
        stats.total,
        stats.success_rate,
        c.connecting,
        c.retrying,
        c.failed,
        c.cancelled,
        stats.total_attempts
    )
}
