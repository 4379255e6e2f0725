//! Tests for the Orchestrator module

use super::aggregator::Aggregator;
use super::builder::OrchestratorBuilder;
use crate::channel::{run_aggregation, ChannelConfig, ChannelReporter};
use crate::config::{RunConfig, SessionConfig};
use crate::error::{Error, SessionError};
use crate::session::SessionStatus;
use crate::testing::{MockProvider, MockRoutes, MockTransport};
use crate::traits::{Connection, Credential, RoutingPath, TargetId, Transport};

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TARGET: TargetId = TargetId(99);

fn builder(transport: Arc<MockTransport>) -> OrchestratorBuilder {
    OrchestratorBuilder::new()
        .provider(Arc::new(MockProvider::new()))
        .transport(transport)
        .routes(Arc::new(MockRoutes::single()))
        .session_config(SessionConfig::default().with_seed(7))
}

// ============================================================================
// Panicking Transport
// ============================================================================

/// Refuses the first `refusals` dials, then panics
#[derive(Default)]
struct PanicTransport {
    refusals: usize,
    dials: AtomicUsize,
}

impl PanicTransport {
    fn after(refusals: usize) -> Self {
        Self {
            refusals,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transport for PanicTransport {
    fn name(&self) -> &str {
        "panic"
    }

    async fn dial(
        &self,
        _credential: &Credential,
        _path: &RoutingPath,
    ) -> Result<Box<dyn Connection>, SessionError> {
        if self.dials.fetch_add(1, Ordering::SeqCst) < self.refusals {
            return Err(SessionError::dial("refused"));
        }
        panic!("transport bug");
    }
}

// ============================================================================
// Builder Tests
// ============================================================================

#[test]
fn test_builder_missing_provider() {
    let result = OrchestratorBuilder::new()
        .transport(Arc::new(MockTransport::new()))
        .routes(Arc::new(MockRoutes::single()))
        .build();

    assert!(matches!(result, Err(Error::MissingConfig("provider"))));
}

#[test]
fn test_builder_missing_routes() {
    let result = OrchestratorBuilder::new()
        .provider(Arc::new(MockProvider::new()))
        .transport(Arc::new(MockTransport::new()))
        .build();

    assert!(matches!(result, Err(Error::MissingConfig("routes"))));
}

#[test]
fn test_builder_invalid_config() {
    let result = builder(Arc::new(MockTransport::new())).sessions(0).build();
    assert!(matches!(result, Err(Error::Config(_))));

    let result = builder(Arc::new(MockTransport::new()))
        .sessions(10)
        .batched(0, Duration::from_secs(1))
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_builder_sizes_aggregator() {
    let orchestrator = builder(Arc::new(MockTransport::new()))
        .config(RunConfig::new(25))
        .build()
        .unwrap();

    assert_eq!(orchestrator.aggregator().total(), 25);
    assert_eq!(orchestrator.config().total_sessions, 25);
    assert!(format!("{:?}", orchestrator).contains("Orchestrator"));
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_immediate_all_connect() {
    let transport = Arc::new(MockTransport::new());
    let orchestrator = builder(Arc::clone(&transport)).sessions(10).build().unwrap();

    let summary = orchestrator
        .run_with_timeout(TARGET, Duration::from_secs(5))
        .await
        .expect("Run failed");

    let stats = &summary.snapshot.stats;
    assert_eq!(summary.launched, 10);
    assert!(!summary.ramp_interrupted);
    assert_eq!(stats.counts.connected, 10);
    assert_eq!(stats.reported(), 10);
    assert!((summary.success_rate() - 100.0).abs() < 1e-9);
    assert_eq!(summary.kept_alive, 10);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cancelled, 0);

    // Every connection released once the barrier resolved.
    assert_eq!(transport.log.open.load(Ordering::SeqCst), 0);
    assert_eq!(transport.log.closed.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_all_failing_run_ends_without_shutdown() {
    let transport = Arc::new(MockTransport::new().failing_dials());
    let orchestrator = builder(transport).sessions(4).build().unwrap();

    let summary = orchestrator.run(TARGET).await.unwrap();

    let stats = &summary.snapshot.stats;
    assert_eq!(summary.failed, 4);
    assert_eq!(stats.counts.failed, 4);
    assert_eq!(stats.total_attempts, 20);
    assert_eq!(stats.success_rate, 0.0);
    assert!(!orchestrator.shutdown_signal().is_triggered());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_batch_delay() {
    let orchestrator = builder(Arc::new(MockTransport::new()))
        .sessions(7)
        .batched(3, Duration::from_secs(30))
        .build()
        .unwrap();

    let signal = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        signal.trigger();
    });

    let summary = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(summary.launched, 3);
    assert!(summary.ramp_interrupted);
    assert_eq!(summary.snapshot.stats.reported(), 3);
    assert_eq!(summary.snapshot.stats.counts.connected, 3);
    assert_eq!(summary.kept_alive, 3);
    assert!(summary.elapsed < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_retry_counts_cancelled_not_failed() {
    let orchestrator = builder(Arc::new(MockTransport::new().failing_dials()))
        .sessions(5)
        .build()
        .unwrap();

    let summary = orchestrator
        .run_with_timeout(TARGET, Duration::from_secs(2))
        .await
        .unwrap();

    let stats = &summary.snapshot.stats;
    assert_eq!(summary.cancelled, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(stats.counts.cancelled, 5);
    assert_eq!(stats.counts.failed, 0);
    assert_eq!(stats.failure_rate(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_invariants_hold_while_ramping() {
    let provider = Arc::new(MockProvider::new().failing_first(20));
    let orchestrator = Arc::new(
        OrchestratorBuilder::new()
            .provider(provider)
            .transport(Arc::new(MockTransport::new()))
            .routes(Arc::new(MockRoutes::single()))
            .sessions(50)
            .batched(10, Duration::from_secs(1))
            .build()
            .unwrap(),
    );

    let aggregator = orchestrator.aggregator();
    let poller = tokio::spawn(async move {
        let mut checks = 0;
        for _ in 0..600 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let snapshot = aggregator.snapshot();
            let stats = &snapshot.stats;
            assert!(stats.reported() <= stats.total);
            assert_eq!(stats.reported(), snapshot.sessions.len());
            let expected = 100.0 * stats.counts.connected as f64 / stats.total as f64;
            assert!((stats.success_rate - expected).abs() < 1e-9);
            checks += 1;
        }
        checks
    });

    let summary = orchestrator
        .run_with_timeout(TARGET, Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(poller.await.unwrap(), 600);
    assert_eq!(summary.snapshot.stats.reported(), 50);
    assert_eq!(summary.snapshot.stats.counts.connected, 50);
}

#[tokio::test(start_paused = true)]
async fn test_queued_reporting() {
    let aggregator = Arc::new(Aggregator::new(5));
    let (reporter, rx) = ChannelReporter::new(&ChannelConfig::default());
    let drain = tokio::spawn(run_aggregation(rx, Arc::clone(&aggregator)));

    let orchestrator = builder(Arc::new(MockTransport::new()))
        .sessions(5)
        .aggregator(Arc::clone(&aggregator))
        .reporter(Arc::new(reporter))
        .build()
        .unwrap();

    orchestrator
        .run_with_timeout(TARGET, Duration::from_secs(5))
        .await
        .unwrap();

    // Drop orchestrator to close the report channel
    drop(orchestrator);

    // Connecting + Connected per session.
    assert_eq!(drain.await.unwrap(), 10);
    assert_eq!(aggregator.stats().counts.connected, 5);
}

#[tokio::test(start_paused = true)]
async fn test_verbose_still_feeds_aggregator() {
    let orchestrator = builder(Arc::new(MockTransport::new()))
        .sessions(3)
        .verbose(true)
        .build()
        .unwrap();

    let summary = orchestrator
        .run_with_timeout(TARGET, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(summary.snapshot.stats.counts.connected, 3);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_session_does_not_block_join() {
    let orchestrator = OrchestratorBuilder::new()
        .provider(Arc::new(MockProvider::new()))
        .transport(Arc::new(PanicTransport::default()))
        .routes(Arc::new(MockRoutes::single()))
        .sessions(3)
        .build()
        .unwrap();

    let summary = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(summary.panicked, 3);
    assert_eq!(summary.launched, 3);

    let counts = &summary.snapshot.stats.counts;
    assert_eq!(counts.failed, 3);
    assert_eq!(counts.connecting + counts.retrying + counts.connected + counts.idle, 0);
    for record in summary.snapshot.sessions.values() {
        assert!(record.status.is_terminal());
        assert_eq!(record.attempts, 1);
        assert_eq!(record.last_error.as_deref(), Some("session task panicked"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_panic_after_retries_keeps_attempt_count() {
    let orchestrator = OrchestratorBuilder::new()
        .provider(Arc::new(MockProvider::new()))
        .transport(Arc::new(PanicTransport::after(2)))
        .routes(Arc::new(MockRoutes::single()))
        .session_config(SessionConfig::default().with_seed(3))
        .sessions(1)
        .build()
        .unwrap();

    let summary = orchestrator.run(TARGET).await.unwrap();

    assert_eq!(summary.panicked, 1);
    assert_eq!(summary.failed, 0);
    let record = &summary.snapshot.sessions[&0];
    assert_eq!(record.status, SessionStatus::Failed);
    assert_eq!(record.attempts, 3);
}

// ============================================================================
// Bounded Runs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_with_signal_handling_drains_on_trigger() {
    let transport = Arc::new(MockTransport::new());
    let orchestrator = builder(transport.clone()).sessions(4).build().unwrap();
    let signal = orchestrator.shutdown_signal();

    let (summary, _) = tokio::join!(orchestrator.run_with_signal_handling(TARGET), async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        signal.trigger();
    });
    let summary = summary.unwrap();

    assert_eq!(summary.launched, 4);
    assert_eq!(summary.kept_alive, 4);
    assert_eq!(summary.snapshot.stats.counts.connected, 4);
    assert_eq!(transport.log.open.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_stops_after_timeout() {
    let orchestrator = builder(Arc::new(MockTransport::new())).sessions(2).build().unwrap();

    let start = tokio::time::Instant::now();
    let summary = orchestrator
        .run_until(TARGET, Some(Duration::from_secs(45)))
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(45));
    assert!(orchestrator.shutdown_signal().is_triggered());
    assert_eq!(summary.kept_alive, 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_target_resolves_name() {
    let orchestrator = builder(Arc::new(MockTransport::new())).sessions(2).build().unwrap();
    let signal = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        signal.trigger();
    });

    let summary = orchestrator.run_target("lobby").await.unwrap();
    assert_eq!(summary.snapshot.stats.counts.connected, 2);
}

#[tokio::test]
async fn test_run_target_unknown_name() {
    let orchestrator = builder(Arc::new(MockTransport::new())).build().unwrap();
    let result = orchestrator.run_target("").await;

    assert!(matches!(result, Err(Error::TargetResolution { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_run() {
    let orchestrator = builder(Arc::new(MockTransport::new())).sessions(4).build().unwrap();
    orchestrator.shutdown();

    let summary = orchestrator.run(TARGET).await.unwrap();
    assert_eq!(summary.launched, 0);
    assert!(summary.ramp_interrupted);
    assert_eq!(summary.snapshot.stats.reported(), 0);
}
