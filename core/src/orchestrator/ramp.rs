//! Ramp-up scheduling

use std::ops::Range;
use std::time::Duration;

use crate::config::ConfigError;

use super::shutdown::{ShutdownSignal, Wait};

/// Validated batched ramp-up plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchPlan {
    /// Create a plan, rejecting a zero total or batch size
    pub fn new(total: usize, batch_size: usize, batch_delay: Duration) -> Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::InvalidSessionCount(
                "session count must be at least 1".into(),
            ));
        }
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(Self {
            total,
            batch_size,
            batch_delay,
        })
    }

    /// Total sessions across all batches
    pub fn total(&self) -> usize {
        self.total
    }

    /// Sessions per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause between batches
    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Number of batches
    pub fn batch_count(&self) -> usize {
        self.total.div_ceil(self.batch_size)
    }

    /// Indices covered by batch `k` (0-indexed)
    pub fn batch(&self, k: usize) -> Range<usize> {
        let start = (k * self.batch_size).min(self.total);
        let end = ((k + 1) * self.batch_size).min(self.total);
        start..end
    }

    /// Every batch in order
    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.batch_count()).map(|k| self.batch(k))
    }
}

/// How a run's sessions are brought online
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPlan {
    /// Launch every session at once
    Immediate {
        /// Number of sessions
        total: usize,
    },
    /// Launch in timed batches
    Batched(BatchPlan),
}

impl RampPlan {
    /// Immediate plan, rejecting a zero total
    pub fn immediate(total: usize) -> Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::InvalidSessionCount(
                "session count must be at least 1".into(),
            ));
        }
        Ok(Self::Immediate { total })
    }

    /// Total sessions the plan launches
    pub fn total(&self) -> usize {
        match self {
            Self::Immediate { total } => *total,
            Self::Batched(plan) => plan.total(),
        }
    }
}

/// What the scheduler managed to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RampOutcome {
    /// Sessions handed to the launcher
    pub launched: usize,
    /// Batches started (1 for immediate mode)
    pub batches_started: usize,
    /// Whether shutdown stopped scheduling early
    pub interrupted: bool,
}

/// Run a ramp plan, calling `launch` once per session index
///
/// `launch` must not block; the scheduler never waits on the sessions it
/// starts. Shutdown is checked before each batch and during every
/// inter-batch wait. Already-launched sessions are left alone.
pub async fn schedule<F>(plan: &RampPlan, signal: &ShutdownSignal, mut launch: F) -> RampOutcome
where
    F: FnMut(usize),
{
    let mut outcome = RampOutcome::default();

    match plan {
        RampPlan::Immediate { total } => {
            if signal.is_triggered() {
                outcome.interrupted = true;
                return outcome;
            }
            tracing::info!(sessions = total, "Launching all sessions");
            (0..*total).for_each(&mut launch);
            outcome.launched = *total;
            outcome.batches_started = 1;
        }
        RampPlan::Batched(batches) => {
            let count = batches.batch_count();

            for (k, range) in batches.batches().enumerate() {
                if signal.is_triggered() {
                    tracing::info!(
                        launched = outcome.launched,
                        remaining = batches.total() - outcome.launched,
                        "Ramp-up stopped before batch {}/{}",
                        k + 1,
                        count
                    );
                    outcome.interrupted = true;
                    break;
                }

                tracing::info!(
                    "Starting batch {}/{} (sessions {}-{})",
                    k + 1,
                    count,
                    range.start + 1,
                    range.end
                );
                outcome.launched += range.len();
                range.for_each(&mut launch);
                outcome.batches_started += 1;

                if k + 1 < count {
                    tracing::info!(
                        delay_secs = batches.batch_delay().as_secs_f64(),
                        "Waiting before next batch"
                    );
                    if signal.sleep(batches.batch_delay()).await == Wait::Cancelled {
                        tracing::info!(
                            launched = outcome.launched,
                            "Ramp-up cancelled during batch delay"
                        );
                        outcome.interrupted = true;
                        break;
                    }
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(plan: &BatchPlan) -> Vec<usize> {
        plan.batches().map(|r| r.len()).collect()
    }

    #[test]
    fn test_seven_by_three() {
        let plan = BatchPlan::new(7, 3, Duration::from_secs(30)).unwrap();
        assert_eq!(plan.batch_count(), 3);
        assert_eq!(sizes(&plan), vec![3, 3, 1]);
        assert_eq!(plan.batch(0), 0..3);
        assert_eq!(plan.batch(1), 3..6);
        assert_eq!(plan.batch(2), 6..7);
    }

    #[test]
    fn test_exact_multiple_and_oversized_batch() {
        let plan = BatchPlan::new(9, 3, Duration::ZERO).unwrap();
        assert_eq!(sizes(&plan), vec![3, 3, 3]);

        let plan = BatchPlan::new(5, 100, Duration::ZERO).unwrap();
        assert_eq!(sizes(&plan), vec![5]);
    }

    #[test]
    fn test_invalid_plans() {
        assert!(matches!(
            BatchPlan::new(0, 3, Duration::ZERO),
            Err(ConfigError::InvalidSessionCount(_))
        ));
        assert!(matches!(
            BatchPlan::new(3, 0, Duration::ZERO),
            Err(ConfigError::InvalidBatchSize(_))
        ));
        assert!(RampPlan::immediate(0).is_err());
    }

    #[tokio::test]
    async fn test_immediate_launches_everything() {
        let plan = RampPlan::immediate(10).unwrap();
        let mut launched = Vec::new();
        let outcome = schedule(&plan, &ShutdownSignal::new(), |i| launched.push(i)).await;

        assert_eq!(launched, (0..10).collect::<Vec<_>>());
        assert_eq!(outcome.launched, 10);
        assert!(!outcome.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batched_waits_between_batches_only() {
        let plan = RampPlan::Batched(BatchPlan::new(7, 3, Duration::from_secs(30)).unwrap());
        let start = tokio::time::Instant::now();
        let mut launched = Vec::new();

        let outcome = schedule(&plan, &ShutdownSignal::new(), |i| {
            launched.push((i, start.elapsed().as_secs()))
        })
        .await;

        assert_eq!(outcome.batches_started, 3);
        assert_eq!(outcome.launched, 7);
        assert_eq!(launched[0], (0, 0));
        assert_eq!(launched[3], (3, 30));
        assert_eq!(launched[6], (6, 60));
        // No wait after the final batch.
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_batch_delay_stops_ramp() {
        let plan = RampPlan::Batched(BatchPlan::new(7, 3, Duration::from_secs(30)).unwrap());
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.trigger();
        });

        let mut launched = Vec::new();
        let outcome = schedule(&plan, &signal, |i| launched.push(i)).await;

        assert_eq!(launched, vec![0, 1, 2]);
        assert_eq!(outcome.batches_started, 1);
        assert!(outcome.interrupted);
    }

    #[tokio::test]
    async fn test_triggered_before_start_launches_nothing() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let mut count = 0;
        let batched = RampPlan::Batched(BatchPlan::new(7, 3, Duration::ZERO).unwrap());
        let outcome = schedule(&batched, &signal, |_| count += 1).await;
        assert_eq!(outcome.launched, 0);
        assert!(outcome.interrupted);

        let outcome = schedule(&RampPlan::immediate(4).unwrap(), &signal, |_| count += 1).await;
        assert_eq!(outcome.launched, 0);
        assert_eq!(count, 0);
    }
}
