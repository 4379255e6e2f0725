//! Aggregate session statistics shared by every session task

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::{SessionStatus, SessionUpdate};
use crate::traits::Reporter;

/// Number of sessions currently in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Sessions in `Idle`
    pub idle: usize,
    /// Sessions in `Connecting`
    pub connecting: usize,
    /// Sessions in `Connected`
    pub connected: usize,
    /// Sessions in `Retrying`
    pub retrying: usize,
    /// Sessions in `Failed`
    pub failed: usize,
    /// Sessions in `Cancelled`
    pub cancelled: usize,
}

impl StatusCounts {
    /// Count for a single status
    pub fn get(&self, status: SessionStatus) -> usize {
        match status {
            SessionStatus::Idle => self.idle,
            SessionStatus::Connecting => self.connecting,
            SessionStatus::Connected => self.connected,
            SessionStatus::Retrying => self.retrying,
            SessionStatus::Failed => self.failed,
            SessionStatus::Cancelled => self.cancelled,
        }
    }

    fn increment(&mut self, status: SessionStatus) {
        match status {
            SessionStatus::Idle => self.idle += 1,
            SessionStatus::Connecting => self.connecting += 1,
            SessionStatus::Connected => self.connected += 1,
            SessionStatus::Retrying => self.retrying += 1,
            SessionStatus::Failed => self.failed += 1,
            SessionStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Sessions reported at least once
    pub fn sum(&self) -> usize {
        SessionStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Latest known state of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    /// Session index
    pub index: usize,
    /// Last reported status
    pub status: SessionStatus,
    /// Last reported attempt count
    pub attempts: u32,
    /// Last reported error
    pub last_error: Option<String>,
    /// First time the session was reported `Connected`
    pub connected_at: Option<DateTime<Utc>>,
    /// When the last report for this session arrived
    pub updated_at: DateTime<Utc>,
}

/// Summary statistics derived from every known session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Target session count for the run
    pub total: usize,

    /// Sessions per current status
    pub counts: StatusCounts,

    /// Sum of attempts across all known sessions
    pub total_attempts: u64,

    /// Connected sessions as a percentage of `total`
    pub success_rate: f64,

    /// When the aggregator was created
    pub start_time: DateTime<Utc>,

    /// When the statistics were last recomputed
    pub last_update: Option<DateTime<Utc>>,
}

impl AggregateStats {
    fn new(total: usize) -> Self {
        Self {
            total,
            counts: StatusCounts::default(),
            total_attempts: 0,
            success_rate: 0.0,
            start_time: Utc::now(),
            last_update: None,
        }
    }

    /// Sessions reported at least once
    pub fn reported(&self) -> usize {
        self.counts.sum()
    }

    /// Failed sessions as a percentage of `total`
    ///
    /// Cancelled sessions never count as failures.
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.counts.failed as f64 / self.total as f64 * 100.0
        }
    }

    /// Time since the aggregator was created
    pub fn runtime(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Immutable copy of the aggregate plus per-session details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Summary statistics
    pub stats: AggregateStats,

    /// Latest record per session, keyed by index
    pub sessions: BTreeMap<usize, SessionRecord>,
}

impl StatsSnapshot {
    /// Up to `limit` sessions, most recently updated first
    pub fn recent(&self, limit: usize) -> Vec<&SessionRecord> {
        let mut records: Vec<_> = self.sessions.values().collect();
        records.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.index.cmp(&b.index))
        });
        records.truncate(limit);
        records
    }
}

#[derive(Debug)]
struct AggregatorState {
    stats: AggregateStats,
    sessions: HashMap<usize, SessionRecord>,
}

impl AggregatorState {
    /// Recompute every derived field from the full session map
    fn recalculate(&mut self, now: DateTime<Utc>) {
        let mut counts = StatusCounts::default();
        let mut total_attempts = 0u64;

        for record in self.sessions.values() {
            counts.increment(record.status);
            total_attempts += u64::from(record.attempts);
        }

        let stats = &mut self.stats;
        stats.counts = counts;
        stats.total_attempts = total_attempts;
        stats.success_rate = if total_attempts > 0 && stats.total > 0 {
            counts.connected as f64 / stats.total as f64 * 100.0
        } else {
            0.0
        };
        stats.last_update = Some(now);
    }
}

/// Shared statistics store fed by every session task
///
/// All mutation goes through [`Aggregator::record`] under one mutex, held
/// only while the map is updated and the summary recomputed.
#[derive(Debug)]
pub struct Aggregator {
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    /// Create an aggregator for a run of `total` sessions
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(AggregatorState {
                stats: AggregateStats::new(total),
                sessions: HashMap::with_capacity(total),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // A panicking reporter must not take statistics down with it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the latest state of one session and recompute the summary
    ///
    /// Last write wins per index.
    pub fn record(&self, update: SessionUpdate) {
        let now = Utc::now();
        let mut state = self.lock();

        let connected_at = state
            .sessions
            .get(&update.index)
            .and_then(|prev| prev.connected_at)
            .or_else(|| (update.status == SessionStatus::Connected).then_some(now));

        state.sessions.insert(
            update.index,
            SessionRecord {
                index: update.index,
                status: update.status,
                attempts: update.attempts,
                last_error: update.last_error,
                connected_at,
                updated_at: now,
            },
        );
        state.recalculate(now);
    }

    /// Copy of the summary statistics only
    pub fn stats(&self) -> AggregateStats {
        self.lock().stats.clone()
    }

    /// Consistent copy of the summary and every session record
    pub fn snapshot(&self) -> StatsSnapshot {
        let (stats, records) = {
            let state = self.lock();
            let records: Vec<SessionRecord> = state.sessions.values().cloned().collect();
            (state.stats.clone(), records)
        };

        // Ordering happens after the lock is released.
        StatsSnapshot {
            stats,
            sessions: records.into_iter().map(|record| (record.index, record)).collect(),
        }
    }

    /// Target session count
    pub fn total(&self) -> usize {
        self.lock().stats.total
    }
}

#[async_trait]
impl Reporter for Aggregator {
    async fn report(&self, update: SessionUpdate) {
        self.record(update);
    }
}
