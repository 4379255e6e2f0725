//! Run configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::{BatchPlan, RampPlan};

/// Default number of dial attempts per session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default bound on a single credential + dial step
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 30_000;

/// Inclusive range of delays, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds (inclusive)
    pub min_ms: u64,

    /// Upper bound in milliseconds (inclusive)
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a range from millisecond bounds
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Create a range from whole-second bounds
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self::from_millis(min * 1000, max * 1000)
    }

    /// A range that always yields `delay`
    pub const fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self::from_millis(ms, ms)
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Whether `delay` falls inside the range
    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min() && delay <= self.max()
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidDelayRange(format!(
                "{name}: min {}ms exceeds max {}ms",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Per-session retry and keepalive policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dial attempts before a session is marked failed
    pub max_attempts: u32,

    /// Backoff between failed dial attempts
    pub retry_delay: DelayRange,

    /// Pause between keepalive messages
    pub keepalive_interval: DelayRange,

    /// Bound on one credential acquisition + dial step
    pub dial_timeout_ms: u64,

    /// Seed for backoff/keepalive jitter; entropy-seeded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DelayRange::from_secs(4, 8),
            keepalive_interval: DelayRange::from_secs(11, 18),
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Set the jitter seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the retry budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the retry backoff range
    pub fn with_retry_delay(mut self, range: DelayRange) -> Self {
        self.retry_delay = range;
        self
    }

    /// Set the keepalive interval range
    pub fn with_keepalive_interval(mut self, range: DelayRange) -> Self {
        self.keepalive_interval = range;
        self
    }

    /// Set the dial timeout
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Dial timeout as a `Duration`
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryBudget(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.dial_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "dial_timeout_ms must be positive".into(),
            ));
        }
        self.retry_delay.validate("retry_delay")?;
        self.keepalive_interval.validate("keepalive_interval")?;
        Ok(())
    }
}

/// How sessions are brought online
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RampConfig {
    /// Launch every session at once
    #[default]
    Immediate,

    /// Launch `batch_size` sessions, then wait `batch_delay_secs`
    Batched {
        /// Sessions per batch
        batch_size: usize,
        /// Pause between batches in seconds
        batch_delay_secs: u64,
    },
}

/// Complete configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of sessions to launch
    pub total_sessions: usize,

    /// Ramp-up mode
    #[serde(default)]
    pub ramp: RampConfig,

    /// Per-session policy
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RunConfig {
    /// Create a config for `total_sessions` launched immediately
    pub fn new(total_sessions: usize) -> Self {
        Self {
            total_sessions,
            ramp: RampConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Set the ramp-up mode
    pub fn with_ramp(mut self, ramp: RampConfig) -> Self {
        self.ramp = ramp;
        self
    }

    /// Switch to batched ramp-up
    pub fn batched(self, batch_size: usize, batch_delay: Duration) -> Self {
        self.with_ramp(RampConfig::Batched {
            batch_size,
            batch_delay_secs: batch_delay.as_secs(),
        })
    }

    /// Set the per-session policy
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ramp_plan()?;
        self.session.validate()
    }

    /// Derive the ramp plan, validating session count and batch size
    pub fn ramp_plan(&self) -> Result<RampPlan, ConfigError> {
        match self.ramp {
            RampConfig::Immediate => RampPlan::immediate(self.total_sessions),
            RampConfig::Batched {
                batch_size,
                batch_delay_secs,
            } => BatchPlan::new(
                self.total_sessions,
                batch_size,
                Duration::from_secs(batch_delay_secs),
            )
            .map(RampPlan::Batched),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Session count out of range
    #[error("Invalid session count: {0}")]
    InvalidSessionCount(String),

    /// Batch size out of range
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Retry budget out of range
    #[error("Invalid retry budget: {0}")]
    InvalidRetryBudget(String),

    /// Malformed delay range
    #[error("Invalid delay range: {0}")]
    InvalidDelayRange(String),

    /// Timeout out of range
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}
