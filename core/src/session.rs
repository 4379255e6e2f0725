//! Per-session state owned by a running session task

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not yet started
    Idle,
    /// Acquiring a credential and dialing
    Connecting,
    /// Connection established, keepalive loop running
    Connected,
    /// Waiting out the backoff before the next dial
    Retrying,
    /// Retry budget exhausted or keepalive send failed
    Failed,
    /// Stopped by operator shutdown
    Cancelled,
}

impl SessionStatus {
    /// Every status, in display order
    pub const ALL: [SessionStatus; 6] = [
        SessionStatus::Idle,
        SessionStatus::Connecting,
        SessionStatus::Connected,
        SessionStatus::Retrying,
        SessionStatus::Failed,
        SessionStatus::Cancelled,
    ];

    /// Whether the session task exits in this status
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Failed | SessionStatus::Cancelled)
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Connected => "Connected",
            SessionStatus::Retrying => "Retrying",
            SessionStatus::Failed => "Failed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A status change reported by a session task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// Session index
    pub index: usize,
    /// Status the session just entered
    pub status: SessionStatus,
    /// Dial attempts made so far
    pub attempts: u32,
    /// Most recent error, if the session is not healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionUpdate {
    /// Create an update with no error attached
    pub fn new(index: usize, status: SessionStatus, attempts: u32) -> Self {
        Self {
            index,
            status,
            attempts,
            last_error: None,
        }
    }

    /// Attach an error description
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }
}

/// The record a session task keeps about itself
///
/// Only the owning task mutates it; the aggregator sees it through
/// [`SessionUpdate`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Stable session index
    pub index: usize,
    /// Current status
    pub status: SessionStatus,
    /// Dial attempts made so far, never decreasing
    pub attempts: u32,
    /// Most recent error, cleared on connect
    pub last_error: Option<String>,
    /// First time the session reached `Connected`
    pub connected_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Create an idle session
    pub fn new(index: usize) -> Self {
        Self {
            index,
            status: SessionStatus::Idle,
            attempts: 0,
            last_error: None,
            connected_at: None,
        }
    }

    /// Start a dial attempt
    pub(crate) fn begin_attempt(&mut self) {
        self.status = SessionStatus::Connecting;
        self.attempts += 1;
    }

    pub(crate) fn mark_connected(&mut self) {
        self.status = SessionStatus::Connected;
        self.last_error = None;
        self.connected_at.get_or_insert_with(Utc::now);
    }

    pub(crate) fn mark_retrying(&mut self, error: &SessionError) {
        self.status = SessionStatus::Retrying;
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn mark_failed(&mut self, error: &SessionError) {
        self.status = SessionStatus::Failed;
        self.last_error = Some(error.to_string());
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.status = SessionStatus::Cancelled;
    }

    /// Whether the session ever reached `Connected`
    pub fn has_connected(&self) -> bool {
        self.connected_at.is_some()
    }

    /// The update describing the current state
    pub fn update(&self) -> SessionUpdate {
        SessionUpdate {
            index: self.index,
            status: self.status,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
        }
    }
}
