//! Mock collaborators shared by the worker and orchestrator tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result, SessionError};
use crate::message::KeepaliveMessage;
use crate::session::SessionUpdate;
use crate::traits::{
    Connection, Credential, Reporter, RoutingPath, RoutingPathSource, SessionProvider, TargetId,
    Transport,
};

// ============================================================================
// Mock SessionProvider
// ============================================================================

pub struct MockProvider {
    pub calls: AtomicUsize,
    fail_first: usize,
    delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            delay: None,
        }
    }

    /// Fail the first `n` credential requests
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SessionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn resolve_target(&self, name: &str) -> Result<TargetId> {
        if name.is_empty() {
            return Err(Error::target_resolution(name, "empty target name"));
        }
        Ok(TargetId(name.len() as u64))
    }

    async fn acquire_credential(&self, path: &RoutingPath) -> Result<Credential, SessionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.fail_first {
            return Err(SessionError::credential("rate limited"));
        }
        Ok(Credential::new(format!("token-{call}-{}", path.host)))
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
pub struct TransportLog {
    pub dials: AtomicUsize,
    pub open: AtomicUsize,
    pub closed: AtomicUsize,
    pub sent: Mutex<Vec<(usize, KeepaliveMessage)>>,
}

impl TransportLog {
    pub fn sent(&self) -> Vec<(usize, KeepaliveMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

pub struct MockTransport {
    pub log: Arc<TransportLog>,
    fail_dials: bool,
    fail_send_after: Option<usize>,
    dial_delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            log: Arc::new(TransportLog::default()),
            fail_dials: false,
            fail_send_after: None,
            dial_delay: None,
        }
    }

    pub fn failing_dials(mut self) -> Self {
        self.fail_dials = true;
        self
    }

    /// Connections accept `n` sends, then fail
    pub fn failing_send_after(mut self, n: usize) -> Self {
        self.fail_send_after = Some(n);
        self
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn dial(
        &self,
        _credential: &Credential,
        _path: &RoutingPath,
    ) -> Result<Box<dyn Connection>, SessionError> {
        let id = self.log.dials.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_dials {
            return Err(SessionError::dial("connection refused"));
        }
        self.log.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            id,
            log: Arc::clone(&self.log),
            sends: 0,
            fail_send_after: self.fail_send_after,
            open: true,
        }))
    }
}

struct MockConnection {
    id: usize,
    log: Arc<TransportLog>,
    sends: usize,
    fail_send_after: Option<usize>,
    open: bool,
}

impl MockConnection {
    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.log.open.fetch_sub(1, Ordering::SeqCst);
            self.log.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, message: &KeepaliveMessage) -> Result<(), SessionError> {
        if self.fail_send_after.is_some_and(|n| self.sends >= n) {
            return Err(SessionError::send("broken pipe"));
        }
        self.sends += 1;
        self.log.sent.lock().unwrap().push((self.id, *message));
        Ok(())
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Mock RoutingPathSource
// ============================================================================

pub struct MockRoutes(pub Vec<RoutingPath>);

impl MockRoutes {
    pub fn single() -> Self {
        Self(vec![RoutingPath::new("127.0.0.1", 8080, "user", "pass")])
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

impl RoutingPathSource for MockRoutes {
    fn select(&self) -> Result<RoutingPath, SessionError> {
        self.0
            .first()
            .cloned()
            .ok_or(SessionError::RoutingPathExhausted)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

// ============================================================================
// Recording Reporter
// ============================================================================

#[derive(Default)]
pub struct RecordingReporter {
    pub updates: Mutex<Vec<SessionUpdate>>,
}

impl RecordingReporter {
    pub fn updates(&self) -> Vec<SessionUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, update: SessionUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
