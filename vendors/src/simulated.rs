//! In-process session provider and transport
//!
//! Stands in for a real remote service: latency and failures are drawn
//! from a seedable generator, and open connections are counted so that
//! leaks show up in tests and in the final summary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use swarm_bench_core::{
    Connection, Credential, DelayRange, Error, KeepaliveMessage, Result, RoutingPath,
    SessionError, SessionProvider, TargetId, Transport,
};

/// Knobs for the simulated backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Probability a credential request is rejected (0.0 - 1.0).
    pub credential_failure_rate: f64,

    /// Probability a dial is refused (0.0 - 1.0).
    pub dial_failure_rate: f64,

    /// Probability a keepalive send fails (0.0 - 1.0).
    pub send_failure_rate: f64,

    /// Latency added to each credential request and dial.
    pub latency: DelayRange,

    /// Seed for the failure/latency generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            credential_failure_rate: 0.0,
            dial_failure_rate: 0.0,
            send_failure_rate: 0.0,
            latency: DelayRange::from_millis(50, 250),
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Set the credential rejection probability.
    pub fn with_credential_failure_rate(mut self, rate: f64) -> Self {
        self.credential_failure_rate = rate;
        self
    }

    /// Set the dial refusal probability.
    pub fn with_dial_failure_rate(mut self, rate: f64) -> Self {
        self.dial_failure_rate = rate;
        self
    }

    /// Set the send failure probability.
    pub fn with_send_failure_rate(mut self, rate: f64) -> Self {
        self.send_failure_rate = rate;
        self
    }

    /// Set the per-call latency range.
    pub fn with_latency(mut self, latency: DelayRange) -> Self {
        self.latency = latency;
        self
    }

    /// Set the generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Counters shared by the backend and the connections it hands out.
#[derive(Debug, Default)]
pub struct SimulationCounters {
    /// Credentials issued.
    pub credentials: AtomicUsize,
    /// Connections established.
    pub dials: AtomicUsize,
    /// Connections currently open.
    pub open: AtomicUsize,
    /// Keepalive messages delivered.
    pub messages: AtomicUsize,
}

impl SimulationCounters {
    /// Connections currently open.
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Dice {
    rng: Mutex<StdRng>,
}

impl Dice {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn roll(&self, probability: f64) -> bool {
        let p = clamp_rate(probability);
        if p == 0.0 {
            return false;
        }
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_bool(p)
    }

    fn delay(&self, range: &DelayRange) -> Duration {
        if range.min_ms >= range.max_ms {
            return range.min();
        }
        let ms = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(range.min_ms..=range.max_ms);
        Duration::from_millis(ms)
    }
}

/// Simulated session provider and transport in one.
#[derive(Debug)]
pub struct SimulatedBackend {
    config: SimulationConfig,
    dice: Arc<Dice>,
    counters: Arc<SimulationCounters>,
}

impl SimulatedBackend {
    /// Create a backend.
    pub fn new(config: SimulationConfig) -> Self {
        let dice = Arc::new(Dice::new(config.seed));
        Self {
            config,
            dice,
            counters: Arc::new(SimulationCounters::default()),
        }
    }

    /// Shared counters.
    pub fn counters(&self) -> Arc<SimulationCounters> {
        Arc::clone(&self.counters)
    }

    /// The backend's configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    async fn latency(&self) {
        let delay = self.dice.delay(&self.config.latency);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// Stable identifier for a target name (FNV-1a).
pub fn target_id_for(name: &str) -> TargetId {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = name
        .to_ascii_lowercase()
        .bytes()
        .fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME));
    // Keep identifiers readable in logs and the dashboard.
    TargetId(hash % 100_000_000)
}

#[async_trait]
impl SessionProvider for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn resolve_target(&self, name: &str) -> Result<TargetId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::target_resolution(name, "target name is empty"));
        }
        self.latency().await;
        Ok(target_id_for(name))
    }

    async fn acquire_credential(&self, path: &RoutingPath) -> Result<Credential, SessionError> {
        self.latency().await;
        if self.dice.roll(self.config.credential_failure_rate) {
            return Err(SessionError::credential(format!(
                "token request rejected via {path}"
            )));
        }
        let n = self.counters.credentials.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::new(format!("sim-{n:08x}")))
    }
}

#[async_trait]
impl Transport for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn dial(
        &self,
        credential: &Credential,
        path: &RoutingPath,
    ) -> Result<Box<dyn Connection>, SessionError> {
        self.latency().await;
        if credential.expose().is_empty() {
            return Err(SessionError::dial("empty credential"));
        }
        if self.dice.roll(self.config.dial_failure_rate) {
            return Err(SessionError::dial(format!("connection refused via {path}")));
        }

        self.counters.dials.fetch_add(1, Ordering::SeqCst);
        self.counters.open.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(route = %path, "Simulated connection opened");

        Ok(Box::new(SimulatedConnection {
            dice: Arc::clone(&self.dice),
            counters: Arc::clone(&self.counters),
            send_failure_rate: self.config.send_failure_rate,
            open: true,
        }))
    }
}

/// Connection handed out by [`SimulatedBackend`].
///
/// Released on `close` or drop, whichever comes first.
struct SimulatedConnection {
    dice: Arc<Dice>,
    counters: Arc<SimulationCounters>,
    send_failure_rate: f64,
    open: bool,
}

impl SimulatedConnection {
    fn release(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Connection for SimulatedConnection {
    async fn send(&mut self, message: &KeepaliveMessage) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::send("connection closed"));
        }
        let frame = serde_json::to_string(message).map_err(|e| SessionError::send(e.to_string()))?;
        if self.dice.roll(self.send_failure_rate) {
            return Err(SessionError::send("connection reset by peer"));
        }
        self.counters.messages.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(frame = %frame, "Simulated frame sent");
        Ok(())
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        self.release();
    }
}
