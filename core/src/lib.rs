//! swarm-bench-core: Session orchestration for many concurrent client sessions
//!
//! This crate provides the pieces every swarm-bench component builds on:
//!
//! - Session state and the per-session retry/keepalive state machine
//! - The shared statistics aggregator and its reporter sinks
//! - Ramp-up scheduling and cooperative shutdown
//! - Collaborator traits (SessionProvider, Transport, RoutingPathSource)
//! - Configuration and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod reporter;
pub mod session;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod testing;

pub use channel::{run_aggregation, ChannelConfig, ChannelReporter};
pub use config::*;
pub use error::*;
pub use message::*;
pub use orchestrator::{
    AggregateStats, Aggregator, BatchPlan, Orchestrator, OrchestratorBuilder, RampPlan,
    RunSummary, SessionRecord, ShutdownCoordinator, ShutdownSignal, StatsSnapshot, StatusCounts,
};
pub use reporter::TracingReporter;
pub use session::*;
pub use traits::*;
pub use worker::{Jitter, SessionTask, SessionTaskBuilder};
