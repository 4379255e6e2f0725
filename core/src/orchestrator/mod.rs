//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates a complete run:
//! - Ramping session tasks up, all at once or in timed batches
//! - Feeding every status change into the shared Aggregator
//! - Propagating shutdown to the scheduler and every session task
//! - Waiting on the join barrier until every task has exited
//!
//! # Example
//!
//! ```ignore
//! use swarm_bench_core::OrchestratorBuilder;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .sessions(100)
//!     .provider(provider)
//!     .transport(transport)
//!     .routes(routes)
//!     .build()?;
//!
//! let target = orchestrator.resolve_target("lobby").await?;
//! let summary = orchestrator.run_with_signal_handling(target).await?;
//!
//! // Or stop on interrupt or after ten minutes, whichever comes first
//! let summary = orchestrator.run_until(target, Some(Duration::from_secs(600))).await?;
//! ```

mod aggregator;
mod builder;
mod executor;
mod ramp;
mod shutdown;

pub use aggregator::{AggregateStats, Aggregator, SessionRecord, StatsSnapshot, StatusCounts};
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunSummary};
pub use ramp::{schedule, BatchPlan, RampOutcome, RampPlan};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal, Wait};

#[cfg(test)]
mod tests;
