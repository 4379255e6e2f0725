//! Collaborator implementations for swarm-bench
//!
//! This crate provides concrete implementations of the core collaborator
//! traits:
//!
//! - `ProxyList`: a `RoutingPathSource` loaded from a `host:port:user:pass` file
//! - `SimulatedBackend`: an in-process `SessionProvider` + `Transport` with
//!   configurable latency and failure rates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod routing;
pub mod simulated;

pub use routing::{parse_line, ProxyList, RoutingError};
pub use simulated::{target_id_for, SimulatedBackend, SimulationConfig, SimulationCounters};
