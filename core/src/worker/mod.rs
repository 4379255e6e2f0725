//! Session task: the per-connection state machine
//!
//! Each session is one tokio task that walks a single path:
//! **connect -> (retry with backoff)* -> keepalive -> exit**.
//!
//! 1. Picks a routing path and asks the SessionProvider for a credential
//! 2. Dials the Transport, bounded by the dial timeout
//! 3. On failure backs off 4-8s and tries again, up to the retry budget
//! 4. Once connected, alternates handshake and ping every 11-18s
//! 5. Reports every transition to its Reporter
//!
//! Every wait races the shutdown signal, and the connection is closed on
//! every way out.
//!
//! # Example
//!
//! ```ignore
//! use swarm_bench_core::worker::SessionTaskBuilder;
//!
//! let task = SessionTaskBuilder::new(0)
//!     .target(target)
//!     .provider(provider)
//!     .transport(transport)
//!     .routes(routes)
//!     .reporter(aggregator)
//!     .build()?;
//!
//! let state = task.run(shutdown.signal()).await;
//! println!("Session ended as {}", state.status);
//! ```

mod builder;
mod executor;
mod jitter;

pub use builder::SessionTaskBuilder;
pub use executor::SessionTask;
pub use jitter::Jitter;
