//! # `tidepool`: an elastic async worker pool
//!
//! `tidepool` dispatches opaque async [`Job`]s onto a pool of Tokio worker
//! tasks. A fixed number of **eternal** workers is started with the pool;
//! under load the pool spawns **temporary** workers that remove themselves
//! once their expiry elapses.
//!
//! Workers are chosen with power-of-two-choices: two random workers are
//! sampled and the less-loaded one wins. When every sample is saturated the
//! pool waits a bounded amount of time for load to subside before growing.
//!
//! ## Highlights
//!
//! - **Bounded intake**: each worker accepts at most `capacity` queued plus
//!   in-flight jobs, enforced with an atomic reservation.
//! - **Backpressure hint**: a worker that refused a job stays flagged until it
//!   completes one, steering admission elsewhere.
//! - **Bounded latency**: a caller waits at most the retry budget before its
//!   job is admitted, normally by a fresh temporary worker.
//! - **Coordinated shutdown**: one master cancellation token reaches every
//!   worker; a task tracker reports when all of them have exited.
//!
//! ## Example
//!
//! ```
//! use tidepool::{BoxJob, Pool, PoolConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tidepool::Result<()> {
//! let pool = Pool::new(PoolConfig::new(2, 8, Duration::from_secs(30)))?;
//!
//! let admitted = pool
//!     .do_job(BoxJob::new(async {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }))
//!     .await;
//! assert!(admitted);
//!
//! pool.shutdown().await;
//! assert!(!pool.do_job(BoxJob::new(async {})).await);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit worker lifecycle and admission events through
//!   [`tracing`](https://docs.rs/tracing).

mod config;
mod error;
mod id;
mod job;
mod pool;
mod rand;
mod registry;
mod selector;
#[cfg(test)]
mod testing;
mod worker;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::id::*;
pub use crate::job::*;
pub use crate::pool::*;
pub use crate::rand::*;
pub use crate::selector::*;
pub use crate::worker::{Worker, WorkerKind};
