//! Error types for pool construction.
//!
//! Admission never produces an error: [`Pool::do_job`] reports a rejected job
//! with `false`. The only fallible operation is building the pool itself.
//!
//! ## Error Cases
//! - `TooFewWorkers`: fewer eternal workers than the power-of-two-choices
//!   selector needs.
//! - `ZeroCapacity`: a worker with no intake queue could never accept a job.
//! - `NoRuntime`: the pool was built outside a tokio runtime, so worker tasks
//!   cannot be spawned.
//!
//! [`Pool::do_job`]: crate::Pool::do_job

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `tidepool` can emit.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The configured eternal worker count is below the supported minimum.
    #[error("worker count must be at least {minimum}, got {requested}")]
    TooFewWorkers { requested: usize, minimum: usize },

    /// Per-worker capacity was configured as zero.
    #[error("worker capacity must be greater than 0")]
    ZeroCapacity,

    /// No tokio runtime was available to host the worker tasks.
    #[error("a tokio runtime is required to start the pool")]
    NoRuntime,
}
