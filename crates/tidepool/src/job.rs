use core::{fmt, future::Future, pin::Pin};

/// A unit of work accepted by a [`Pool`].
///
/// The pool never inspects a job. Once admitted it is owned by exactly one
/// worker, which calls [`Job::run`] and awaits it to completion before taking
/// the next job from its queue.
///
/// A job that is still queued when the pool shuts down is dropped without
/// being run, so owners that need to observe the outcome should hold something
/// that reports on drop (a `oneshot::Sender`, for instance).
///
/// [`Pool`]: crate::Pool
pub trait Job: Send + 'static {
    /// Consumes the job and performs its work.
    fn run(self) -> impl Future<Output = ()> + Send;
}

/// A type-erased [`Job`] wrapping any `Send` future.
///
/// Handy when one pool must carry jobs produced by different `async` blocks.
///
/// # Example
/// ```
/// use tidepool::{BoxJob, Pool, PoolConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tidepool::Result<()> {
/// let pool = Pool::<BoxJob>::new(PoolConfig::default())?;
/// assert!(pool.do_job(BoxJob::new(async { /* work */ })).await);
/// pool.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct BoxJob(Pin<Box<dyn Future<Output = ()> + Send + 'static>>);

impl BoxJob {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(Box::pin(fut))
    }
}

impl fmt::Debug for BoxJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxJob").finish_non_exhaustive()
    }
}

impl Job for BoxJob {
    fn run(self) -> impl Future<Output = ()> + Send {
        self.0
    }
}
