//! The elastic dispatcher.
//!
//! A [`Pool`] owns a fixed set of eternal workers, spawned at construction,
//! and a growable set of temporary workers spawned when admission runs out of
//! room. Every worker's cancellation token is a child of the pool's master
//! token, so [`Pool::close`] reaches all of them at once.
//!
//! ## Admission
//!
//! [`Pool::do_job`] escalates through these stages and stops at the first one
//! that yields a non-blocking worker:
//!
//! 1. one power-of-two-choices sample over the eternal workers;
//! 2. `retry.attempts` timed samples over the eternal workers, `retry.interval`
//!    apart;
//! 3. the same timed sampling over the temporary workers;
//! 4. a freshly spawned temporary worker, used unconditionally.
//!
//! The chosen worker's [`send_job`](crate::Worker::send_job) decides the
//! outcome. A caller therefore waits at most [`RetryPolicy::budget`] before
//! its job is admitted or refused.


use crate::{
    AtomicIdSource, Error, IdSource, Job, PoolConfig, SampleMode, RandSource, Result, RetryPolicy,
    ThreadRandom, Worker, WorkerId,
    config::MIN_WORKERS,
    registry::{EternalRegistry, TemporaryRegistry},
    worker::{Lifecycle, Unregister},
};
use core::{fmt, marker::PhantomData};
use portable_atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Registry consulted by one escalation stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Eternal,
    Temporary,
}

/// The pool closed while a caller was waiting between samples.
struct Closed;

/// A point-in-time view of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub eternal_workers: usize,
    pub temporary_workers: usize,
    /// Queued plus in-flight jobs summed over every registered worker.
    pub load: usize,
    /// Workers whose backpressure flag is currently raised.
    pub blocking_workers: usize,
    pub closed: bool,
}

/// An elastic pool of workers executing jobs of type `J`.
///
/// `Pool` is `Send + Sync`; share it between callers through an `Arc`.
/// Dropping it closes it.
pub struct Pool<J: Job> {
    config: PoolConfig,
    eternal: EternalRegistry<J>,
    temporary: TemporaryRegistry<J>,
    closed: AtomicBool,
    master: CancellationToken,
    tracker: TaskTracker,
    rand: Arc<dyn RandSource>,
    ids: Arc<dyn IdSource>,
}

impl<J: Job> Pool<J> {
    /// Builds a pool with the default sampling source, id source and tracker,
    /// and starts its eternal workers.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `config.worker_count` is below [`MIN_WORKERS`].
    /// - `config.capacity` is zero.
    /// - No Tokio runtime is running on the current thread.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: PoolConfig) -> PoolBuilder<J> {
        PoolBuilder {
            config,
            rand: None,
            ids: None,
            tracker: None,
            _job: PhantomData,
        }
    }

    fn start(
        config: PoolConfig,
        rand: Arc<dyn RandSource>,
        ids: Option<Arc<dyn IdSource>>,
        tracker: TaskTracker,
    ) -> Result<Self> {
        if config.worker_count < MIN_WORKERS {
            return Err(Error::TooFewWorkers {
                requested: config.worker_count,
                minimum: MIN_WORKERS,
            });
        }
        if config.capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::NoRuntime);
        }

        let master = CancellationToken::new();
        let workers = (1..=config.worker_count as u64)
            .map(|raw| {
                Worker::spawn(
                    WorkerId::new(raw),
                    config.capacity,
                    Lifecycle::Eternal,
                    &master,
                    &tracker,
                )
            })
            .collect();

        let ids = ids.unwrap_or_else(|| {
            Arc::new(AtomicIdSource::new(config.worker_count as u64 + 1))
        });

        #[cfg(feature = "tracing")]
        tracing::info!(
            workers = config.worker_count,
            capacity = config.capacity,
            expiry = ?config.expiry,
            "Pool opened"
        );

        Ok(Self {
            config,
            eternal: EternalRegistry::new(workers),
            temporary: TemporaryRegistry::new(),
            closed: AtomicBool::new(false),
            master,
            tracker,
            rand,
            ids,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn eternal_count(&self) -> usize {
        self.eternal.len()
    }

    pub fn temporary_count(&self) -> usize {
        self.temporary.len()
    }

    /// Submits `job`, escalating as described in the [module docs](self).
    ///
    /// Returns `false` without side effects if the pool is closed, and `false`
    /// if the pool closes while the caller waits between samples. Otherwise
    /// returns the chosen worker's `send_job` result, which is `false` only if
    /// that worker filled up or stopped after it was sampled.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn do_job(&self, job: J) -> bool {
        if self.is_closed() {
            return false;
        }

        let mut chosen = self.sample(Stage::Eternal);

        if !usable(chosen.as_ref()) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Eternal workers saturated, retrying");
            match self.retry_stage(Stage::Eternal).await {
                Ok(worker) => chosen = worker,
                Err(Closed) => return false,
            }
        }

        if !usable(chosen.as_ref()) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Eternal retries exhausted, probing temporary workers");
            match self.retry_stage(Stage::Temporary).await {
                Ok(worker) => chosen = worker,
                Err(Closed) => return false,
            }
        }

        let worker = match chosen {
            Some(worker) if !worker.is_blocking() => worker,
            _ => match self.spawn_temporary() {
                Some(worker) => worker,
                None => return false,
            },
        };

        let admitted = worker.send_job(job);
        if !admitted {
            #[cfg(feature = "tracing")]
            tracing::warn!(worker = %worker.id(), kind = %worker.kind(), "Job rejected");
        }
        admitted
    }

    /// Closes the pool. Idempotent.
    ///
    /// New admissions are refused from now on, and every worker's run loop
    /// stops once its in-flight job finishes. Use [`Pool::wait`] to observe
    /// the drain.
    ///
    /// The flag flips under the temporary registry lock, so a concurrent
    /// spawn either finishes first (and its worker is cancelled here) or sees
    /// the pool closed.
    pub fn close(&self) {
        let first = self.temporary.exclusive(|| {
            if self.closed.swap(true, Ordering::AcqRel) {
                return false;
            }
            self.master.cancel();
            true
        });
        if !first {
            return;
        }
        self.tracker.close();

        #[cfg(feature = "tracing")]
        tracing::info!("Pool closed");
    }

    /// Resolves once the pool is closed and every worker it spawned, eternal
    /// or temporary, has exited.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// [`close`](Self::close) followed by [`wait`](Self::wait).
    pub async fn shutdown(&self) {
        self.close();
        self.wait().await;

        #[cfg(feature = "tracing")]
        tracing::info!("Pool drained");
    }

    pub fn stats(&self) -> PoolStats {
        let temporary = self.temporary.snapshot();
        let workers = self.eternal.workers().iter().chain(temporary.iter());

        let mut stats = PoolStats {
            eternal_workers: self.eternal.len(),
            temporary_workers: temporary.len(),
            closed: self.is_closed(),
            ..PoolStats::default()
        };
        for worker in workers {
            stats.load += worker.load();
            stats.blocking_workers += usize::from(worker.is_blocking());
        }
        stats
    }

    fn sample(&self, stage: Stage) -> Option<Arc<Worker<J>>> {
        match stage {
            Stage::Eternal => self.eternal.select(&*self.rand),
            Stage::Temporary => self.temporary.select(&*self.rand),
        }
    }

    /// Timed re-sampling of one registry.
    ///
    /// With [`SampleMode::LastAttempt`] every attempt runs and only the final
    /// sample is returned, admissible or not.
    async fn retry_stage(
        &self,
        stage: Stage,
    ) -> core::result::Result<Option<Arc<Worker<J>>>, Closed> {
        let RetryPolicy {
            attempts,
            interval,
            mode,
        } = self.config.retry;

        let mut chosen = None;
        for _attempt in 0..attempts {
            tokio::select! {
                biased;
                () = self.master.cancelled() => return Err(Closed),
                () = sleep(interval) => {}
            }

            chosen = self.sample(stage);

            #[cfg(feature = "tracing")]
            tracing::trace!(
                ?stage,
                attempt = _attempt + 1,
                found = chosen.is_some(),
                "Retry sample"
            );

            if mode == SampleMode::FirstAdmissible && usable(chosen.as_ref()) {
                break;
            }
        }
        Ok(chosen)
    }

    /// Spawns a temporary worker unless the pool has closed.
    ///
    /// The closed flag is checked under the temporary registry lock.
    fn spawn_temporary(&self) -> Option<Arc<Worker<J>>> {
        self.temporary.spawn_with(|unregister| {
            if self.is_closed() {
                return None;
            }
            Some(self.start_temporary(unregister))
        })
    }

    /// Starts a temporary worker. The caller holds the registry lock.
    fn start_temporary(&self, unregister: Unregister) -> Arc<Worker<J>> {
        let worker = Worker::spawn(
            self.ids.next_id(),
            self.config.capacity,
            Lifecycle::Temporary {
                expiry: self.config.expiry,
                unregister,
            },
            &self.master,
            &self.tracker,
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            worker = %worker.id(),
            expiry = ?self.config.expiry,
            "Spawned temporary worker"
        );

        worker
    }

    #[cfg(test)]
    pub(crate) fn temporary_contains(&self, id: WorkerId) -> bool {
        self.temporary.contains(id)
    }

    #[cfg(test)]
    pub(crate) fn all_workers(&self) -> Vec<Arc<Worker<J>>> {
        let mut workers = self.eternal.workers().to_vec();
        workers.extend(self.temporary.snapshot());
        workers
    }
}

impl<J: Job> Drop for Pool<J> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<J: Job> fmt::Debug for Pool<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn usable<J: Job>(worker: Option<&Arc<Worker<J>>>) -> bool {
    worker.is_some_and(|w| !w.is_blocking())
}

/// Configures the collaborators of a [`Pool`] before starting it.
///
/// # Example
/// ```
/// use tidepool::{BoxJob, Pool, PoolConfig, SeededRandom};
/// use std::sync::Arc;
/// use tokio_util::task::TaskTracker;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tidepool::Result<()> {
/// let tracker = TaskTracker::new();
/// let pool = Pool::<BoxJob>::builder(PoolConfig::default())
///     .rand_source(Arc::new(SeededRandom::new(7)))
///     .tracker(tracker.clone())
///     .build()?;
///
/// pool.close();
/// tracker.wait().await;
/// # Ok(())
/// # }
/// ```
pub struct PoolBuilder<J: Job> {
    config: PoolConfig,
    rand: Option<Arc<dyn RandSource>>,
    ids: Option<Arc<dyn IdSource>>,
    tracker: Option<TaskTracker>,
    _job: PhantomData<fn() -> J>,
}

impl<J: Job> PoolBuilder<J> {
    /// Sampling source for the selector. Defaults to [`ThreadRandom`].
    #[must_use]
    pub fn rand_source(mut self, rand: Arc<dyn RandSource>) -> Self {
        self.rand = Some(rand);
        self
    }

    /// Identity source for temporary workers. Defaults to an
    /// [`AtomicIdSource`] starting after the last eternal id.
    #[must_use]
    pub fn id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Tracker that every worker task is spawned on. The pool closes it in
    /// [`Pool::close`]; waiting on a clone observes the drain.
    #[must_use]
    pub fn tracker(mut self, tracker: TaskTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Validates the configuration and starts the eternal workers.
    ///
    /// # Errors
    ///
    /// See [`Pool::new`].
    pub fn build(self) -> Result<Pool<J>> {
        Pool::start(
            self.config,
            self.rand.unwrap_or_else(|| Arc::new(ThreadRandom)),
            self.ids,
            self.tracker.unwrap_or_default(),
        )
    }
}
