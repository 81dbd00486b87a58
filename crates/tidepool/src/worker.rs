//! A single processing unit of the pool.
//!
//! Each [`Worker`] owns a bounded intake queue, an atomic load counter and a
//! backpressure flag. Its run loop is a Tokio task that executes queued jobs
//! one at a time, in FIFO order, until the worker's cancellation token fires.
//!
//! The handle ([`Worker`]) is shared through an `Arc` by the registries and by
//! the run loop itself. The run loop never hands out a reference to the pool,
//! so a temporary worker reaches its registry only through the unregister
//! callback it was spawned with.

use crate::{Job, WorkerId};
use core::{fmt, panic::AssertUnwindSafe, time::Duration};
use futures::FutureExt;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, sleep_until},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Whether a worker lives for the whole pool or expires on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Eternal,
    Temporary,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Eternal => write!(f, "eternal"),
            WorkerKind::Temporary => write!(f, "temporary"),
        }
    }
}

/// Called once with the worker's own id when a temporary worker stops.
pub(crate) type Unregister = Box<dyn FnOnce(WorkerId) + Send + 'static>;

pub(crate) enum Lifecycle {
    Eternal,
    Temporary {
        expiry: Duration,
        unregister: Unregister,
    },
}

/// Why a run loop stopped taking jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Shutdown,
    Expired,
}

/// Shared handle to a running worker.
pub struct Worker<J: Job> {
    id: WorkerId,
    kind: WorkerKind,
    capacity: usize,
    /// Queued plus in-flight jobs. Never exceeds `capacity`.
    job_num: AtomicUsize,
    blocking: AtomicBool,
    intake: mpsc::Sender<J>,
    token: CancellationToken,
}

impl<J: Job> Worker<J> {
    /// Creates a worker and starts its run loop on `tracker`.
    ///
    /// The worker's own cancellation context is a child of `master`, so
    /// cancelling `master` reaches every worker. A temporary worker also
    /// cancels its own context once its expiry elapses, and keeps watching
    /// `master` while it runs the jobs it had already accepted. An expiry too
    /// large to represent as a deadline never elapses.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or if called outside a Tokio runtime. The
    /// pool validates both before spawning.
    pub(crate) fn spawn(
        id: WorkerId,
        capacity: usize,
        lifecycle: Lifecycle,
        master: &CancellationToken,
        tracker: &TaskTracker,
    ) -> Arc<Self> {
        let (intake, rx) = mpsc::channel(capacity);
        let (kind, deadline, unregister) = match lifecycle {
            Lifecycle::Eternal => (WorkerKind::Eternal, None, None),
            Lifecycle::Temporary { expiry, unregister } => (
                WorkerKind::Temporary,
                Instant::now().checked_add(expiry),
                Some(unregister),
            ),
        };

        let worker = Arc::new(Self {
            id,
            kind,
            capacity,
            job_num: AtomicUsize::new(0),
            blocking: AtomicBool::new(false),
            intake,
            token: master.child_token(),
        });

        tracker.spawn(Arc::clone(&worker).run_loop(rx, master.clone(), deadline, unregister));
        worker
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of queued plus in-flight jobs.
    pub fn load(&self) -> usize {
        self.job_num.load(Ordering::Acquire)
    }

    /// Returns `true` if the worker can take at least one more job right now.
    pub fn is_admissible(&self) -> bool {
        self.load() < self.capacity
    }

    /// Backpressure hint: the last admission attempt found the queue full and
    /// no job has completed since. May be one job stale.
    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::Acquire)
    }

    /// Returns `true` once the worker has stopped (or is stopping) and will
    /// accept nothing new.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Attempts to enqueue `job` without waiting.
    ///
    /// A load slot is reserved with a compare-and-swap before the job is
    /// queued, so concurrent senders can never push `load()` past
    /// `capacity()`. If the worker is full the backpressure flag is raised
    /// and the job is dropped; if the worker has already stopped the job is
    /// dropped as well. Both cases return `false`.
    pub fn send_job(&self, job: J) -> bool {
        let reserved = self
            .job_num
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            });

        if reserved.is_err() {
            self.blocking.store(true, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::trace!(worker = %self.id, kind = %self.kind, "Worker full, job refused");
            return false;
        }

        match self.intake.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // Unreachable while the reservation above holds, since a
                // queued job always owns one unit of `job_num`.
                self.job_num.fetch_sub(1, Ordering::AcqRel);
                self.blocking.store(true, Ordering::Release);
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.job_num.fetch_sub(1, Ordering::AcqRel);
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    worker = %self.id,
                    kind = %self.kind,
                    "Worker stopped, job refused"
                );
                false
            }
        }
    }

    async fn run_loop(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<J>,
        master: CancellationToken,
        deadline: Option<Instant>,
        unregister: Option<Unregister>,
    ) {
        #[cfg(feature = "tracing")]
        tracing::debug!(worker = %self.id, kind = %self.kind, "Worker started");

        let expiry = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => core::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        let exit = loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => break Exit::Shutdown,
                () = &mut expiry => {
                    self.token.cancel();
                    break Exit::Expired;
                }
                job = rx.recv() => match job {
                    Some(job) => self.execute(job).await,
                    // The handle holds a sender, so this only happens if the
                    // channel was closed from our side.
                    None => break Exit::Shutdown,
                },
            }
        };

        rx.close();

        if let Some(unregister) = unregister {
            unregister(self.id);
        }

        match exit {
            // Jobs already admitted to an expiring worker still run while the
            // pool is open. A pool shutdown mid-drain drops the rest.
            Exit::Expired => loop {
                tokio::select! {
                    biased;
                    () = master.cancelled() => {
                        self.drop_queued(&mut rx);
                        break;
                    }
                    job = rx.recv() => match job {
                        Some(job) => self.execute(job).await,
                        None => break,
                    },
                }
            },
            Exit::Shutdown => self.drop_queued(&mut rx),
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(worker = %self.id, kind = %self.kind, ?exit, "Worker stopped");
    }

    /// Discards everything still queued in a closed intake.
    fn drop_queued(&self, rx: &mut mpsc::Receiver<J>) {
        let mut dropped = 0;
        while let Ok(job) = rx.try_recv() {
            drop(job);
            dropped += 1;
        }
        if dropped > 0 {
            self.job_num.fetch_sub(dropped, Ordering::AcqRel);
            self.blocking.store(false, Ordering::Release);
            #[cfg(feature = "tracing")]
            tracing::debug!(worker = %self.id, dropped, "Dropped queued jobs on shutdown");
        }
    }

    async fn execute(&self, job: J) {
        #[cfg(feature = "tracing")]
        tracing::trace!(worker = %self.id, load = self.load(), "Running job");

        if AssertUnwindSafe(job.run()).catch_unwind().await.is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(worker = %self.id, kind = %self.kind, "Job panicked");
        }

        let remaining = self.job_num.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining < self.capacity {
            self.blocking.store(false, Ordering::Release);
        }
    }
}

impl<J: Job> fmt::Debug for Worker<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("capacity", &self.capacity)
            .field("load", &self.load())
            .field("blocking", &self.is_blocking())
            .finish()
    }
}
