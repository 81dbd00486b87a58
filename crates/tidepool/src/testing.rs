//! Helpers shared by the unit tests.

use crate::BoxJob;
use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Jobs produced by a gate park until [`Gate::open`] is called.
#[derive(Clone)]
pub(crate) struct Gate {
    permits: Arc<Semaphore>,
    finished: Arc<AtomicUsize>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn job(&self) -> BoxJob {
        let permits = Arc::clone(&self.permits);
        let finished = Arc::clone(&self.finished);
        BoxJob::new(async move {
            // A closed semaphore is the open gate.
            let _ = permits.acquire().await;
            finished.fetch_add(1, Ordering::AcqRel);
        })
    }

    pub(crate) fn open(&self) {
        self.permits.close();
    }

    pub(crate) fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }
}

pub(crate) fn sleeping_job(millis: u64, finished: &Arc<AtomicUsize>) -> BoxJob {
    let finished = Arc::clone(finished);
    BoxJob::new(async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        finished.fetch_add(1, Ordering::AcqRel);
    })
}

/// Lets every runnable task make progress. Under a paused clock the runtime
/// only advances time once all tasks are idle.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
