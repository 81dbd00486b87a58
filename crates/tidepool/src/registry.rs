//! The two worker collections a pool samples from.
//!
//! - [`EternalRegistry`] is filled once at construction and never changes
//!   afterwards, so it is read without any lock.
//! - [`TemporaryRegistry`] grows when admission spawns a worker and shrinks
//!   when a temporary worker stops. Every structural change, and every sample,
//!   happens under its mutex.

use crate::{
    Job, RandSource, Worker, WorkerId,
    selector::power_of_two,
    worker::Unregister,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Workers<J> = Vec<Arc<Worker<J>>>;

pub(crate) struct EternalRegistry<J: Job> {
    workers: Box<[Arc<Worker<J>>]>,
}

impl<J: Job> EternalRegistry<J> {
    pub(crate) fn new(workers: Workers<J>) -> Self {
        Self {
            workers: workers.into_boxed_slice(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn workers(&self) -> &[Arc<Worker<J>>] {
        &self.workers
    }

    pub(crate) fn select(&self, rand: &dyn RandSource) -> Option<Arc<Worker<J>>> {
        power_of_two(&self.workers, rand).cloned()
    }
}

pub(crate) struct TemporaryRegistry<J: Job> {
    workers: Arc<Mutex<Workers<J>>>,
}

impl<J: Job> TemporaryRegistry<J> {
    pub(crate) fn new() -> Self {
        Self {
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.lock().len()
    }

    pub(crate) fn snapshot(&self) -> Workers<J> {
        self.workers.lock().clone()
    }

    pub(crate) fn contains(&self, id: WorkerId) -> bool {
        self.workers.lock().iter().any(|w| w.id() == id)
    }

    pub(crate) fn select(&self, rand: &dyn RandSource) -> Option<Arc<Worker<J>>> {
        let workers = self.workers.lock();
        power_of_two(&workers, rand).cloned()
    }

    /// Runs `f` while holding the registry lock, serializing it with every
    /// spawn and removal.
    pub(crate) fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _workers = self.workers.lock();
        f()
    }

    /// Spawns and registers a worker while holding the registry lock.
    ///
    /// `spawn` receives the callback the new worker must run when it stops; it
    /// may decline by returning `None`, in which case nothing is registered.
    /// A worker that stops before registration completes blocks on the same
    /// lock, so its removal always observes the insertion.
    pub(crate) fn spawn_with<F>(&self, spawn: F) -> Option<Arc<Worker<J>>>
    where
        F: FnOnce(Unregister) -> Option<Arc<Worker<J>>>,
    {
        let mut workers = self.workers.lock();
        let worker = spawn(self.unregister_callback())?;
        workers.push(Arc::clone(&worker));
        Some(worker)
    }

    /// Builds the self-removal callback handed to a temporary worker.
    ///
    /// It holds only a weak handle to the storage, never to the pool, so a
    /// dropped pool does not stay alive through its workers.
    fn unregister_callback(&self) -> Unregister {
        let workers = Arc::downgrade(&self.workers);
        Box::new(move |id| remove(&workers, id))
    }
}

/// Linear scan by id. Ids come from an external source and are not sorted.
fn remove<J: Job>(workers: &Weak<Mutex<Workers<J>>>, id: WorkerId) {
    let Some(workers) = workers.upgrade() else {
        return;
    };
    let mut workers = workers.lock();
    if let Some(pos) = workers.iter().position(|w| w.id() == id) {
        workers.swap_remove(pos);
        #[cfg(feature = "tracing")]
        tracing::debug!(worker = %id, remaining = workers.len(), "Temporary worker unregistered");
    }
}
