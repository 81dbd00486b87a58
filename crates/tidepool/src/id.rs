use core::fmt;
use portable_atomic::{AtomicU64, Ordering};

/// Identity of a worker.
///
/// Eternal workers are numbered `1..=worker_count` in creation order.
/// Temporary workers receive whatever their pool's [`IdSource`] hands out;
/// only uniqueness is assumed, never ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supplies process-unique identities for temporary workers.
///
/// # Example
/// ```
/// use tidepool::{IdSource, WorkerId};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// // Hands out ids counting down, to show ordering does not matter.
/// struct Countdown(AtomicU64);
/// impl IdSource for Countdown {
///     fn next_id(&self) -> WorkerId {
///         WorkerId::new(self.0.fetch_sub(1, Ordering::Relaxed))
///     }
/// }
///
/// let ids = Countdown(AtomicU64::new(u64::MAX));
/// assert!(ids.next_id() > ids.next_id());
/// ```
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> WorkerId;
}

/// The default [`IdSource`]: a relaxed atomic counter.
///
/// The pool starts it just past the last eternal id, so temporary ids never
/// collide with eternal ones.
#[derive(Debug)]
pub struct AtomicIdSource {
    next: AtomicU64,
}

impl AtomicIdSource {
    /// Creates a source whose first id is `first`.
    pub const fn new(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdSource for AtomicIdSource {
    fn next_id(&self) -> WorkerId {
        WorkerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread::scope;

    #[test]
    fn atomic_source_is_unique_across_threads() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 512;

        let source = Arc::new(AtomicIdSource::new(3));
        let seen = parking_lot::Mutex::new(HashSet::with_capacity(THREADS * PER_THREAD));

        scope(|s| {
            for _ in 0..THREADS {
                let source = Arc::clone(&source);
                let seen = &seen;
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        let id = source.next_id();
                        assert!(id.get() >= 3);
                        assert!(seen.lock().insert(id), "duplicate id {id}");
                    }
                });
            }
        });

        assert_eq!(seen.lock().len(), THREADS * PER_THREAD);
    }
}
