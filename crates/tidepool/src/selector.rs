//! Power-of-two-choices worker selection.
//!
//! Sampling two random candidates and keeping the less-loaded one gets close
//! to least-loaded routing without maintaining a global, consistent load index,
//! which would be expensive to keep correct under many concurrent writers.
//! Load values are read once per candidate and may already be stale by the time
//! the caller acts on them; the caller's `send_job` is the final arbiter.

use crate::{Job, RandSource, Worker};
use std::sync::Arc;

/// Anything with a current load and a fixed capacity.
pub trait Loaded {
    fn load(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_admissible(&self) -> bool {
        self.load() < self.capacity()
    }
}

impl<J: Job> Loaded for Worker<J> {
    fn load(&self) -> usize {
        Worker::load(self)
    }

    fn capacity(&self) -> usize {
        Worker::capacity(self)
    }
}

impl<T: Loaded + ?Sized> Loaded for Arc<T> {
    fn load(&self) -> usize {
        (**self).load()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

/// Picks the less-loaded of two distinct random candidates.
///
/// Returns `None` ("no admissible worker") when `candidates` is empty, when
/// its single element is saturated, or when both sampled candidates are at or
/// above capacity. Ties go to the first sample.
pub fn power_of_two<'a, T, R>(candidates: &'a [T], rand: &R) -> Option<&'a T>
where
    T: Loaded,
    R: RandSource + ?Sized,
{
    match candidates {
        [] => None,
        // Two distinct samples cannot be drawn from one element.
        [only] => only.is_admissible().then_some(only),
        _ => {
            let n = candidates.len();
            let first = rand.index(n);
            let mut second = rand.index(n);
            while second == first {
                second = rand.index(n);
            }

            let (a, b) = (&candidates[first], &candidates[second]);
            let (load_a, load_b) = (a.load(), b.load());
            match (load_a < a.capacity(), load_b < b.capacity()) {
                (false, false) => None,
                (true, false) => Some(a),
                (false, true) => Some(b),
                (true, true) => Some(if load_b < load_a { b } else { a }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SeededRandom, ThreadRandom};
    use portable_atomic::{AtomicUsize, Ordering};

    struct Fake {
        load: usize,
        capacity: usize,
    }

    impl Loaded for Fake {
        fn load(&self) -> usize {
            self.load
        }

        fn capacity(&self) -> usize {
            self.capacity
        }
    }

    fn fakes(loads: &[usize], capacity: usize) -> Vec<Fake> {
        loads.iter().map(|&load| Fake { load, capacity }).collect()
    }

    /// Replays a fixed script of indices.
    struct Scripted {
        picks: Vec<usize>,
        next: AtomicUsize,
    }

    impl Scripted {
        fn new(picks: Vec<usize>) -> Self {
            Self {
                picks,
                next: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.next.load(Ordering::Relaxed)
        }
    }

    impl RandSource for Scripted {
        fn index(&self, bound: usize) -> usize {
            let i = self.next.fetch_add(1, Ordering::Relaxed);
            self.picks[i] % bound
        }
    }

    #[test]
    fn empty_registry_has_no_candidate() {
        let none: Vec<Fake> = Vec::new();
        assert!(power_of_two(&none, &ThreadRandom).is_none());
    }

    #[test]
    fn single_candidate_is_special_cased() {
        let free = fakes(&[3], 4);
        assert!(power_of_two(&free, &ThreadRandom).is_some());

        let full = fakes(&[4], 4);
        assert!(power_of_two(&full, &ThreadRandom).is_none());
    }

    #[test]
    fn picks_the_less_loaded_sample() {
        let workers = fakes(&[3, 0, 2, 1], 4);
        let rand = Scripted::new(vec![0, 2]);
        let chosen = power_of_two(&workers, &rand).unwrap();
        assert_eq!(chosen.load, 2);
    }

    #[test]
    fn resamples_on_collision() {
        let workers = fakes(&[1, 0, 0], 4);
        let rand = Scripted::new(vec![2, 2, 2, 0]);
        let chosen = power_of_two(&workers, &rand).unwrap();
        assert_eq!(rand.calls(), 4);
        assert_eq!(chosen.load, 0);
    }

    #[test]
    fn both_saturated_means_no_candidate() {
        let workers = fakes(&[4, 4, 0], 4);
        let rand = Scripted::new(vec![0, 1]);
        assert!(power_of_two(&workers, &rand).is_none());
    }

    #[test]
    fn never_returns_a_saturated_worker() {
        let workers = fakes(&[4, 0, 4, 1, 4, 4, 2, 4], 4);
        let rand = SeededRandom::new(7);
        for _ in 0..1_000 {
            if let Some(w) = power_of_two(&workers, &rand) {
                assert!(w.load < w.capacity);
            }
        }
    }

    #[test]
    fn samples_every_index_eventually() {
        let workers = fakes(&[0, 0, 0, 0, 0], 1);
        let mut hit = [false; 5];
        for _ in 0..1_000 {
            let w = power_of_two(&workers, &ThreadRandom).unwrap();
            let idx = workers
                .iter()
                .position(|c| core::ptr::eq(c, w))
                .unwrap();
            hit[idx] = true;
        }
        assert!(hit.iter().all(|h| *h));
    }
}
