use crate::RandSource;
use rand::{Rng, rng};

/// The default sampling source of a [`Pool`](crate::Pool).
///
/// Every pick goes through the calling thread's own generator (`rand::rng()`),
/// so pool callers on different runtime threads never contend on one RNG. The
/// type itself is zero-sized and stateless, which is what makes it `Sync`.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn index(&self, bound: usize) -> usize {
        rng().random_range(0..bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_within_bound() {
        for bound in 1..=9 {
            for _ in 0..100 {
                assert!(ThreadRandom.index(bound) < bound);
            }
        }
        assert_eq!(ThreadRandom.index(1), 0);
    }
}
