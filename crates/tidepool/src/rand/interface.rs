/// A trait for random sources that pick uniformly distributed indices.
///
/// The selector draws its two candidates through this abstraction, so you can
/// plug in the thread-local RNG, a seeded RNG for reproducible runs, or a
/// scripted source in tests.
///
/// Implementations are shared by every caller of the pool and must be safe to
/// use concurrently.
///
/// # Example
/// ```
/// use tidepool::RandSource;
///
/// struct AlwaysFirst;
/// impl RandSource for AlwaysFirst {
///     fn index(&self, _bound: usize) -> usize {
///         0
///     }
/// }
///
/// assert_eq!(AlwaysFirst.index(8), 0);
/// ```
pub trait RandSource: Send + Sync {
    /// Returns an index in `0..bound`. `bound` is always greater than zero.
    fn index(&self, bound: usize) -> usize;
}
