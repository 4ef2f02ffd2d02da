pub mod random;
pub mod round_robin;

pub use random::{Random, RandomSource, Sequence};
pub use round_robin::RoundRobin;

/// Victim selection for a single set.
///
/// A policy instance is bound to one set and told its way count once, before
/// the first call to [`Replace::victim`].
pub trait Replace {
    fn configure(&mut self, n_ways: usize);
    fn victim(&mut self) -> usize;
}

impl<R: Replace + ?Sized> Replace for Box<R> {
    fn configure(&mut self, n_ways: usize) {
        (**self).configure(n_ways)
    }

    fn victim(&mut self) -> usize {
        (**self).victim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}
