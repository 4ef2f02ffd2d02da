use super::Replace;

/// Source of uniform draws for [`Random`].
pub trait RandomSource {
    /// Returns an index in `[0, bound)`. `bound` is never zero.
    fn next(&mut self, bound: usize) -> usize;
}

impl RandomSource for fastrand::Rng {
    fn next(&mut self, bound: usize) -> usize {
        self.usize(0..bound)
    }
}

/// Scripted draws, replayed in order and wrapped around when exhausted.
#[derive(Debug, Clone)]
pub struct Sequence {
    draws: Vec<usize>,
    idx: usize,
}

impl Sequence {
    pub fn new(draws: Vec<usize>) -> Self {
        assert!(!draws.is_empty());
        Sequence { draws, idx: 0 }
    }
}

impl RandomSource for Sequence {
    fn next(&mut self, bound: usize) -> usize {
        let draw = self.draws[self.idx];
        self.idx = (self.idx + 1) % self.draws.len();
        draw % bound
    }
}

/// Uniform random replacement. Validity and recency are ignored, so a fill
/// may land on a valid way while another way in the set is still empty.
pub struct Random<S: RandomSource = fastrand::Rng> {
    rng: S,
    n_ways: usize,
}

impl Random {
    pub fn new() -> Self {
        Random::with_source(fastrand::Rng::new())
    }

    pub fn seeded(seed: u64) -> Self {
        Random::with_source(fastrand::Rng::with_seed(seed))
    }
}

impl Default for Random {
    fn default() -> Self {
        Random::new()
    }
}

impl<S: RandomSource> Random<S> {
    pub fn with_source(rng: S) -> Self {
        Random { rng, n_ways: 0 }
    }
}

impl<S: RandomSource> Replace for Random<S> {
    fn configure(&mut self, n_ways: usize) {
        assert!(n_ways > 0);
        self.n_ways = n_ways;
    }

    fn victim(&mut self) -> usize {
        let way = self.rng.next(self.n_ways);
        log::trace!("random victim: way {way} of {}", self.n_ways);
        way
    }
}
