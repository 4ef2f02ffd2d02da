use super::Replace;

/// Deterministic replacement cycling through the ways in order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next_way: usize,
    n_ways: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin::default()
    }
}

impl Replace for RoundRobin {
    fn configure(&mut self, n_ways: usize) {
        assert!(n_ways > 0);
        self.n_ways = n_ways;
        self.next_way = 0;
    }

    fn victim(&mut self) -> usize {
        let way = self.next_way;
        self.next_way = (self.next_way + 1) % self.n_ways;
        way
    }
}
