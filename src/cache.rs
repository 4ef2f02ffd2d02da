use serde::Serialize;

use crate::{
    addr::{AddressParts, Layout},
    error::{Error, Result},
    line::{encode_word, word_range, Line},
    memory::MemoryStore,
    replace::{AccessResult, Replace},
    set::{CacheSet, SetSnapshot},
};

/// What a write that misses the cache does to the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Only memory is updated.
    #[default]
    NoAllocate,
    /// The line is filled from memory first, then patched.
    Allocate,
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    name: String,
    reads: u64,
    writes: u64,
    hits: u64,
    misses: u64,
    fills: u64,
    evictions: u64,
    miss_rate: f64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

/// Write-through set-associative cache in front of a [`MemoryStore`].
///
/// `M` is usually an owned [`MainMemory`](crate::memory::MainMemory), but a
/// `&mut` borrow of one works too when the memory must outlive the cache.
#[derive(Debug)]
pub struct Cache<M: MemoryStore, R: Replace> {
    name: String,
    layout: Layout,
    sets: Box<[CacheSet<R>]>,
    memory: M,
    write_policy: WritePolicy,
    reads: u64,
    writes: u64,
    hits: u64,
    misses: u64,
    fills: u64,
}

impl<M: MemoryStore, R: Replace> Cache<M, R> {
    /// Builds a cache with `n_ways` ways per set, asking `make_repl` for one
    /// policy instance per set.
    pub fn new(
        name: String,
        layout: Layout,
        n_ways: usize,
        memory: M,
        mut make_repl: impl FnMut() -> R,
    ) -> Self {
        assert!(n_ways > 0);
        let line_size = layout.line_size() as usize;
        Cache {
            name,
            layout,
            sets: (0..layout.sets())
                .map(|_| CacheSet::new(n_ways, line_size, make_repl()))
                .collect(),
            memory,
            write_policy: WritePolicy::default(),
            reads: 0,
            writes: 0,
            hits: 0,
            misses: 0,
            fills: 0,
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn split_addr(&self, addr: u32) -> AddressParts {
        self.layout.split(addr)
    }

    fn set(&self, parts: &AddressParts) -> &CacheSet<R> {
        &self.sets[parts.set as usize]
    }

    fn set_mut(&mut self, parts: &AddressParts) -> &mut CacheSet<R> {
        &mut self.sets[parts.set as usize]
    }

    /// Reports whether `addr` would hit, without touching any state.
    pub fn probe(&self, addr: u32) -> AccessResult {
        let parts = self.split_addr(addr);
        match self.set(&parts).find(parts.tag) {
            Some(_) => AccessResult::Hit,
            None => AccessResult::Miss,
        }
    }

    pub fn read(&mut self, addr: u32) -> Result<u32> {
        let parts = self.split_addr(addr);
        word_range(parts.offset, self.layout.line_size() as usize)?;

        if let Some(line) = self.set(&parts).find(parts.tag) {
            log::debug!(
                "read hit (addr: {addr:#x}, set: {}, tag: {:#x})",
                parts.set,
                parts.tag
            );
            let word = line.read_word(parts.offset)?;
            self.reads += 1;
            self.hit();
            return Ok(word);
        }

        log::debug!(
            "read miss (addr: {addr:#x}, set: {}, tag: {:#x})",
            parts.set,
            parts.tag
        );
        let word = self.fill(addr, &parts)?.read_word(parts.offset)?;
        self.reads += 1;
        self.miss();
        Ok(word)
    }

    pub fn write(&mut self, addr: u32, value: u32) -> Result<()> {
        let parts = self.split_addr(addr);
        word_range(parts.offset, self.layout.line_size() as usize)?;

        let hit = self.set(&parts).find(parts.tag).is_some();
        if !hit && self.write_policy == WritePolicy::Allocate {
            self.check_line_span(addr)?;
        }

        // Memory first: if the span is rejected the cache must stay as it was.
        self.memory.write_bytes(addr, &encode_word(value))?;
        self.writes += 1;

        if let Some(line) = self.set_mut(&parts).find_mut(parts.tag) {
            log::debug!(
                "write hit (addr: {addr:#x}, set: {}, tag: {:#x})",
                parts.set,
                parts.tag
            );
            line.write_word(parts.offset, value)?;
            self.hit();
            return Ok(());
        }

        log::debug!(
            "write miss (addr: {addr:#x}, set: {}, tag: {:#x})",
            parts.set,
            parts.tag
        );
        if self.write_policy == WritePolicy::Allocate {
            // Memory already holds the new word, so the fetched line is current.
            self.fill(addr, &parts)?;
        }
        self.miss();
        Ok(())
    }

    /// Fails unless the whole line holding `addr` lies within memory.
    fn check_line_span(&self, addr: u32) -> Result<()> {
        let base = self.layout.line_base(addr);
        let len = self.layout.line_size() as usize;
        let capacity = self.memory.capacity();
        match (base as usize).checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(Error::OutOfBounds {
                addr: base,
                len,
                capacity,
            }),
        }
    }

    /// Fetches the whole line holding `addr` and installs it in its set.
    fn fill(&mut self, addr: u32, parts: &AddressParts) -> Result<&mut Line> {
        let base = self.layout.line_base(addr);
        let mut buffer = vec![0; self.layout.line_size() as usize];
        self.memory.read_bytes(base, &mut buffer)?;
        self.fills += 1;
        log::debug!("filling line {base:#x} into set {}", parts.set);
        Ok(self.sets[parts.set as usize].install(parts.tag, &buffer))
    }

    pub fn set_snapshot(&self, set: u32) -> Option<SetSnapshot> {
        self.sets.get(set as usize).map(|s| s.snapshot(set))
    }

    fn hit(&mut self) {
        self.hits += 1;
    }

    fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn clear_stats(&mut self) {
        self.reads = 0;
        self.writes = 0;
        self.hits = 0;
        self.misses = 0;
        self.fills = 0;
        self.sets.iter_mut().for_each(|s| s.clear_stats());
    }

    pub fn make_stats(&self) -> CacheStats {
        let total_access = (self.hits + self.misses) as f64;
        let miss_rate = if total_access > 0.0 {
            self.misses as f64 / total_access
        } else {
            0.0
        };

        CacheStats {
            name: self.name.clone(),
            reads: self.reads,
            writes: self.writes,
            hits: self.hits,
            misses: self.misses,
            fills: self.fills,
            evictions: self.sets.iter().map(|s| s.evictions()).sum(),
            miss_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MainMemory,
        replace::{Random, RoundRobin, Sequence},
    };

    fn rr_cache(memory: &mut MainMemory) -> Cache<&mut MainMemory, RoundRobin> {
        Cache::new(
            "test".into(),
            Layout::default(),
            4,
            memory,
            RoundRobin::new,
        )
    }

    #[test]
    fn read_miss_fills_from_memory() {
        let mut mem = MainMemory::new(1 << 16);
        mem.write_bytes(0x1040, &[0xef, 0xbe, 0xad, 0xde]).unwrap();
        mem.write_bytes(0x107c, &[1, 0, 0, 0]).unwrap();
        let mut cache = rr_cache(&mut mem);

        assert_eq!(cache.probe(0x1040), AccessResult::Miss);
        assert_eq!(cache.read(0x1040).unwrap(), 0xdead_beef);
        assert_eq!(cache.probe(0x1040), AccessResult::Hit);
        // whole line came along
        assert_eq!(cache.probe(0x107c), AccessResult::Hit);
        assert_eq!(cache.read(0x107c).unwrap(), 1);

        let stats = cache.make_stats();
        assert_eq!((stats.hits(), stats.misses(), stats.fills()), (1, 1, 1));
    }

    #[test]
    fn write_hit_updates_line_and_memory() {
        let mut mem = MainMemory::new(1 << 16);
        let mut cache = rr_cache(&mut mem);
        cache.read(0x20).unwrap();
        cache.write(0x20, 0x6139).unwrap();
        assert_eq!(cache.read(0x20).unwrap(), 0x6139);
        let stats = cache.make_stats();
        assert_eq!((stats.hits(), stats.misses()), (2, 1));
        drop(cache);

        let mut buf = [0; 4];
        mem.read_bytes(0x20, &mut buf).unwrap();
        assert_eq!(u32::from_le_bytes(buf), 0x6139);
    }

    #[test]
    fn write_miss_does_not_allocate_by_default() {
        let mut mem = MainMemory::new(1 << 16);
        let mut cache = rr_cache(&mut mem);
        cache.write(0x10, 0x1234_5678).unwrap();
        assert_eq!(cache.probe(0x10), AccessResult::Miss);
        assert_eq!(cache.make_stats().fills(), 0);

        let mut buf = [0; 4];
        cache.memory().read_bytes(0x10, &mut buf).unwrap();
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn write_allocate_fills_on_miss() {
        let mut mem = MainMemory::new(1 << 16);
        let mut cache = rr_cache(&mut mem).with_write_policy(WritePolicy::Allocate);
        cache.write(0x10, 0x5269_0723).unwrap();
        assert_eq!(cache.probe(0x10), AccessResult::Hit);
        assert_eq!(cache.make_stats().fills(), 1);
        assert_eq!(cache.read(0x10).unwrap(), 0x5269_0723);
    }

    #[test]
    fn misaligned_word_is_rejected_before_side_effects() {
        let mut mem = MainMemory::new(1 << 16);
        let mut cache = rr_cache(&mut mem);
        assert!(matches!(
            cache.read(0x3e),
            Err(Error::MisalignedWordAccess {
                offset: 0x3e,
                line_size: 64
            })
        ));
        assert!(matches!(
            cache.write(0x7d, 1),
            Err(Error::MisalignedWordAccess { .. })
        ));
        assert_eq!(cache.probe(0x3e), AccessResult::Miss);
        assert_eq!(cache.make_stats().fills(), 0);

        let mut buf = [0xff; 8];
        cache.memory().read_bytes(0x7c, &mut buf).unwrap();
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn out_of_bounds_propagates_and_leaves_cache_unchanged() {
        let mut mem = MainMemory::new(0x1000);
        let mut cache = rr_cache(&mut mem);
        assert!(matches!(
            cache.read(0x1000),
            Err(Error::OutOfBounds {
                addr: 0x1000,
                len: 64,
                ..
            })
        ));
        assert_eq!(cache.probe(0x1000), AccessResult::Miss);
        assert!(matches!(
            cache.write(0x2000, 5),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(cache.make_stats().fills(), 0);
    }

    #[test]
    fn write_allocate_rejects_line_past_capacity_before_writing() {
        // the line at 0x40 would end at 0x80, past the last byte
        let mut mem = MainMemory::new(100);
        let mut cache = rr_cache(&mut mem).with_write_policy(WritePolicy::Allocate);
        assert!(matches!(
            cache.write(0x40, 0xabcd),
            Err(Error::OutOfBounds {
                addr: 0x40,
                len: 64,
                capacity: 100
            })
        ));
        let stats = cache.make_stats();
        assert_eq!((stats.writes(), stats.misses(), stats.fills()), (0, 0, 0));
        assert_eq!(cache.probe(0x40), AccessResult::Miss);

        let mut buf = [0xff; 4];
        cache.memory().read_bytes(0x40, &mut buf).unwrap();
        assert_eq!(buf, [0; 4]);

        // a line that fits is still allocated
        cache.write(0x20, 1).unwrap();
        assert_eq!(cache.probe(0x20), AccessResult::Hit);
    }

    #[test]
    fn scripted_eviction_is_reproducible() {
        let run = || {
            let mut cache = Cache::new(
                "rand".into(),
                Layout::default(),
                4,
                MainMemory::new(1 << 16),
                || Random::with_source(Sequence::new(vec![0, 1, 2, 3, 1])),
            );
            for addr in [0x0040, 0x1040, 0x2040, 0x3040, 0x4040] {
                cache.read(addr).unwrap();
            }
            cache.set_snapshot(1).unwrap()
        };
        let snap = run();
        assert_eq!(snap, run());
        assert!(!snap.holds(1));
        assert!(snap.holds(4));
    }

    #[test]
    fn evictions_are_counted() {
        let mut cache = Cache::new(
            "rr".into(),
            Layout::new(16, 1).unwrap(),
            2,
            MainMemory::new(256),
            RoundRobin::new,
        );
        for addr in [0x00, 0x10, 0x20, 0x30] {
            cache.read(addr).unwrap();
        }
        let stats = cache.make_stats();
        assert_eq!(stats.evictions(), 2);
        assert_eq!(stats.misses(), 4);

        cache.clear_stats();
        let stats = cache.make_stats();
        assert_eq!((stats.hits(), stats.misses(), stats.evictions()), (0, 0, 0));
        assert_eq!(cache.probe(0x30), AccessResult::Hit);
    }

    #[test]
    fn snapshot_out_of_range_is_none() {
        let mut mem = MainMemory::new(64);
        let cache = rr_cache(&mut mem);
        assert!(cache.set_snapshot(63).is_some());
        assert!(cache.set_snapshot(64).is_none());
    }
}
