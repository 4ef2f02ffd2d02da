use crate::{
    cache::{Cache, CacheStats},
    error::Result,
    memory::{MainMemory, MemoryStore},
    replace::Replace,
    set::SetSnapshot,
};

/// Rows and columns of the memory slice printed by [`MemorySystem::print_memory`].
const DUMP_ROWS: u32 = 24;
const DUMP_COLUMNS: u32 = 12;

/// Main memory with a single write-through cache in front of it.
#[derive(Debug)]
pub struct MemorySystem<R: Replace> {
    cache: Cache<MainMemory, R>,
}

impl<R: Replace> MemorySystem<R> {
    pub fn new(cache: Cache<MainMemory, R>) -> Self {
        MemorySystem { cache }
    }

    pub fn read(&mut self, addr: u32) -> Result<u32> {
        self.cache.read(addr)
    }

    pub fn write(&mut self, addr: u32, value: u32) -> Result<()> {
        self.cache.write(addr, value)
    }

    /// Reads a word straight from memory, bypassing the cache.
    pub fn read_memory(&self, addr: u32) -> Result<u32> {
        let mut word = [0; 4];
        self.cache.memory().read_bytes(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    pub fn cache(&self) -> &Cache<MainMemory, R> {
        &self.cache
    }

    pub fn memory(&self) -> &MainMemory {
        self.cache.memory()
    }

    pub fn set_snapshot(&self, set: u32) -> Option<SetSnapshot> {
        self.cache.set_snapshot(set)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.make_stats()
    }

    pub fn print_memory(&self, marked: &[std::ops::Range<u32>]) {
        print!(
            "{}",
            self.memory().hex_dump(DUMP_ROWS, DUMP_COLUMNS, marked)
        );
    }

    pub fn print_set(&self, set: u32) {
        println!("\n[DEBUG] Cache Set Dump (Set Index: {set})");
        match self.set_snapshot(set) {
            Some(snapshot) => print!("{snapshot}"),
            None => println!("  no such set"),
        }
    }
}
