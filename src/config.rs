use serde::Deserialize;

use crate::{
    addr::Layout,
    cache::{Cache, WritePolicy},
    error::{Error, Result},
    memory::{MainMemory, MAIN_MEMORY_SIZE},
    replace::{Random, Replace, RoundRobin},
    system::MemorySystem,
};

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub name: String,
    pub line_size: u32,
    pub sets: u32,
    pub ways: usize,
    pub memory_size: usize,
    pub repl: String,
    pub seed: Option<u64>,
    pub write_allocate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: "L1".to_string(),
            line_size: 64,
            sets: 64,
            ways: 4,
            memory_size: MAIN_MEMORY_SIZE,
            repl: "random".to_string(),
            seed: None,
            write_allocate: false,
        }
    }
}

pub type DynSystem = MemorySystem<Box<dyn Replace>>;

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_system(self) -> Result<DynSystem> {
        let layout = Layout::new(self.line_size, self.sets)?;
        if self.ways == 0 {
            return Err(Error::Geometry {
                what: "ways",
                value: 0,
            });
        }
        if self.memory_size % self.line_size as usize != 0 {
            return Err(Error::Geometry {
                what: "memory_size",
                value: self.memory_size,
            });
        }
        let memory = MainMemory::new(self.memory_size);

        let make_repl: Box<dyn FnMut() -> Box<dyn Replace>> = match self.repl.as_str() {
            "random" => match self.seed {
                // Each set draws from its own fork so sets stay independent
                // yet the whole run replays from one seed.
                Some(seed) => {
                    let mut seeder = fastrand::Rng::with_seed(seed);
                    Box::new(move || {
                        Box::new(Random::with_source(seeder.fork())) as Box<dyn Replace>
                    })
                }
                None => Box::new(|| Box::new(Random::new()) as Box<dyn Replace>),
            },
            "round_robin" | "rr" => Box::new(|| Box::new(RoundRobin::new()) as Box<dyn Replace>),
            _ => return Err(Error::UnknownPolicy(self.repl.clone())),
        };

        let write_policy = if self.write_allocate {
            WritePolicy::Allocate
        } else {
            WritePolicy::NoAllocate
        };
        let cache = Cache::new(self.name, layout, self.ways, memory, make_repl)
            .with_write_policy(write_policy);
        Ok(MemorySystem::new(cache))
    }
}
