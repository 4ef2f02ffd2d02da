//! A set-associative, write-through cache in front of flat main memory.
//!
//! Addresses are split into tag, set index and byte offset by [`addr::Layout`].
//! Each [`set::CacheSet`] picks victims with its own [`replace::Replace`]
//! policy, and [`cache::Cache`] moves whole lines in from a
//! [`memory::MemoryStore`] on read misses while sending every write straight
//! through to it. Words are little-endian.

pub mod addr;
pub mod cache;
pub mod config;
pub mod error;
pub mod line;
pub mod memory;
pub mod replace;
pub mod set;
pub mod system;
pub mod trace;

pub use error::{Error, Result};
