use std::{fmt::Write, ops::Range};

use crate::error::{Error, Result};

pub const MAIN_MEMORY_SIZE: usize = 4 * 1024 * 1024;

/// Flat byte-addressable backing store behind the cache.
///
/// Every access must lie entirely within `[0, capacity)`. Rejected accesses
/// leave the store untouched.
pub trait MemoryStore {
    fn capacity(&self) -> usize;
    fn read_bytes(&self, addr: u32, dest: &mut [u8]) -> Result<()>;
    fn write_bytes(&mut self, addr: u32, src: &[u8]) -> Result<()>;
}

impl<M: MemoryStore + ?Sized> MemoryStore for &mut M {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read_bytes(&self, addr: u32, dest: &mut [u8]) -> Result<()> {
        (**self).read_bytes(addr, dest)
    }

    fn write_bytes(&mut self, addr: u32, src: &[u8]) -> Result<()> {
        (**self).write_bytes(addr, src)
    }
}

#[derive(Debug, Clone)]
pub struct MainMemory {
    bytes: Box<[u8]>,
}

impl MainMemory {
    pub fn new(capacity: usize) -> Self {
        MainMemory {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    fn span(&self, addr: u32, len: usize) -> Result<Range<usize>> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(Error::OutOfBounds {
                addr,
                len,
                capacity: self.bytes.len(),
            }),
        }
    }

    /// Renders `rows` rows of `columns` bytes from address zero, starring any
    /// byte that falls in one of `marked`.
    pub fn hex_dump(&self, rows: u32, columns: u32, marked: &[Range<u32>]) -> String {
        let mut out = String::new();
        for row in 0..rows {
            let _ = write!(out, "0x{:04x}: ", row * columns);
            for column in 0..columns {
                let addr = row * columns + column;
                let Some(val) = self.bytes.get(addr as usize) else {
                    break;
                };
                let mark = if marked.iter().any(|r| r.contains(&addr)) {
                    '*'
                } else {
                    ' '
                };
                let _ = write!(out, "[{mark}{val:02x}] ");
            }
            out.push('\n');
        }
        out.push_str(&"-".repeat(80));
        out.push('\n');
        out
    }
}

impl Default for MainMemory {
    fn default() -> Self {
        MainMemory::new(MAIN_MEMORY_SIZE)
    }
}

impl MemoryStore for MainMemory {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_bytes(&self, addr: u32, dest: &mut [u8]) -> Result<()> {
        let span = self.span(addr, dest.len())?;
        dest.copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    fn write_bytes(&mut self, addr: u32, src: &[u8]) -> Result<()> {
        let span = self.span(addr, src.len())?;
        self.bytes[span].copy_from_slice(src);
        Ok(())
    }
}
