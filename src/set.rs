use std::{fmt, iter};

use serde::Serialize;

use crate::{line::Line, replace::Replace};

/// A group of ways sharing one replacement policy instance.
#[derive(Debug)]
pub struct CacheSet<R: Replace> {
    lines: Box<[Line]>,
    repl: R,
    evictions: u64,
}

impl<R: Replace> CacheSet<R> {
    pub fn new(n_ways: usize, line_size: usize, mut repl: R) -> Self {
        repl.configure(n_ways);
        CacheSet {
            lines: iter::repeat_with(|| Line::new(line_size))
                .take(n_ways)
                .collect(),
            repl,
            evictions: 0,
        }
    }

    pub fn n_ways(&self) -> usize {
        self.lines.len()
    }

    pub fn line_size(&self) -> usize {
        self.lines.first().map_or(0, |l| l.data().len())
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn find(&self, tag: u32) -> Option<&Line> {
        self.lines.iter().find(|l| l.valid && l.tag == tag)
    }

    pub fn find_mut(&mut self, tag: u32) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.valid && l.tag == tag)
    }

    /// Fills the way picked by the policy, whatever it held before.
    ///
    /// Callers must have missed on `tag` first, otherwise the set could end up
    /// holding the same tag twice. `bytes` must be exactly one line long.
    pub fn install(&mut self, tag: u32, bytes: &[u8]) -> &mut Line {
        debug_assert_eq!(
            bytes.len(),
            self.line_size(),
            "installed data must be exactly one line"
        );
        let way = self.repl.victim();
        let victim = &mut self.lines[way];
        if victim.valid {
            log::debug!("evicting tag {:#x} from way {way}", victim.tag);
            self.evictions += 1;
        }
        victim.fill(tag, bytes);
        victim
    }

    /// Number of fills that displaced a valid line.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn clear_stats(&mut self) {
        self.evictions = 0;
    }

    pub fn snapshot(&self, set: u32) -> SetSnapshot {
        SetSnapshot {
            set,
            ways: self
                .lines
                .iter()
                .map(|l| WayState {
                    valid: l.valid,
                    tag: l.tag,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WayState {
    pub valid: bool,
    pub tag: u32,
}

/// Diagnostic view of one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetSnapshot {
    pub set: u32,
    pub ways: Vec<WayState>,
}

impl SetSnapshot {
    pub fn holds(&self, tag: u32) -> bool {
        self.ways.iter().any(|w| w.valid && w.tag == tag)
    }
}

impl fmt::Display for SetSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Set[{}] State:", self.set)?;
        for (way, state) in self.ways.iter().enumerate() {
            if state.valid {
                writeln!(f, "    Way {way}: VALID | Tag = {:#x}", state.tag)?;
            } else {
                writeln!(f, "    Way {way}: INVALID")?;
            }
        }
        Ok(())
    }
}
