use crate::error::{Error, Result};

/// An address split into the pieces the cache indexes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressParts {
    pub tag: u32,
    pub set: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy)]
struct BitSection {
    shift: u32,
    mask: u32,
}

impl BitSection {
    fn apply(&self, num: u32) -> u32 {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }

    fn place(&self, field: u32) -> u32 {
        (field & self.mask).checked_shl(self.shift).unwrap_or(0)
    }
}

/// Bit layout of an address for a given line size and set count.
///
/// Low bits first: `log2(line_size)` offset bits, `log2(sets)` set index bits,
/// and whatever is left over as tag.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    line_size: u32,
    sets: u32,
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
}

pub const WORD_SIZE: u32 = 4;

impl Layout {
    pub fn new(line_size: u32, sets: u32) -> Result<Self> {
        if !line_size.is_power_of_two() || line_size < WORD_SIZE {
            return Err(Error::Geometry {
                what: "line_size",
                value: line_size as usize,
            });
        }
        if !sets.is_power_of_two() {
            return Err(Error::Geometry {
                what: "sets",
                value: sets as usize,
            });
        }

        let offset_sec = BitSection {
            shift: 0,
            mask: line_size - 1,
        };
        let set_shift = line_size.ilog2();
        let set_sec = BitSection {
            shift: set_shift,
            mask: sets - 1,
        };
        let tag_shift = sets.ilog2() + set_shift;
        let tag_sec = BitSection {
            shift: tag_shift,
            mask: u32::MAX.checked_shr(tag_shift).unwrap_or(0),
        };

        Ok(Layout {
            line_size,
            sets,
            offset_sec,
            set_sec,
            tag_sec,
        })
    }

    pub fn line_size(&self) -> u32 {
        self.line_size
    }

    pub fn sets(&self) -> u32 {
        self.sets
    }

    pub fn split(&self, addr: u32) -> AddressParts {
        AddressParts {
            tag: self.tag_sec.apply(addr),
            set: self.set_sec.apply(addr),
            offset: self.offset_sec.apply(addr),
        }
    }

    pub fn join(&self, parts: AddressParts) -> u32 {
        self.tag_sec.place(parts.tag)
            | self.set_sec.place(parts.set)
            | self.offset_sec.place(parts.offset)
    }

    /// First address of the line holding `addr`.
    pub fn line_base(&self, addr: u32) -> u32 {
        addr & !self.offset_sec.mask
    }
}

impl Default for Layout {
    fn default() -> Self {
        // 64 sets of 64-byte lines
        Layout {
            line_size: 64,
            sets: 64,
            offset_sec: BitSection { shift: 0, mask: 63 },
            set_sec: BitSection { shift: 6, mask: 63 },
            tag_sec: BitSection {
                shift: 12,
                mask: u32::MAX >> 12,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_splits_six_and_six() {
        let layout = Layout::default();
        assert_eq!(
            layout.split(0x1040),
            AddressParts {
                tag: 1,
                set: 1,
                offset: 0
            }
        );
        assert_eq!(
            layout.split(0xdead_beef),
            AddressParts {
                tag: 0xdeadb,
                set: 0x3b,
                offset: 0x2f
            }
        );
    }

    #[test]
    fn new_matches_default() {
        let built = Layout::new(64, 64).unwrap();
        for addr in [0, 0x20, 0x3040, 0xffff_ffff, 0x1234_5678] {
            assert_eq!(built.split(addr), Layout::default().split(addr));
        }
    }

    #[test]
    fn split_then_join_is_identity() {
        for (line_size, sets) in [(64, 64), (4, 1), (16, 256), (128, 2)] {
            let layout = Layout::new(line_size, sets).unwrap();
            let mut rng = fastrand::Rng::with_seed(7);
            for _ in 0..1000 {
                let addr = rng.u32(..);
                let parts = layout.split(addr);
                assert!(parts.offset < line_size);
                assert!(parts.set < sets);
                assert_eq!(layout.join(parts), addr);
            }
            assert_eq!(layout.join(layout.split(u32::MAX)), u32::MAX);
        }
    }

    #[test]
    fn arithmetic_definition_holds() {
        let layout = Layout::new(32, 8).unwrap();
        let addr = 0x0bad_cafe;
        let parts = layout.split(addr);
        assert_eq!(parts.offset, addr % 32);
        assert_eq!(parts.set, (addr / 32) % 8);
        assert_eq!(parts.tag, addr / (32 * 8));
    }

    #[test]
    fn line_base_clears_offset() {
        let layout = Layout::default();
        assert_eq!(layout.line_base(0x107f), 0x1040);
        assert_eq!(layout.line_base(0x40), 0x40);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(matches!(
            Layout::new(48, 64),
            Err(Error::Geometry {
                what: "line_size",
                ..
            })
        ));
        assert!(matches!(
            Layout::new(2, 64),
            Err(Error::Geometry {
                what: "line_size",
                ..
            })
        ));
        assert!(matches!(
            Layout::new(64, 0),
            Err(Error::Geometry { what: "sets", .. })
        ));
    }
}
