use std::ops::Range;

use crate::{
    addr::WORD_SIZE,
    error::{Error, Result},
};

/// One way of a set. Starts invalid and zeroed, and only becomes valid by
/// being filled from memory.
#[derive(Debug, Clone)]
pub struct Line {
    pub valid: bool,
    pub tag: u32,
    data: Box<[u8]>,
}

impl Line {
    pub fn new(line_size: usize) -> Self {
        Line {
            valid: false,
            tag: 0,
            data: vec![0; line_size].into_boxed_slice(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn fill(&mut self, tag: u32, bytes: &[u8]) {
        self.data.copy_from_slice(bytes);
        self.tag = tag;
        self.valid = true;
    }

    /// Little-endian word starting at `offset`.
    pub fn read_word(&self, offset: u32) -> Result<u32> {
        let range = word_range(offset, self.data.len())?;
        Ok(decode_word(&self.data[range]))
    }

    pub fn write_word(&mut self, offset: u32, value: u32) -> Result<()> {
        let range = word_range(offset, self.data.len())?;
        self.data[range].copy_from_slice(&encode_word(value));
        Ok(())
    }
}

/// Byte range of the word at `offset`, rejecting words that spill past the line.
pub fn word_range(offset: u32, line_size: usize) -> Result<Range<usize>> {
    let start = offset as usize;
    let end = start + WORD_SIZE as usize;
    if end > line_size {
        return Err(Error::MisalignedWordAccess {
            offset,
            line_size: line_size as u32,
        });
    }
    Ok(start..end)
}

pub fn encode_word(value: u32) -> [u8; WORD_SIZE as usize] {
    value.to_le_bytes()
}

pub fn decode_word(bytes: &[u8]) -> u32 {
    let mut word = [0; WORD_SIZE as usize];
    word.copy_from_slice(&bytes[..WORD_SIZE as usize]);
    u32::from_le_bytes(word)
}
