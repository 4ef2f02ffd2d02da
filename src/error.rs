use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("access of {len} bytes at {addr:#x} exceeds memory capacity {capacity:#x}")]
    OutOfBounds {
        addr: u32,
        len: usize,
        capacity: usize,
    },
    #[error("word access at line offset {offset} crosses a {line_size}-byte line")]
    MisalignedWordAccess { offset: u32, line_size: u32 },
    #[error("invalid cache geometry: {what} = {value}")]
    Geometry { what: &'static str, value: usize },
    #[error("unrecognized replacement policy: {0}")]
    UnknownPolicy(String),
    #[error("trace line {line}: {msg}")]
    Trace { line: usize, msg: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
