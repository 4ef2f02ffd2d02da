use std::{
    fs,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use xz2::read::XzDecoder;

use crate::{
    error::{Error, Result},
    replace::Replace,
    system::MemorySystem,
};

/// One line of an access trace.
///
/// ```text
/// # comment
/// r 0x20            read a word
/// r 0x20 0x6139     read a word and check its value
/// w 0x10 0x52690723 write a word
/// s 1               print set 1
/// m                 print the start of memory
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read { addr: u32, expect: Option<u32> },
    Write { addr: u32, value: u32 },
    PrintSet(u32),
    PrintMemory,
}

fn parse_num(tok: &str, line: usize) -> Result<u32> {
    let parsed = match tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => tok.replace('_', "").parse(),
    };
    parsed.map_err(|_| Error::Trace {
        line,
        msg: format!("bad number {tok:?}"),
    })
}

/// Parses a single trace line. Blank lines and comments yield `None`.
pub fn parse_line(text: &str, line: usize) -> Result<Option<Op>> {
    let text = text.split('#').next().unwrap_or("").trim();
    let mut toks = text.split_whitespace();
    let Some(cmd) = toks.next() else {
        return Ok(None);
    };
    let args: Vec<u32> = toks.map(|t| parse_num(t, line)).collect::<Result<_>>()?;
    let wrong_arity = || Error::Trace {
        line,
        msg: format!("wrong number of operands for {cmd:?}"),
    };

    let op = match (cmd.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("r", [addr]) => Op::Read {
            addr: *addr,
            expect: None,
        },
        ("r", [addr, expect]) => Op::Read {
            addr: *addr,
            expect: Some(*expect),
        },
        ("w", [addr, value]) => Op::Write {
            addr: *addr,
            value: *value,
        },
        ("s", [set]) => Op::PrintSet(*set),
        ("m", []) => Op::PrintMemory,
        ("r" | "w" | "s" | "m", _) => return Err(wrong_arity()),
        _ => {
            return Err(Error::Trace {
                line,
                msg: format!("unknown op {cmd:?}"),
            })
        }
    };
    Ok(Some(op))
}

pub struct Trace {
    pub rec: Receiver<Result<Vec<Op>>>,
    _thread: JoinHandle<()>,
}

impl Trace {
    /// Opens a trace file, decompressing it first if it ends in `.xz`.
    pub fn read(
        path: PathBuf,
        ops_per_block: usize,
        blocks_per_queue: usize,
    ) -> io::Result<Trace> {
        let stream = fs::File::open(&path)?;
        let reader: Box<dyn BufRead + Send> = if path.extension().is_some_and(|e| e == "xz") {
            Box::new(BufReader::new(XzDecoder::new(stream)))
        } else {
            Box::new(BufReader::new(stream))
        };
        Ok(Trace::from_reader(reader, ops_per_block, blocks_per_queue))
    }

    pub fn from_reader(
        reader: impl BufRead + Send + 'static,
        ops_per_block: usize,
        blocks_per_queue: usize,
    ) -> Trace {
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue);
        let t = thread::spawn(move || Trace::run_thread(reader, ops_per_block.max(1), sender));
        Trace {
            rec: receiver,
            _thread: t,
        }
    }

    fn run_thread(reader: impl BufRead, ops_per_block: usize, queue: Sender<Result<Vec<Op>>>) {
        let mut block = Vec::with_capacity(ops_per_block);
        for (idx, text) in reader.lines().enumerate() {
            let parsed = text
                .map_err(Error::from)
                .and_then(|text| parse_line(&text, idx + 1));
            match parsed {
                Ok(Some(op)) => block.push(op),
                Ok(None) => {}
                Err(err) => {
                    if !block.is_empty() && queue.send(Ok(block)).is_err() {
                        return;
                    }
                    let _ = queue.send(Err(err));
                    return;
                }
            }
            if block.len() == ops_per_block {
                let full = std::mem::replace(&mut block, Vec::with_capacity(ops_per_block));
                if queue.send(Ok(full)).is_err() {
                    return;
                }
            }
        }
        if !block.is_empty() {
            let _ = queue.send(Ok(block));
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ops: u64,
    pub mismatches: u64,
}

/// Applies every op in the trace to `system`, stopping at the first error.
pub fn run<R: Replace>(trace: &Trace, system: &mut MemorySystem<R>) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    // The channel closes once the reader thread has sent everything.
    while let Ok(block) = trace.rec.recv() {
        for op in block? {
            apply(&op, system, &mut summary)?;
        }
    }
    Ok(summary)
}

fn apply<R: Replace>(
    op: &Op,
    system: &mut MemorySystem<R>,
    summary: &mut RunSummary,
) -> Result<()> {
    summary.ops += 1;
    match *op {
        Op::Read { addr, expect } => {
            let value = system.read(addr)?;
            println!("read  {addr:#010x} -> {value:#010x}");
            if let Some(expect) = expect {
                if expect != value {
                    log::warn!("read {addr:#x}: expected {expect:#x}, got {value:#x}");
                    summary.mismatches += 1;
                }
            }
        }
        Op::Write { addr, value } => {
            system.write(addr, value)?;
            println!("write {addr:#010x} <- {value:#010x}");
        }
        Op::PrintSet(set) => system.print_set(set),
        Op::PrintMemory => system.print_memory(&[]),
    }
    Ok(())
}
