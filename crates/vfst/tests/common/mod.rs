// Shared helpers for integration tests: an in-memory VFST image builder that
// can emit both the canonical little-endian layout and the big-endian layout
// written by big-endian hosts.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;
use vfst::format::{COOKIE1, COOKIE2, HEADER_SIZE, align_to_transition};
use vfst::transition::FINAL_SYM;

#[derive(Clone, Copy)]
enum Record {
    Transition {
        sym_in: u16,
        sym_out: u16,
        target: u32,
        more: u8,
    },
    Overflow(u32),
}

/// Builds a VFST image record by record. States are addressed by the index
/// of their head record, so callers lay out runs in order.
#[derive(Clone, Default)]
pub struct ImageBuilder {
    symbols: Vec<String>,
    records: Vec<Record>,
}

impl ImageBuilder {
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
        }
    }

    pub fn transition(mut self, sym_in: u16, sym_out: u16, target: u32, more: u8) -> Self {
        self.records.push(Record::Transition {
            sym_in,
            sym_out,
            target,
            more,
        });
        self
    }

    pub fn final_state(self) -> Self {
        self.transition(FINAL_SYM, 0, 0, 0)
    }

    pub fn overflow(mut self, more_transitions: u32) -> Self {
        self.records.push(Record::Overflow(more_transitions));
        self
    }

    /// Index the next record will get.
    pub fn next_index(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn build_le(&self) -> Vec<u8> {
        self.build(false)
    }

    pub fn build_be(&self) -> Vec<u8> {
        self.build(true)
    }

    fn build(&self, big_endian: bool) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        let count = self.symbols.len() as u16;
        if big_endian {
            data[0..4].copy_from_slice(&COOKIE1.to_be_bytes());
            data[4..8].copy_from_slice(&COOKIE2.to_be_bytes());
            data.extend_from_slice(&count.to_be_bytes());
        } else {
            data[0..4].copy_from_slice(&COOKIE1.to_le_bytes());
            data[4..8].copy_from_slice(&COOKIE2.to_le_bytes());
            data.extend_from_slice(&count.to_le_bytes());
        }
        for sym in &self.symbols {
            data.extend_from_slice(sym.as_bytes());
            data.push(0);
        }
        data.resize(align_to_transition(data.len()), 0);

        for record in &self.records {
            match *record {
                Record::Transition {
                    sym_in,
                    sym_out,
                    target,
                    more,
                } => {
                    if big_endian {
                        data.extend_from_slice(&sym_in.to_be_bytes());
                        data.extend_from_slice(&sym_out.to_be_bytes());
                        data.extend_from_slice(&target.to_be_bytes()[1..4]);
                    } else {
                        data.extend_from_slice(&sym_in.to_le_bytes());
                        data.extend_from_slice(&sym_out.to_le_bytes());
                        data.extend_from_slice(&target.to_le_bytes()[0..3]);
                    }
                    data.push(more);
                }
                Record::Overflow(more) => {
                    data.extend_from_slice(&[0; 4]);
                    if big_endian {
                        data.extend_from_slice(&more.to_be_bytes());
                    } else {
                        data.extend_from_slice(&more.to_le_bytes());
                    }
                }
            }
        }
        data
    }
}

/// Routes engine logs to the test output; `RUST_LOG=vfst=trace` shows the
/// traversal.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Accepts "ab" with output "xy".
pub fn simple_ab() -> ImageBuilder {
    // Symbols: 0 eps, 1 a, 2 b, 3 x, 4 y
    ImageBuilder::new(&["", "a", "b", "x", "y"])
        .transition(1, 3, 1, 0)
        .transition(2, 4, 2, 0)
        .final_state()
}

/// Like `simple_ab`, but `b` is gated by `@R.NUM.SG@`.
pub fn required_number() -> ImageBuilder {
    // Symbols: 0 eps, 1 @R.NUM.SG@, 2 a, 3 b, 4 x, 5 y
    ImageBuilder::new(&["", "@R.NUM.SG@", "a", "b", "x", "y"])
        .transition(2, 4, 1, 0)
        .transition(1, 0, 2, 0)
        .transition(3, 5, 3, 0)
        .final_state()
}

/// State 0 has 300 transitions: 299 on `a` and the last one on `b`.
pub fn wide_state() -> ImageBuilder {
    // Records: head, overflow cell, 298 more `a`, one `b`, final at 301.
    let mut builder = ImageBuilder::new(&["", "a", "b"])
        .transition(1, 1, 301, 255)
        .overflow(299);
    for _ in 0..298 {
        builder = builder.transition(1, 1, 301, 0);
    }
    builder.transition(2, 2, 301, 0).final_state()
}
