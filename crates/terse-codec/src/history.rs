//! Caller-side bookkeeping for line-history mode.

use crate::decoder::decompress_with_history;
use crate::encoder::compress_with_history;
use crate::error::Result;
use crate::preset::Preset;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 64;

/// Bounded, most-recent-first list of plaintext lines.
///
/// Compressor and decompressor each keep their own history; both stay in
/// step as long as every line goes through `compress_line` on one side and
/// `decompress_line` on the other, in the same order.
#[derive(Debug, Clone)]
pub struct LineHistory {
    lines: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for LineHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LineHistory {
    pub fn new(capacity: usize) -> Self {
        Self { lines: VecDeque::with_capacity(capacity), capacity }
    }

    /// Records `line` as the most recent one, dropping the oldest past
    /// capacity.
    pub fn push(&mut self, line: &[u8]) {
        self.lines.push_front(line.to_vec());
        self.lines.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The `idx`-th most recent line.
    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        self.lines.get(idx).map(Vec::as_slice)
    }

    pub fn lines(&self) -> Vec<&[u8]> {
        self.lines.iter().map(Vec::as_slice).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Compresses `line` against the history, then records it.
    pub fn compress_line(&mut self, line: &[u8], out: &mut [u8], preset: &Preset) -> Result<usize> {
        let len = compress_with_history(line, out, preset, &self.lines())?;
        self.push(line);
        Ok(len)
    }

    /// Decompresses one line against the history, then records it.
    pub fn decompress_line(&mut self, data: &[u8], out: &mut [u8], preset: &Preset) -> Result<usize> {
        let len = decompress_with_history(data, out, preset, &self.lines())?;
        self.push(&out[..len]);
        Ok(len)
    }
}
