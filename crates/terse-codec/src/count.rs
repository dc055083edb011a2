//! Tiered unsigned integer codec used for lengths, distances and counts.
//!
//! A value is coded as a step code selecting one of five tiers followed by
//! `value - base` in the tier's fixed width.

use crate::bits::{BitOverflow, BitReader, BitWriter, EndOfStream};

const STEP_CODES: [u8; 5] = [0x00, 0x80, 0xC0, 0xE0, 0xF0];
const STEP_LENS: [u8; 5] = [1, 2, 3, 4, 4];
const WIDTHS: [u32; 5] = [2, 4, 7, 11, 16];
const BASES: [u32; 5] = [0, 4, 20, 148, 2196];

/// Largest value the top tier can carry.
pub const MAX_COUNT: u32 = BASES[4] + (1 << WIDTHS[4]) - 1;

fn tier_of(value: u32) -> usize {
    (0..BASES.len())
        .find(|&t| value < BASES[t] + (1 << WIDTHS[t]))
        .unwrap_or(BASES.len() - 1)
}

/// Step code `idx`: `idx` one-bits then a zero, or four one-bits for 4.
pub fn write_step(w: &mut BitWriter<'_>, idx: usize) -> Result<usize, BitOverflow> {
    w.write_code(STEP_CODES[idx], STEP_LENS[idx])
}

pub fn read_step(r: &mut BitReader<'_>) -> Result<usize, EndOfStream> {
    r.read_step(STEP_CODES.len() - 1)
}

pub fn write_count(w: &mut BitWriter<'_>, value: u32) -> Result<usize, BitOverflow> {
    debug_assert!(value <= MAX_COUNT);
    let tier = tier_of(value);
    write_step(w, tier)?;
    w.write_bits(value - BASES[tier], WIDTHS[tier])
}

pub fn read_count(r: &mut BitReader<'_>) -> Result<u32, EndOfStream> {
    let tier = read_step(r)?;
    Ok(r.read_bits(WIDTHS[tier])? + BASES[tier])
}

/// Bits `write_count` spends on `value`.
#[cfg(test)]
pub(crate) fn count_cost(value: u32) -> usize {
    let tier = tier_of(value);
    usize::from(STEP_LENS[tier]) + WIDTHS[tier] as usize
}
