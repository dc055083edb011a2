//! Pattern recognizers consulted by the encoder at each cursor position.
//!
//! Each recognizer only inspects the input; emitting tokens is the
//! encoder's job.

use crate::count::MAX_COUNT;
use crate::delta::read_utf8;
use crate::preset::Preset;
use crate::tables::freq_symbol;

/// Bytes consumed by a GUID.
pub const GUID_LEN: usize = 36;
const GUID_HYPHENS: [usize; 4] = [8, 13, 18, 23];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexCase {
    Lower,
    Upper,
}

/// Nibble value of a hex digit and its case; digits have no case.
pub fn hex_value(byte: u8) -> Option<(u8, Option<HexCase>)> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0', None)),
        b'a'..=b'f' => Some((byte - b'a' + 10, Some(HexCase::Lower))),
        b'A'..=b'F' => Some((byte - b'A' + 10, Some(HexCase::Upper))),
        _ => None,
    }
}

pub fn hex_digit(nibble: u8, case: HexCase) -> u8 {
    match (nibble, case) {
        (0..=9, _) => b'0' + nibble,
        (_, HexCase::Lower) => b'a' + nibble - 10,
        (_, HexCase::Upper) => b'A' + nibble - 10,
    }
}

/// Folds `byte` into a running hex case. `None` when the byte is not hex or
/// contradicts the case seen so far.
fn merge_case(seen: Option<HexCase>, byte: u8) -> Option<Option<HexCase>> {
    let (_, case) = hex_value(byte)?;
    match (seen, case) {
        (Some(a), Some(b)) if a != b => None,
        (a, b) => Some(a.or(b)),
    }
}

/// Length of an identical-byte run starting at `pos` that continues the
/// byte before it. At least 4; the caller codes `len - 4`.
pub fn repeat_run(input: &[u8], pos: usize) -> Option<usize> {
    if pos == 0 || pos + 3 >= input.len() {
        return None;
    }
    let byte = input[pos];
    if input[pos - 1] != byte || input[pos + 1..=pos + 3].iter().any(|&b| b != byte) {
        return None;
    }
    let limit = MAX_COUNT as usize + 4;
    let run = input[pos..].iter().take(limit).take_while(|&&b| b == byte).count();
    Some(run)
}

/// An `8-4-4-4-12` GUID of one hex case at `pos`.
pub fn guid(input: &[u8], pos: usize) -> Option<HexCase> {
    let candidate = input.get(pos..pos + GUID_LEN)?;
    let mut case = None;
    for (i, &b) in candidate.iter().enumerate() {
        if GUID_HYPHENS.contains(&i) {
            if b != b'-' {
                return None;
            }
        } else {
            case = merge_case(case, b)?;
        }
    }
    Some(case.unwrap_or(HexCase::Lower))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexRun {
    pub case: HexCase,
    pub len: usize,
}

/// A run of more than three hex digits of one case. Pure digit runs only
/// qualify beyond ten digits.
pub fn hex_run(input: &[u8], pos: usize) -> Option<HexRun> {
    if pos + 5 >= input.len() {
        return None;
    }
    let mut case = None;
    let mut len = 0;
    for &b in input[pos..].iter().take(MAX_COUNT as usize) {
        match merge_case(case, b) {
            Some(merged) => case = merged,
            None => break,
        }
        len += 1;
    }
    let case = match case {
        Some(case) => case,
        None if len > 10 => HexCase::Lower,
        None => return None,
    };
    (len > 3).then_some(HexRun { case, len })
}

/// Bit width of a template placeholder, `None` for literal characters.
pub fn placeholder_width(slot: u8) -> Option<u32> {
    match slot {
        b'f' | b'F' => Some(4),
        b'r' => Some(3),
        b't' => Some(2),
        b'o' => Some(1),
        _ => None,
    }
}

fn template_accepts(slot: u8, byte: u8) -> bool {
    match slot {
        b'f' => byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte),
        b'F' => byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte),
        b'r' => (b'0'..=b'7').contains(&byte),
        b't' => (b'0'..=b'3').contains(&byte),
        b'o' => (b'0'..=b'1').contains(&byte),
        literal => byte == literal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMatch {
    pub index: usize,
    /// Template characters matched from the start.
    pub matched: usize,
    /// Template characters left unmatched at the end.
    pub unmatched: usize,
}

/// First template whose matched prefix covers more than 66% of it.
pub fn template(input: &[u8], pos: usize, templates: &[Vec<u8>]) -> Option<TemplateMatch> {
    let rest = &input[pos..];
    templates.iter().enumerate().find_map(|(index, tmpl)| {
        let matched = tmpl
            .iter()
            .zip(rest)
            .take_while(|&(&slot, &byte)| template_accepts(slot, byte))
            .count();
        (matched * 100 > tmpl.len() * 66).then_some(TemplateMatch {
            index,
            matched,
            unmatched: tmpl.len() - matched,
        })
    })
}

/// Index of a frequent sequence starting at `pos` whose code the preset
/// enables.
pub fn freq_seq(input: &[u8], pos: usize, preset: &Preset) -> Option<usize> {
    let rest = &input[pos..];
    preset
        .freq_seqs()
        .iter()
        .enumerate()
        .find(|(i, seq)| rest.starts_with(seq) && preset.is_enabled(freq_symbol(*i).set))
        .map(|(i, _)| i)
}

/// Five upper-case letters from `pos` switch on all-upper mode.
pub fn upper_run_ahead(input: &[u8], pos: usize) -> bool {
    input.get(pos..pos + 5).is_some_and(|w| w.iter().all(u8::is_ascii_uppercase))
}

fn has_own_code(byte: u8) -> bool {
    matches!(byte, b' '..=b'~' | b'\t' | b'\n' | b'\r')
}

/// Bytes from `pos` with no better coding: neither printable ASCII, TAB,
/// LF or CR, nor the start of a UTF-8 sequence or a repeat run. The byte at
/// `pos` is always included.
pub fn binary_run(input: &[u8], pos: usize) -> usize {
    let mut end = pos + 1;
    while end < input.len()
        && end - pos < MAX_COUNT as usize
        && !has_own_code(input[end])
        && read_utf8(&input[end..]).is_none()
        && repeat_run(input, end).is_none()
    {
        end += 1;
    }
    end - pos
}
