//! Signed codepoint delta codec and the UTF-8 helpers around it.

use crate::bits::{BitOverflow, BitReader, BitWriter, EndOfStream};
use crate::count;

const STEP_CODES: [u8; 5] = [0x00, 0x80, 0xC0, 0xE0, 0xF0];
const STEP_LENS: [u8; 5] = [1, 2, 3, 4, 5];
const WIDTHS: [u32; 5] = [6, 12, 14, 16, 21];
const BASES: [u32; 5] = [0, 64, 4160, 20544, 86080];

/// Five one-bits: the escape into [`DeltaSpecial`] codes.
const SPECIAL_CODE: u8 = 0xF8;
const SPECIAL_LEN: u8 = 5;

/// Escapes available without leaving the DELTA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSpecial {
    Space,
    /// Followed by a horizontal code.
    Switch,
    Comma,
    Period,
    Newline,
}

impl DeltaSpecial {
    const ORDER: [DeltaSpecial; 5] = [
        DeltaSpecial::Space,
        DeltaSpecial::Switch,
        DeltaSpecial::Comma,
        DeltaSpecial::Period,
        DeltaSpecial::Newline,
    ];

    pub fn for_byte(byte: u8) -> Option<Self> {
        match byte {
            b' ' => Some(Self::Space),
            b',' => Some(Self::Comma),
            b'.' => Some(Self::Period),
            b'\n' => Some(Self::Newline),
            _ => None,
        }
    }

    pub fn byte(self) -> Option<u8> {
        match self {
            Self::Space => Some(b' '),
            Self::Comma => Some(b','),
            Self::Period => Some(b'.'),
            Self::Newline => Some(b'\n'),
            Self::Switch => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaToken {
    Codepoint { negative: bool, magnitude: u32 },
    Special(DeltaSpecial),
}

impl DeltaToken {
    /// Applies a codepoint delta to `prev`. `None` if the result leaves the
    /// non-ASCII codepoint range.
    pub fn apply(self, prev: u32) -> Option<u32> {
        let Self::Codepoint { negative, magnitude } = self else {
            return None;
        };
        let cp = if negative {
            prev.checked_sub(magnitude)?
        } else {
            prev.checked_add(magnitude)?
        };
        (0x80..=0x10FFFF).contains(&cp).then_some(cp)
    }
}

/// Codes `cp` relative to `prev`: step code, sign bit, magnitude.
pub fn write_delta(w: &mut BitWriter<'_>, cp: u32, prev: u32) -> Result<usize, BitOverflow> {
    let (negative, diff) = if prev > cp { (true, prev - cp) } else { (false, cp - prev) };
    let tier = (0..BASES.len())
        .find(|&t| diff < BASES[t] + (1 << WIDTHS[t]))
        .unwrap_or(BASES.len() - 1);
    w.write_code(STEP_CODES[tier], STEP_LENS[tier])?;
    w.write_bits(u32::from(negative), 1)?;
    w.write_bits(diff - BASES[tier], WIDTHS[tier])
}

pub fn write_special(w: &mut BitWriter<'_>, special: DeltaSpecial) -> Result<usize, BitOverflow> {
    w.write_code(SPECIAL_CODE, SPECIAL_LEN)?;
    count::write_step(w, special as usize)
}

pub fn read_delta(r: &mut BitReader<'_>) -> Result<DeltaToken, EndOfStream> {
    let tier = r.read_step(BASES.len())?;
    if tier == BASES.len() {
        let idx = count::read_step(r)?;
        return Ok(DeltaToken::Special(DeltaSpecial::ORDER[idx]));
    }
    let negative = r.read_bit()?;
    let magnitude = r.read_bits(WIDTHS[tier])? + BASES[tier];
    Ok(DeltaToken::Codepoint { negative, magnitude })
}

/// Decodes one multi-byte UTF-8 sequence at the start of `bytes`.
///
/// Returns the codepoint and its encoded length. ASCII, overlong forms and
/// values above U+10FFFF are rejected; surrogates pass so that arbitrary
/// byte strings survive a round trip.
pub fn read_utf8(bytes: &[u8]) -> Option<(u32, usize)> {
    let &lead = bytes.first()?;
    let (len, init) = match lead {
        0xC0..=0xDF => (2, lead & 0x1F),
        0xE0..=0xEF => (3, lead & 0x0F),
        0xF0..=0xF7 => (4, lead & 0x07),
        _ => return None,
    };
    let tail = bytes.get(1..len)?;
    let mut cp = u32::from(init);
    for &b in tail {
        if b & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | u32::from(b & 0x3F);
    }
    let min = [0, 0, 0x80, 0x800, 0x10000][len];
    (min..=0x10FFFF).contains(&cp).then_some((cp, len))
}

/// Encodes a non-ASCII codepoint. Returns the buffer and the used length.
pub fn encode_utf8(cp: u32) -> ([u8; 4], usize) {
    let mut buf = [0u8; 4];
    let len = if cp < 0x800 {
        buf[0] = 0xC0 | (cp >> 6) as u8;
        2
    } else if cp < 0x10000 {
        buf[0] = 0xE0 | (cp >> 12) as u8;
        buf[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
        3
    } else {
        buf[0] = 0xF0 | (cp >> 18) as u8;
        buf[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
        buf[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
        4
    };
    buf[len - 1] = 0x80 | (cp & 0x3F) as u8;
    (buf, len)
}

pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}
