//! Static code tables: the three symbol sets, their vertical prefix codes,
//! the printable-ASCII classification map and the horizontal set selector.

use crate::bits::{BitOverflow, BitReader, BitWriter, EndOfStream};
use serde::{Deserialize, Serialize};

/// Coding set. ALPHA, NUM and DELTA persist across tokens; SYM and DICT
/// apply to a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Set {
    Alpha,
    Sym,
    Num,
    Dict,
    Delta,
}

impl Set {
    pub const ALL: [Set; 5] = [Set::Alpha, Set::Sym, Set::Num, Set::Dict, Set::Delta];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Left-aligned vertical codes, one per symbol slot.
pub const VERTICAL_CODES: [u8; 28] = [
    0x00, 0x40, 0x60, 0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xD8, 0xE0, 0xE4, 0xE8, 0xEC,
    0xEE, 0xF0, 0xF2, 0xF4, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

pub const VERTICAL_LENS: [u8; 28] = [
    2, 3, 3, 4, 4, 4, 4, 4, 5, 5, 6, 6, 6, 7, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
];

// Slot 0 of ALPHA and NUM is the switch code. Zero bytes elsewhere mark
// slots with a special meaning (see the named slots below).
pub const ALPHA_SYMBOLS: [u8; 28] = *b"\0 etaoinsrlcdhupmbgwfyvkqjxz";

pub const SYM_SYMBOLS: [u8; 28] = [
    b'"', b'{', b'}', b'_', b'<', b'>', b':', b'\n', 0, b'[', b']', b'\\', b';', b'\'',
    b'\t', b'@', b'*', b'&', b'?', b'!', b'^', b'|', b'\r', b'~', b'`', 0, 0, 0,
];

pub const NUM_SYMBOLS: [u8; 28] = [
    0, b',', b'.', b'0', b'1', b'9', b'2', b'5', b'-', b'/', b'3', b'4', b'6', b'7', b'8',
    b'(', b')', b' ', b'=', b'+', b'$', b'%', b'#', 0, 0, 0, 0, 0,
];

pub const SWITCH: usize = 0;
pub const ALPHA_SPACE: usize = 1;
pub const SYM_LF: usize = 7;
pub const SYM_CRLF: usize = 8;
pub const SYM_TAB: usize = 14;
pub const SYM_CR: usize = 22;
/// First SYM slot holding a frequent sequence (sequences 0..=2).
pub const SYM_FREQ_BASE: usize = 25;
pub const NUM_NIBBLE: usize = 0;
pub const NUM_SPACE: usize = 17;
/// First NUM slot holding a frequent sequence (sequences 3..=5).
pub const NUM_FREQ_BASE: usize = 23;
pub const NUM_REPEAT: usize = 26;
pub const NUM_TERMINATOR: usize = 27;

/// Where a printable character is coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub set: Set,
    pub slot: usize,
}

/// Frequent sequence `i` lives in this set and slot.
pub const fn freq_symbol(i: usize) -> Symbol {
    if i < 3 {
        Symbol { set: Set::Sym, slot: SYM_FREQ_BASE + i }
    } else {
        Symbol { set: Set::Num, slot: NUM_FREQ_BASE + i - 3 }
    }
}

const fn build_classification() -> [Option<Symbol>; 94] {
    let mut map = [None; 94];
    let mut slot = 0;
    while slot < 28 {
        let a = ALPHA_SYMBOLS[slot];
        if a > b' ' {
            let sym = Some(Symbol { set: Set::Alpha, slot });
            map[(a - 33) as usize] = sym;
            map[(a - b'a' + b'A' - 33) as usize] = sym;
        }
        let s = SYM_SYMBOLS[slot];
        if s > b' ' {
            map[(s - 33) as usize] = Some(Symbol { set: Set::Sym, slot });
        }
        let n = NUM_SYMBOLS[slot];
        if n > b' ' {
            map[(n - 33) as usize] = Some(Symbol { set: Set::Num, slot });
        }
        slot += 1;
    }
    map
}

/// Printable ASCII `!`..=`~` to (set, slot). Upper-case letters share the
/// slot of their lower-case form.
pub const CLASSIFICATION: [Option<Symbol>; 94] = build_classification();

pub fn classify(byte: u8) -> Option<Symbol> {
    match byte {
        b'!'..=b'~' => CLASSIFICATION[usize::from(byte - b'!')],
        _ => None,
    }
}

/// Byte at `slot` of a literal set, 0 for special slots.
#[cfg(test)]
pub(crate) fn symbol_at(set: Set, slot: usize) -> u8 {
    match set {
        Set::Alpha => ALPHA_SYMBOLS[slot],
        Set::Sym => SYM_SYMBOLS[slot],
        Set::Num => NUM_SYMBOLS[slot],
        Set::Dict | Set::Delta => 0,
    }
}

const fn mask(len: u8) -> u8 {
    if len == 0 {
        0
    } else {
        0xFF << (8 - len)
    }
}

pub fn write_vertical(w: &mut BitWriter<'_>, slot: usize) -> Result<usize, BitOverflow> {
    w.write_code(VERTICAL_CODES[slot], VERTICAL_LENS[slot])
}

pub fn read_vertical(r: &mut BitReader<'_>) -> Result<usize, EndOfStream> {
    let code = r.peek8();
    let slot = (0..VERTICAL_CODES.len())
        .find(|&i| code & mask(VERTICAL_LENS[i]) == VERTICAL_CODES[i])
        .ok_or(EndOfStream)?;
    r.skip(usize::from(VERTICAL_LENS[slot]))?;
    Ok(slot)
}

/// Horizontal (set selecting) codes. A zero length disables the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalCodes {
    pub codes: [u8; 5],
    pub lens: [u8; 5],
}

impl HorizontalCodes {
    pub const fn new(codes: [u8; 5], lens: [u8; 5]) -> Self {
        Self { codes, lens }
    }

    pub fn is_enabled(&self, set: Set) -> bool {
        set == Set::Alpha || self.lens[set.index()] > 0
    }

    pub fn write(&self, w: &mut BitWriter<'_>, set: Set) -> Result<usize, BitOverflow> {
        w.write_code(self.codes[set.index()], self.lens[set.index()])
    }

    /// Reads a set selector. `None` means no enabled set matches.
    ///
    /// With a zero-length ALPHA code every selector is ALPHA and consumes
    /// no bits.
    pub fn read(&self, r: &mut BitReader<'_>) -> Result<Option<Set>, EndOfStream> {
        if self.lens[Set::Alpha.index()] == 0 {
            return Ok(Some(Set::Alpha));
        }
        let code = r.peek8();
        let Some(set) = Set::ALL.into_iter().find(|s| {
            let len = self.lens[s.index()];
            len > 0 && code & mask(len) == self.codes[s.index()]
        }) else {
            return Ok(None);
        };
        r.skip(usize::from(self.lens[set.index()]))?;
        Ok(Some(set))
    }

    /// Enabled codes must be prefix-free among themselves.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(len) = self.lens.iter().find(|&&l| l > 8) {
            return Err(format!("horizontal code length {len} exceeds 8 bits"));
        }
        for set in Set::ALL {
            let (code, len) = (self.codes[set.index()], self.lens[set.index()]);
            if code & !mask(len) != 0 {
                return Err(format!("horizontal code for {set:?} has bits beyond its length"));
            }
        }
        if self.lens[Set::Alpha.index()] == 0 {
            return if self.lens.iter().all(|&l| l == 0) {
                Ok(())
            } else {
                Err("a zero-length ALPHA code requires every other set disabled".into())
            };
        }
        for (i, a) in Set::ALL.into_iter().enumerate() {
            for b in Set::ALL.into_iter().skip(i + 1) {
                let (la, lb) = (self.lens[a.index()], self.lens[b.index()]);
                if la == 0 || lb == 0 {
                    continue;
                }
                let common = mask(la.min(lb));
                if self.codes[a.index()] & common == self.codes[b.index()] & common {
                    return Err(format!("horizontal codes for {a:?} and {b:?} overlap"));
                }
            }
        }
        if self.lens[Set::Num.index()] == 0
            && [Set::Sym, Set::Dict, Set::Delta].iter().any(|s| self.lens[s.index()] > 0)
        {
            return Err("NUM may only be disabled together with SYM, DICT and DELTA".into());
        }
        Ok(())
    }
}
