//! Compression orchestrator.
//!
//! At each cursor position the recognizers are consulted in a fixed order:
//! back-reference, repeat run, GUID, hex run, template, frequent sequence,
//! then the literal, UTF-8 and binary fallbacks. The first that applies
//! emits its tokens and reports how many input bytes it consumed.

use crate::bits::{BitOverflow, BitWriter};
use crate::count;
use crate::delta::{self, DeltaSpecial};
use crate::error::{CodecError, Result};
use crate::matcher::{self, MIN_MATCH};
use crate::preset::Preset;
use crate::recognize::{self, HexCase, GUID_LEN};
use crate::tables::{self, freq_symbol, Set, Symbol};
use tracing::{debug, trace};

/// Selector written after a nibble escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NibbleKind {
    Template,
    HexLower,
    GuidLower,
    HexUpper,
    GuidUpper,
    Binary,
}

impl NibbleKind {
    pub(crate) const ORDER: [NibbleKind; 6] = [
        Self::Template,
        Self::HexLower,
        Self::GuidLower,
        Self::HexUpper,
        Self::GuidUpper,
        Self::Binary,
    ];

    fn hex(case: HexCase) -> Self {
        match case {
            HexCase::Lower => Self::HexLower,
            HexCase::Upper => Self::HexUpper,
        }
    }

    fn guid(case: HexCase) -> Self {
        match case {
            HexCase::Lower => Self::GuidLower,
            HexCase::Upper => Self::GuidUpper,
        }
    }

    /// `idx` one-bits then a zero; the last kind is five one-bits.
    fn write(self, w: &mut BitWriter<'_>) -> std::result::Result<usize, BitOverflow> {
        let idx = self as u32;
        if idx == 5 {
            w.write_bits(0x1F, 5)
        } else {
            w.write_bits(((1 << idx) - 1) << 1, idx + 1)
        }
    }
}

/// Why an encoding pass stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Overflow,
    Unencodable { position: usize },
}

impl From<BitOverflow> for Fault {
    fn from(_: BitOverflow) -> Self {
        Fault::Overflow
    }
}

type Step<T> = std::result::Result<T, Fault>;

/// Writes the code that leaves `state` for `target`.
fn write_switch(w: &mut BitWriter<'_>, preset: &Preset, state: Set, target: Set) -> std::result::Result<(), BitOverflow> {
    if state == Set::Delta {
        delta::write_special(w, DeltaSpecial::Switch)?;
    } else {
        tables::write_vertical(w, tables::SWITCH)?;
    }
    preset.horizontal().write(w, target)?;
    Ok(())
}

struct Encoder<'a> {
    w: BitWriter<'a>,
    preset: &'a Preset,
    history: Option<&'a [&'a [u8]]>,
    /// Resting set: ALPHA, NUM or DELTA.
    state: Set,
    all_upper: bool,
    prev_cp: u32,
    cursor: usize,
}

impl<'a> Encoder<'a> {
    fn new(w: BitWriter<'a>, preset: &'a Preset, history: Option<&'a [&'a [u8]]>) -> Self {
        Self { w, preset, history, state: Set::Alpha, all_upper: false, prev_cp: 0, cursor: 0 }
    }

    fn run(mut self, input: &[u8]) -> Step<usize> {
        let magic = u32::from(self.preset.magic_bits());
        if magic > 0 {
            self.w.write_bits((1 << magic) - 1, magic)?;
        }
        while self.cursor < input.len() {
            let consumed = self.step(input)?;
            self.cursor += consumed;
        }
        self.terminate()?;
        Ok(self.w.byte_len())
    }

    fn switch_to(&mut self, target: Set) -> Step<()> {
        if !self.preset.is_enabled(target) {
            return Err(Fault::Unencodable { position: self.cursor });
        }
        write_switch(&mut self.w, self.preset, self.state, target)?;
        Ok(())
    }

    /// Emits a literal slot, switching sets as needed. Only ALPHA and NUM
    /// digits become the resting set.
    fn emit_symbol(&mut self, sym: Symbol) -> Step<()> {
        match sym.set {
            Set::Alpha if self.state != Set::Alpha => {
                self.switch_to(Set::Alpha)?;
                self.state = Set::Alpha;
            }
            Set::Num if self.state != Set::Num => {
                self.switch_to(Set::Num)?;
                if tables::NUM_SYMBOLS[sym.slot].is_ascii_digit() {
                    self.state = Set::Num;
                }
            }
            Set::Sym => self.switch_to(Set::Sym)?,
            _ => {}
        }
        tables::write_vertical(&mut self.w, sym.slot)?;
        Ok(())
    }

    fn emit_nibble_escape(&mut self, kind: NibbleKind) -> Step<()> {
        self.switch_to(Set::Num)?;
        tables::write_vertical(&mut self.w, tables::NUM_NIBBLE)?;
        kind.write(&mut self.w)?;
        Ok(())
    }

    fn emit_nibbles(&mut self, hex: &[u8]) -> Step<()> {
        for &b in hex {
            if let Some((nibble, _)) = recognize::hex_value(b) {
                self.w.write_bits(u32::from(nibble), 4)?;
            }
        }
        Ok(())
    }

    fn step(&mut self, input: &[u8]) -> Step<usize> {
        let pos = self.cursor;
        if let Some(len) = self.back_reference(input, pos)? {
            return Ok(len);
        }
        if self.preset.is_enabled(Set::Num) {
            if let Some(run) = recognize::repeat_run(input, pos) {
                trace!(pos, run, "repeat run");
                self.emit_symbol(Symbol { set: Set::Num, slot: tables::NUM_REPEAT })?;
                count::write_count(&mut self.w, (run - 4) as u32)?;
                return Ok(run);
            }
            if let Some(case) = recognize::guid(input, pos) {
                trace!(pos, "guid");
                self.emit_nibble_escape(NibbleKind::guid(case))?;
                self.emit_nibbles(&input[pos..pos + GUID_LEN])?;
                return Ok(GUID_LEN);
            }
            if let Some(run) = recognize::hex_run(input, pos) {
                trace!(pos, len = run.len, "hex run");
                self.emit_nibble_escape(NibbleKind::hex(run.case))?;
                count::write_count(&mut self.w, run.len as u32)?;
                self.emit_nibbles(&input[pos..pos + run.len])?;
                return Ok(run.len);
            }
            if let Some(m) = recognize::template(input, pos, self.preset.templates()) {
                trace!(pos, index = m.index, matched = m.matched, "template");
                self.emit_template(input, pos, m)?;
                return Ok(m.matched);
            }
        }
        if let Some(i) = recognize::freq_seq(input, pos, self.preset) {
            trace!(pos, index = i, "frequent sequence");
            self.emit_symbol(freq_symbol(i))?;
            return Ok(self.preset.freq_seqs()[i].len());
        }
        self.update_case(input, pos)?;
        self.literal(input, pos)
    }

    fn back_reference(&mut self, input: &[u8], pos: usize) -> Step<Option<usize>> {
        if !self.preset.is_enabled(Set::Dict) {
            return Ok(None);
        }
        match self.history {
            None => {
                let Some(m) = matcher::find_in_string(input, pos) else {
                    return Ok(None);
                };
                trace!(pos, len = m.len, distance = m.distance, "back-reference");
                self.switch_to(Set::Dict)?;
                count::write_count(&mut self.w, (m.len - MIN_MATCH) as u32)?;
                count::write_count(&mut self.w, (m.distance - (MIN_MATCH - 1)) as u32)?;
                Ok(Some(m.len))
            }
            Some(history) => {
                let Some(m) = matcher::find_in_lines(input, pos, history) else {
                    return Ok(None);
                };
                trace!(pos, len = m.len, position = m.position, line = m.line, "line back-reference");
                self.switch_to(Set::Dict)?;
                count::write_count(&mut self.w, (m.len - MIN_MATCH) as u32)?;
                count::write_count(&mut self.w, m.position as u32)?;
                count::write_count(&mut self.w, m.line as u32)?;
                Ok(Some(m.len))
            }
        }
    }

    fn emit_template(&mut self, input: &[u8], pos: usize, m: recognize::TemplateMatch) -> Step<()> {
        self.emit_nibble_escape(NibbleKind::Template)?;
        count::write_step(&mut self.w, m.index)?;
        count::write_count(&mut self.w, m.unmatched as u32)?;
        let tmpl = &self.preset.templates()[m.index];
        for (&slot, &byte) in tmpl.iter().zip(&input[pos..pos + m.matched]) {
            let Some(width) = recognize::placeholder_width(slot) else {
                continue;
            };
            let value = match recognize::hex_value(byte) {
                Some((nibble, _)) => nibble,
                None => continue,
            };
            self.w.write_bits(u32::from(value), width)?;
        }
        Ok(())
    }

    /// Upper-case shifts and the all-upper mode.
    fn update_case(&mut self, input: &[u8], pos: usize) -> Step<()> {
        let byte = input[pos];
        if !byte.is_ascii_uppercase() {
            // Any byte outside A..=Z ends all-upper. The mode is only ever
            // set while resting in ALPHA, so one switch suffices.
            if self.all_upper {
                self.switch_to(Set::Alpha)?;
                self.state = Set::Alpha;
                self.all_upper = false;
            }
            return Ok(());
        }
        if self.all_upper {
            return Ok(());
        }
        if self.state == Set::Num {
            self.switch_to(Set::Alpha)?;
            self.state = Set::Alpha;
        }
        self.switch_to(Set::Alpha)?;
        if self.state == Set::Delta {
            // The first switch only left DELTA; shift from ALPHA now.
            self.state = Set::Alpha;
            self.switch_to(Set::Alpha)?;
        }
        if recognize::upper_run_ahead(input, pos) {
            self.switch_to(Set::Alpha)?;
            self.all_upper = true;
        }
        Ok(())
    }

    fn literal(&mut self, input: &[u8], pos: usize) -> Step<usize> {
        let byte = input[pos];
        if self.state == Set::Delta {
            if let Some(special) = DeltaSpecial::for_byte(byte) {
                delta::write_special(&mut self.w, special)?;
                return Ok(1);
            }
        }
        let sym = |slot| Symbol { set: Set::Sym, slot };
        match byte {
            b'\r' if input.get(pos + 1) == Some(&b'\n') => {
                self.emit_symbol(sym(tables::SYM_CRLF))?;
                Ok(2)
            }
            b'\n' => self.emit_symbol(sym(tables::SYM_LF)).map(|_| 1),
            b'\r' => self.emit_symbol(sym(tables::SYM_CR)).map(|_| 1),
            b'\t' => self.emit_symbol(sym(tables::SYM_TAB)).map(|_| 1),
            b' ' => {
                let slot = if self.state == Set::Num { tables::NUM_SPACE } else { tables::ALPHA_SPACE };
                tables::write_vertical(&mut self.w, slot)?;
                Ok(1)
            }
            b'!'..=b'~' => match tables::classify(byte) {
                Some(s) => self.emit_symbol(s).map(|_| 1),
                None => Err(Fault::Unencodable { position: pos }),
            },
            _ => match delta::read_utf8(&input[pos..]) {
                Some((cp, len)) => self.codepoint(input, pos, cp, len),
                None => self.binary(input, pos),
            },
        }
    }

    fn codepoint(&mut self, input: &[u8], pos: usize, cp: u32, len: usize) -> Step<usize> {
        if !self.preset.supports_unicode() {
            return Err(Fault::Unencodable { position: pos });
        }
        if self.state != Set::Delta {
            if delta::read_utf8(&input[pos + len..]).is_some() {
                // An upper-case space opens a run of delta-coded codepoints.
                if self.state != Set::Alpha {
                    self.switch_to(Set::Alpha)?;
                    self.state = Set::Alpha;
                }
                self.switch_to(Set::Alpha)?;
                tables::write_vertical(&mut self.w, tables::ALPHA_SPACE)?;
                self.state = Set::Delta;
            } else {
                self.switch_to(Set::Delta)?;
            }
        }
        delta::write_delta(&mut self.w, cp, self.prev_cp)?;
        self.prev_cp = cp;
        Ok(len)
    }

    fn binary(&mut self, input: &[u8], pos: usize) -> Step<usize> {
        let run = recognize::binary_run(input, pos);
        trace!(pos, run, "binary run");
        self.emit_nibble_escape(NibbleKind::Binary)?;
        count::write_count(&mut self.w, run as u32)?;
        for &b in &input[pos..pos + run] {
            self.w.write_bits(u32::from(b), 8)?;
        }
        Ok(run)
    }

    /// Fills the free bits of the last byte with the start of a terminator
    /// code. The partial code never decodes as a complete token.
    fn terminate(&mut self) -> Step<()> {
        let free = self.w.free_bits();
        if free == 0 {
            return Ok(());
        }
        let mut scratch = [0u8; 4];
        {
            let mut tail = BitWriter::new(&mut scratch);
            if self.preset.is_enabled(Set::Num) {
                if self.state != Set::Num {
                    write_switch(&mut tail, self.preset, self.state, Set::Num)?;
                }
                tables::write_vertical(&mut tail, tables::NUM_TERMINATOR)?;
            }
        }
        let bits = u32::from_be_bytes(scratch) >> (32 - free);
        self.w.write_bits(bits, free)?;
        Ok(())
    }
}

fn encode(input: &[u8], out: &mut [u8], preset: &Preset, history: Option<&[&[u8]]>) -> Result<usize> {
    let capacity = out.len();
    let fault = match Encoder::new(BitWriter::new(out), preset, history).run(input) {
        Ok(len) => {
            debug!(input = input.len(), output = len, preset = preset.name(), "compressed");
            return Ok(len);
        }
        Err(fault) => fault,
    };
    let fault = match fault {
        Fault::Overflow => match Encoder::new(BitWriter::measuring(), preset, history).run(input) {
            Ok(needed) => {
                debug!(needed, capacity, "compress overflow");
                return Err(CodecError::Overflow { needed, capacity });
            }
            Err(fault) => fault,
        },
        other => other,
    };
    match fault {
        Fault::Unencodable { position } => Err(CodecError::Unencodable { position, byte: input[position] }),
        Fault::Overflow => Err(CodecError::Overflow { needed: capacity + 1, capacity }),
    }
}

/// Compresses `input` into `out`. Returns the number of bytes written.
///
/// On [`CodecError::Overflow`] the first `out.len()` bytes already match the
/// unconstrained output.
pub fn compress(input: &[u8], out: &mut [u8], preset: &Preset) -> Result<usize> {
    encode(input, out, preset, None)
}

/// Like [`compress`], with back-references into `history` (most recent line
/// first). The same history must be supplied to decompress.
pub fn compress_with_history(input: &[u8], out: &mut [u8], preset: &Preset, history: &[&[u8]]) -> Result<usize> {
    encode(input, out, preset, Some(history))
}

/// Compresses into a new buffer sized to the result.
pub fn compress_to_vec(input: &[u8], preset: &Preset) -> Result<Vec<u8>> {
    let mut out = vec![0u8; input.len() + 4];
    let len = match compress(input, &mut out, preset) {
        Err(CodecError::Overflow { needed, .. }) => {
            out.resize(needed, 0);
            compress(input, &mut out, preset)?
        }
        other => other?,
    };
    out.truncate(len);
    Ok(out)
}
