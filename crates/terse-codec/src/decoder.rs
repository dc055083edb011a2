//! Decompression orchestrator.
//!
//! Walks the bit stream with the same resting-set rules as the encoder.
//! Decoding ends when the bits run out, on the terminator code, or on any
//! code or reference that cannot be interpreted. The format has no
//! checksum, so the last case is an ordinary end of stream.

use crate::bits::{BitReader, EndOfStream};
use crate::count;
use crate::delta::{self, DeltaSpecial, DeltaToken};
use crate::encoder::NibbleKind;
use crate::error::{CodecError, Result};
use crate::matcher::MIN_MATCH;
use crate::preset::Preset;
use crate::recognize::{self, HexCase, GUID_LEN};
use crate::tables::{self, Set};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    End,
    Overflow,
}

impl From<EndOfStream> for Stop {
    fn from(_: EndOfStream) -> Self {
        Stop::End
    }
}

type Step<T = ()> = std::result::Result<T, Stop>;

/// Bounded output. In measure mode nothing is stored, only counted.
struct Sink<'a> {
    out: &'a mut [u8],
    len: usize,
    measure_only: bool,
}

impl<'a> Sink<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self { out, len: 0, measure_only: false }
    }

    fn measuring() -> Sink<'static> {
        Sink { out: Default::default(), len: 0, measure_only: true }
    }

    fn push(&mut self, byte: u8) -> Step {
        if !self.measure_only {
            *self.out.get_mut(self.len).ok_or(Stop::Overflow)? = byte;
        }
        self.len += 1;
        Ok(())
    }

    fn extend(&mut self, bytes: &[u8]) -> Step {
        bytes.iter().try_for_each(|&b| self.push(b))
    }

    fn last(&self) -> Option<u8> {
        match self.len {
            0 => None,
            _ if self.measure_only => Some(0),
            n => Some(self.out[n - 1]),
        }
    }

    /// Copies `len` bytes starting at `start`; the source may run into the
    /// bytes being written.
    fn copy_within(&mut self, start: usize, len: usize) -> Step {
        for i in 0..len {
            let byte = if self.measure_only { 0 } else { self.out[start + i] };
            self.push(byte)?;
        }
        Ok(())
    }
}

struct Decoder<'a> {
    r: BitReader<'a>,
    out: Sink<'a>,
    preset: &'a Preset,
    history: Option<&'a [&'a [u8]]>,
    state: Set,
    all_upper: bool,
    prev_cp: u32,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8], out: Sink<'a>, preset: &'a Preset, history: Option<&'a [&'a [u8]]>) -> Self {
        Self {
            r: BitReader::new(input),
            out,
            preset,
            history,
            state: Set::Alpha,
            all_upper: false,
            prev_cp: 0,
        }
    }

    fn run(mut self) -> Step<usize> {
        if self.r.skip(usize::from(self.preset.magic_bits())).is_err() {
            return Ok(0);
        }
        loop {
            match self.step() {
                Ok(()) => {}
                Err(Stop::End) => {
                    trace!(bit = self.r.position(), remaining = self.r.remaining(), "end of stream");
                    return Ok(self.out.len);
                }
                Err(Stop::Overflow) => return Err(Stop::Overflow),
            }
        }
    }

    fn read_set(&mut self) -> Step<Set> {
        self.preset.horizontal().read(&mut self.r)?.ok_or(Stop::End)
    }

    fn step(&mut self) -> Step {
        if self.state == Set::Delta {
            return self.delta_step();
        }
        let slot = tables::read_vertical(&mut self.r)?;
        if slot != tables::SWITCH {
            return match self.state {
                Set::Num => self.num_symbol(slot),
                _ => self.alpha_symbol(slot, self.all_upper),
            };
        }
        match self.read_set()? {
            Set::Alpha => self.alpha_switch(),
            Set::Delta => match delta::read_delta(&mut self.r)? {
                token @ DeltaToken::Codepoint { .. } => self.push_codepoint(token),
                DeltaToken::Special(_) => Err(Stop::End),
            },
            set => self.switched(set),
        }
    }

    /// A SYM, NUM or DICT token after an explicit switch.
    fn switched(&mut self, set: Set) -> Step {
        match set {
            Set::Sym => {
                let slot = tables::read_vertical(&mut self.r)?;
                self.sym_symbol(slot)
            }
            Set::Num => match tables::read_vertical(&mut self.r)? {
                tables::NUM_NIBBLE => self.nibble(),
                slot => self.num_symbol(slot),
            },
            Set::Dict => self.back_reference(),
            Set::Alpha | Set::Delta => Err(Stop::End),
        }
    }

    fn delta_step(&mut self) -> Step {
        match delta::read_delta(&mut self.r)? {
            token @ DeltaToken::Codepoint { .. } => self.push_codepoint(token),
            DeltaToken::Special(DeltaSpecial::Switch) => match self.read_set()? {
                Set::Alpha => {
                    self.state = Set::Alpha;
                    Ok(())
                }
                Set::Delta => Ok(()),
                set => self.switched(set),
            },
            DeltaToken::Special(special) => match special.byte() {
                Some(byte) => self.out.push(byte),
                None => Err(Stop::End),
            },
        }
    }

    fn push_codepoint(&mut self, token: DeltaToken) -> Step {
        let cp = token.apply(self.prev_cp).ok_or(Stop::End)?;
        let (buf, len) = delta::encode_utf8(cp);
        self.out.extend(&buf[..len])?;
        self.prev_cp = cp;
        Ok(())
    }

    /// Switch to ALPHA while resting in ALPHA or NUM.
    fn alpha_switch(&mut self) -> Step {
        if self.state != Set::Alpha {
            self.state = Set::Alpha;
            return Ok(());
        }
        if self.all_upper {
            self.all_upper = false;
            return Ok(());
        }
        match tables::read_vertical(&mut self.r)? {
            tables::SWITCH => match self.read_set()? {
                Set::Alpha => {
                    self.all_upper = true;
                    Ok(())
                }
                _ => Err(Stop::End),
            },
            tables::ALPHA_SPACE => {
                self.state = Set::Delta;
                Ok(())
            }
            slot => self.alpha_symbol(slot, true),
        }
    }

    fn alpha_symbol(&mut self, slot: usize, upper: bool) -> Step {
        let byte = tables::ALPHA_SYMBOLS[slot];
        if upper {
            self.out.push(byte.to_ascii_uppercase())
        } else {
            self.out.push(byte)
        }
    }

    fn sym_symbol(&mut self, slot: usize) -> Step {
        match slot {
            tables::SYM_CRLF => self.out.extend(b"\r\n"),
            s if s >= tables::SYM_FREQ_BASE => self.freq_seq(s - tables::SYM_FREQ_BASE),
            s => self.out.push(tables::SYM_SYMBOLS[s]),
        }
    }

    fn num_symbol(&mut self, slot: usize) -> Step {
        match slot {
            tables::NUM_TERMINATOR => Err(Stop::End),
            tables::NUM_REPEAT => {
                let times = count::read_count(&mut self.r)? as usize + 4;
                let byte = self.out.last().ok_or(Stop::End)?;
                (0..times).try_for_each(|_| self.out.push(byte))
            }
            s if s >= tables::NUM_FREQ_BASE => self.freq_seq(s - tables::NUM_FREQ_BASE + 3),
            s => {
                let byte = tables::NUM_SYMBOLS[s];
                if byte.is_ascii_digit() {
                    self.state = Set::Num;
                }
                self.out.push(byte)
            }
        }
    }

    fn freq_seq(&mut self, index: usize) -> Step {
        let preset = self.preset;
        let seq = preset.freq_seqs().get(index).ok_or(Stop::End)?;
        self.out.extend(seq)
    }

    fn back_reference(&mut self) -> Step {
        let len = count::read_count(&mut self.r)? as usize + MIN_MATCH;
        let Some(history) = self.history else {
            let distance = count::read_count(&mut self.r)? as usize + MIN_MATCH - 1;
            let start = self.out.len.checked_sub(distance).ok_or(Stop::End)?;
            return self.out.copy_within(start, len);
        };
        let position = count::read_count(&mut self.r)? as usize;
        let line = count::read_count(&mut self.r)? as usize;
        if line == 0 {
            if position >= self.out.len {
                return Err(Stop::End);
            }
            return self.out.copy_within(position, len);
        }
        let source = history
            .get(line - 1)
            .and_then(|text| text.get(position..position + len))
            .ok_or(Stop::End)?;
        self.out.extend(source)
    }

    /// Templates, hex runs, GUIDs and binary runs.
    fn nibble(&mut self) -> Step {
        let kind = NibbleKind::ORDER[self.r.read_step(NibbleKind::ORDER.len() - 1)?];
        match kind {
            NibbleKind::Template => self.template(),
            NibbleKind::HexLower | NibbleKind::HexUpper => {
                let case = if kind == NibbleKind::HexLower { HexCase::Lower } else { HexCase::Upper };
                let len = count::read_count(&mut self.r)? as usize;
                if len * 4 > self.r.remaining() {
                    return Err(Stop::End);
                }
                for _ in 0..len {
                    let nibble = self.r.read_bits(4)? as u8;
                    self.out.push(recognize::hex_digit(nibble, case))?;
                }
                Ok(())
            }
            NibbleKind::GuidLower | NibbleKind::GuidUpper => {
                let case = if kind == NibbleKind::GuidLower { HexCase::Lower } else { HexCase::Upper };
                let nibbles = GUID_LEN - 4;
                if nibbles * 4 > self.r.remaining() {
                    return Err(Stop::End);
                }
                for i in 0..nibbles {
                    let nibble = self.r.read_bits(4)? as u8;
                    self.out.push(recognize::hex_digit(nibble, case))?;
                    if matches!(i, 7 | 11 | 15 | 19) {
                        self.out.push(b'-')?;
                    }
                }
                Ok(())
            }
            NibbleKind::Binary => {
                let len = count::read_count(&mut self.r)? as usize;
                if len * 8 > self.r.remaining() {
                    return Err(Stop::End);
                }
                for _ in 0..len {
                    let byte = self.r.read_bits(8)? as u8;
                    self.out.push(byte)?;
                }
                Ok(())
            }
        }
    }

    fn template(&mut self) -> Step {
        let preset = self.preset;
        let index = count::read_step(&mut self.r)?;
        let tmpl = preset.templates().get(index).ok_or(Stop::End)?;
        let unmatched = count::read_count(&mut self.r)? as usize;
        let matched = tmpl.len().checked_sub(unmatched).ok_or(Stop::End)?;
        let needed: usize = tmpl[..matched]
            .iter()
            .filter_map(|&slot| recognize::placeholder_width(slot))
            .map(|w| w as usize)
            .sum();
        if needed > self.r.remaining() {
            return Err(Stop::End);
        }
        for &slot in &tmpl[..matched] {
            let byte = match recognize::placeholder_width(slot) {
                None => slot,
                Some(width) => {
                    let value = self.r.read_bits(width)? as u8;
                    match slot {
                        b'F' => recognize::hex_digit(value, HexCase::Upper),
                        _ => recognize::hex_digit(value, HexCase::Lower),
                    }
                }
            };
            self.out.push(byte)?;
        }
        Ok(())
    }
}

fn decode(input: &[u8], out: &mut [u8], preset: &Preset, history: Option<&[&[u8]]>) -> Result<usize> {
    let capacity = out.len();
    match Decoder::new(input, Sink::new(out), preset, history).run() {
        Ok(len) => {
            debug!(input = input.len(), output = len, preset = preset.name(), "decompressed");
            Ok(len)
        }
        Err(_) => {
            let needed = Decoder::new(input, Sink::measuring(), preset, history)
                .run()
                .unwrap_or(capacity + 1);
            debug!(needed, capacity, "decompress overflow");
            Err(CodecError::Overflow { needed, capacity })
        }
    }
}

/// Decompresses `input` into `out`. Returns the number of bytes written.
///
/// On [`CodecError::Overflow`] the first `out.len()` bytes already hold the
/// start of the decoded text.
pub fn decompress(input: &[u8], out: &mut [u8], preset: &Preset) -> Result<usize> {
    decode(input, out, preset, None)
}

/// Decompresses a stream produced by
/// [`compress_with_history`](crate::encoder::compress_with_history) against
/// the same history.
pub fn decompress_with_history(input: &[u8], out: &mut [u8], preset: &Preset, history: &[&[u8]]) -> Result<usize> {
    decode(input, out, preset, Some(history))
}

/// Whether `input` starts with the preset's magic bits.
pub fn has_magic(input: &[u8], preset: &Preset) -> bool {
    let bits = u32::from(preset.magic_bits());
    let mut r = BitReader::new(input);
    r.read_bits(bits).is_ok_and(|v| v == (1 << bits) - 1)
}

/// Decompresses into a new buffer sized to the result.
pub fn decompress_to_vec(input: &[u8], preset: &Preset) -> Result<Vec<u8>> {
    let mut out = vec![0u8; input.len() * 3 + 16];
    let len = match decompress(input, &mut out, preset) {
        Err(CodecError::Overflow { needed, .. }) => {
            out.resize(needed, 0);
            decompress(input, &mut out, preset)?
        }
        other => other?,
    };
    out.truncate(len);
    Ok(out)
}
