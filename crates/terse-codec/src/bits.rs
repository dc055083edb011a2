//! MSB-first bit I/O over caller-owned byte slices.
//!
//! The writer never grows its buffer. A write that would land past the last
//! byte fails with [`BitOverflow`] after committing the bits that fit, so the
//! bytes already produced always equal the prefix of an unconstrained run.
//! The reader pads with one-bits past the end of its input and reports
//! [`EndOfStream`] when a code would need those padding bits.

/// A write would land past the end of the output slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitOverflow;

/// A read needs bits beyond the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfStream;

pub struct BitWriter<'a> {
    out: &'a mut [u8],
    bit_pos: usize,
    measure_only: bool,
}

impl<'a> BitWriter<'a> {
    pub fn new(out: &'a mut [u8]) -> Self {
        Self { out, bit_pos: 0, measure_only: false }
    }

    /// A writer that only counts bits. Used to size an overflowed result.
    pub fn measuring() -> BitWriter<'static> {
        BitWriter { out: Default::default(), bit_pos: 0, measure_only: true }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_pos
    }

    pub fn byte_len(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    /// Unused bits left in the final, partially written byte.
    pub fn free_bits(&self) -> u32 {
        ((8 - self.bit_pos % 8) % 8) as u32
    }

    /// Writes the low `count` bits of `value`, most significant first.
    ///
    /// Returns the new bit offset.
    pub fn write_bits(&mut self, value: u32, count: u32) -> Result<usize, BitOverflow> {
        debug_assert!(count <= 32);
        if self.measure_only {
            self.bit_pos += count as usize;
            return Ok(self.bit_pos);
        }
        let mut remaining = count;
        while remaining > 0 {
            let Some(byte) = self.out.get_mut(self.bit_pos / 8) else {
                return Err(BitOverflow);
            };
            let used = (self.bit_pos % 8) as u32;
            if used == 0 {
                *byte = 0;
            }
            let take = remaining.min(8 - used);
            let chunk = (value >> (remaining - take)) & ((1u32 << take) - 1);
            *byte |= (chunk << (8 - used - take)) as u8;
            self.bit_pos += take as usize;
            remaining -= take;
        }
        Ok(self.bit_pos)
    }

    /// Writes the top `len` bits of a left-aligned table code.
    pub fn write_code(&mut self, code: u8, len: u8) -> Result<usize, BitOverflow> {
        if len == 0 {
            return Ok(self.bit_pos);
        }
        self.write_bits(u32::from(code >> (8 - len)), u32::from(len))
    }
}

pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.bit_pos
    }

    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    /// Next 8 bits, left-aligned. Positions past the end read as one-bits.
    pub fn peek8(&self) -> u8 {
        let idx = self.bit_pos / 8;
        let hi = self.data.get(idx).copied().unwrap_or(0xFF);
        let lo = self.data.get(idx + 1).copied().unwrap_or(0xFF);
        let word = (u16::from(hi) << 8) | u16::from(lo);
        let mut code = ((word << (self.bit_pos % 8)) >> 8) as u8;
        let avail = self.remaining();
        if avail < 8 {
            code |= 0xFF >> avail;
        }
        code
    }

    pub fn skip(&mut self, count: usize) -> Result<(), EndOfStream> {
        if count > self.remaining() {
            return Err(EndOfStream);
        }
        self.bit_pos += count;
        Ok(())
    }

    pub fn read_bit(&mut self) -> Result<bool, EndOfStream> {
        if self.remaining() == 0 {
            return Err(EndOfStream);
        }
        let bit = (self.data[self.bit_pos / 8] >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads `count` bits as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, EndOfStream> {
        debug_assert!(count <= 32);
        if count as usize > self.remaining() {
            return Err(EndOfStream);
        }
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Counts leading one-bits, stopping after a zero or at `limit` ones.
    pub fn read_step(&mut self, limit: usize) -> Result<usize, EndOfStream> {
        let mut idx = 0;
        while idx < limit {
            if !self.read_bit()? {
                break;
            }
            idx += 1;
        }
        Ok(idx)
    }
}
