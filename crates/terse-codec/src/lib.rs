//! Terse: a compact codec for short Unicode strings.
//!
//! Each input position is coded by the first recognizer that applies:
//! 1. Back-reference into earlier text (or earlier lines)
//! 2. Repeat run of one byte
//! 3. GUID, hex run or template, packed as nibbles and small fields
//! 4. Frequent sequence from the preset
//! 5. Literal through the ALPHA / SYM / NUM prefix codes
//! 6. Codepoint delta for non-ASCII text, raw bytes for the rest
//!
//! Encoder and decoder share a [`Preset`]; streams carry no length and no
//! checksum.

pub mod bits;
pub mod count;
pub mod decoder;
pub mod delta;
pub mod encoder;
pub mod error;
pub mod history;
pub mod matcher;
pub mod preset;
pub mod recognize;
pub mod tables;

pub use decoder::{decompress, decompress_to_vec, decompress_with_history, has_magic};
pub use encoder::{compress, compress_to_vec, compress_with_history};
pub use error::{CodecError, Result};
pub use history::LineHistory;
pub use preset::{Preset, PresetConfig, PresetKind};

#[cfg(test)]
mod tests;
