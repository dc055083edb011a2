use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    /// The caller's buffer cannot hold the result. `needed` is exact.
    #[error("Output overflow: {needed} bytes needed, capacity {capacity}")]
    Overflow { needed: usize, capacity: usize },

    #[error("Byte 0x{byte:02x} at position {position} is not encodable with this preset")]
    Unencodable { position: usize, byte: u8 },

    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    #[error("Preset config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CodecError {
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
