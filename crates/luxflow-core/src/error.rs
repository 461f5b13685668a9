//! Error types for core DMX value types
use thiserror::Error;

/// Errors raised by UID and universe value types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Universe id outside 1-63999 (or the sACN test universe)
    #[error("invalid universe: {universe} (must be 1-63999)")]
    InvalidUniverse { universe: u32 },

    /// DMX channel outside 1-512
    #[error("invalid DMX channel: {channel} (must be 1-512)")]
    InvalidChannel { channel: u16 },

    /// UID wire encoding must be exactly 6 bytes
    #[error("invalid UID length: {length} bytes (expected 6)")]
    InvalidUidLength { length: usize },

    /// UID string not of the form `manu:device` with hex fields
    #[error("invalid UID string: {value:?}")]
    InvalidUidString { value: String },

    /// Range bounds passed in the wrong order
    #[error("inverted UID range: {low} > {high}")]
    InvertedUidRange { low: String, high: String },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
