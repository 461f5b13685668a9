//! Error types for sACN packet building and parsing
use thiserror::Error;

/// Errors returned by sACN packet builders and parsers
#[derive(Error, Debug)]
pub enum SacnError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("invalid preamble/postamble sizes")]
    InvalidPreamble,

    #[error("invalid ACN packet identifier")]
    InvalidAcnPid,

    #[error("invalid {layer} flags+length word: {value:#06x}")]
    InvalidFlags { layer: &'static str, value: u16 },

    #[error("invalid root vector: {value:#010x}")]
    InvalidRootVector { value: u32 },

    #[error("invalid framing vector: {value:#010x}")]
    InvalidFramingVector { value: u32 },

    #[error("invalid DMP vector: {value:#04x}")]
    InvalidDmpVector { value: u8 },

    #[error("invalid DMP address/data type: {value:#04x}")]
    InvalidDmpType { value: u8 },

    #[error("invalid DMP first address: {value}")]
    InvalidFirstAddress { value: u16 },

    #[error("invalid DMP address increment: {value}")]
    InvalidAddressIncrement { value: u16 },

    #[error("invalid property value count: {count}")]
    InvalidPropertyValueCount { count: u16 },

    #[error("invalid start code: {value}")]
    InvalidStartCode { value: u8 },

    #[error("invalid sACN universe: {universe} (must be 1-63999)")]
    InvalidUniverse { universe: u16 },

    #[error("invalid DMX channel: {channel} (must be 1-512)")]
    InvalidChannel { channel: u16 },
}

/// Result type for sACN codec operations
pub type Result<T> = std::result::Result<T, SacnError>;
