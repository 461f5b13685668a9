//! Error types for ACN root-layer packets
use thiserror::Error;

/// Errors returned by the ACN root-layer codec
#[derive(Error, Debug)]
pub enum AcnError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("invalid preamble/postamble sizes")]
    InvalidPreamble,

    #[error("invalid ACN packet identifier")]
    InvalidPid,

    #[error("invalid root flags+length word: {value:#06x}")]
    InvalidFlags { value: u16 },

    #[error("invalid root PDU length: {length} (minimum 22)")]
    InvalidRootLength { length: u16 },

    #[error("trailing bytes after root PDU: expected {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    #[error("root PDU data too long: {length} bytes (max {max})")]
    DataTooLong { length: usize, max: usize },
}

/// Result type for ACN root-layer operations
pub type Result<T> = std::result::Result<T, AcnError>;
