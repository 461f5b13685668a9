//! Error types for Art-Net packet building and parsing
use thiserror::Error;

/// Errors returned by Art-Net builders and parsers
#[derive(Error, Debug)]
pub enum ArtNetError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("invalid ArtDMX length: {length}")]
    InvalidLength { length: u16 },

    /// Port-Address only spans 15 bits, so 1-based universes stop at 32768
    #[error("invalid Art-Net universe: {universe} (must be 1-32768)")]
    InvalidUniverse { universe: u16 },

    #[error("payload too long: {length} bytes (max {max})")]
    PayloadTooLong { length: usize, max: usize },
}

/// Result type for Art-Net codec operations
pub type Result<T> = std::result::Result<T, ArtNetError>;
