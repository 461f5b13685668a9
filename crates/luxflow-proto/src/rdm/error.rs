//! Error types for E1.20 RDM frames
use thiserror::Error;

/// Errors returned by the RDM frame codec and discovery-response decoder
#[derive(Error, Debug)]
pub enum RdmError {
    #[error("invalid start code: {value:#04x}")]
    InvalidStartCode { value: u8 },

    #[error("invalid length: {length}")]
    InvalidLength { length: usize },

    #[error("invalid PDL: {pdl}")]
    InvalidPdl { pdl: u8 },

    #[error("checksum mismatch: computed {computed:#06x}, found {found:#06x}")]
    ChecksumMismatch { computed: u16, found: u16 },

    #[error("invalid discovery preamble")]
    InvalidDiscoveryPreamble,

    #[error("uid error: {0}")]
    Uid(#[from] luxflow_core::CoreError),
}

/// Result type for RDM codec operations
pub type Result<T> = std::result::Result<T, RdmError>;
