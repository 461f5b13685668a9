//! Error type shared by the RDMnet message codecs
//!
//! The stream client attaches the message domain (broker/rpt/ept/llrp)
//! when it reports one of these; the codec itself only describes what
//! was wrong with the bytes.

use thiserror::Error;

use crate::rdm::RdmError;

/// Errors returned by the Broker/RPT/EPT/LLRP message codecs
#[derive(Error, Debug)]
pub enum RdmnetDecodeError {
    #[error("message too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("unknown message vector: {vector:#010x}")]
    UnknownVector { vector: u32 },

    #[error("invalid {field} value: {value}")]
    InvalidEnumValue { field: &'static str, value: u32 },

    #[error("reserved byte at offset {offset} must be zero, got {value:#04x}")]
    ReservedNonZero { offset: usize, value: u8 },

    #[error("trailing bytes: message is {expected} bytes, got {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    #[error("length field overruns buffer: claims {claimed} bytes, {available} available")]
    LengthOverrun { claimed: usize, available: usize },

    #[error("text block is not valid UTF-8")]
    InvalidText,

    #[error("outer {field} UID {outer} does not match embedded RDM frame UID {embedded}")]
    UidMismatch {
        field: &'static str,
        outer: String,
        embedded: String,
    },

    #[error("embedded RDM frame: {0}")]
    Rdm(#[from] RdmError),

    #[error("uid error: {0}")]
    Uid(#[from] luxflow_core::CoreError),
}

/// Result type for RDMnet message codec operations
pub type Result<T> = std::result::Result<T, RdmnetDecodeError>;
