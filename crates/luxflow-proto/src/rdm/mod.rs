//! RDM (E1.20) frame codec
//!
//! Encoding and validated decoding of RDM request/response frames with
//! their additive checksum, plus the masked DISC_UNIQUE_BRANCH
//! discovery-response convention and the well-known constant tables.

pub mod consts;
pub mod discovery;
pub mod error;
pub mod frame;

pub use discovery::{decode_discovery_response, encode_discovery_response};
pub use error::{RdmError, Result};
pub use frame::{checksum, RdmFrame};
