//! sACN (E1.31) packet codec
//!
//! Builds and parses the fixed 638-byte E1.31 data packet (Root,
//! Framing and DMP layers plus 512 DMX slots) and provides the
//! universe multicast-group helper and sequence-gap tracker.

pub mod error;
pub mod layout;
pub mod packet;
pub mod sequence;

pub use error::{Result, SacnError};
pub use packet::{
    multicast_group, validate_sacn_universe, SacnPacket, SacnPacketOptions, SacnPayload,
};
pub use sequence::{SequenceStatus, SequenceTracker};
