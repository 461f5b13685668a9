//! Byte offsets and constants for E1.31 (sACN) data packets
//!
//! The packet is three layered PDUs (Root, Framing, DMP) in a fixed
//! 126-byte header, followed by the start code and 512 DMX slots.

use std::ops::Range;

pub const PREAMBLE_SIZE_RANGE: Range<usize> = 0..2;
pub const POSTAMBLE_SIZE_RANGE: Range<usize> = 2..4;
pub const ACN_PID_RANGE: Range<usize> = 4..16;
pub const ROOT_FLAGS_RANGE: Range<usize> = 16..18;
pub const ROOT_VECTOR_RANGE: Range<usize> = 18..22;
pub const CID_RANGE: Range<usize> = 22..38;
pub const FRAMING_FLAGS_RANGE: Range<usize> = 38..40;
pub const FRAMING_VECTOR_RANGE: Range<usize> = 40..44;
pub const SOURCE_NAME_RANGE: Range<usize> = 44..108;
pub const PRIORITY_OFFSET: usize = 108;
pub const SYNC_UNIVERSE_RANGE: Range<usize> = 109..111;
pub const SEQUENCE_OFFSET: usize = 111;
pub const OPTIONS_OFFSET: usize = 112;
pub const UNIVERSE_RANGE: Range<usize> = 113..115;
pub const DMP_FLAGS_RANGE: Range<usize> = 115..117;
pub const DMP_VECTOR_OFFSET: usize = 117;
pub const DMP_TYPE_OFFSET: usize = 118;
pub const FIRST_ADDRESS_RANGE: Range<usize> = 119..121;
pub const ADDRESS_INCREMENT_RANGE: Range<usize> = 121..123;
pub const PROPERTY_COUNT_RANGE: Range<usize> = 123..125;
pub const START_CODE_OFFSET: usize = 125;
pub const DMX_DATA_OFFSET: usize = 126;
pub const DMX_SLOTS: usize = 512;
pub const PACKET_LEN: usize = DMX_DATA_OFFSET + DMX_SLOTS;

pub const PREAMBLE_SIZE: u16 = 0x0010;
pub const POSTAMBLE_SIZE: u16 = 0x0000;
pub const ACN_PID: &[u8; 12] = b"ASC-E1.17\0\0\0";
// Flags words: upper nibble 0x7, lower 12 bits the PDU length.
pub const ROOT_FLAGS: u16 = 0x726e;
pub const FRAMING_FLAGS: u16 = 0x7258;
pub const DMP_FLAGS: u16 = 0x720b;
pub const ROOT_VECTOR_DATA: u32 = 0x0000_0004;
pub const FRAMING_VECTOR_DMX: u32 = 0x0000_0002;
pub const DMP_VECTOR_SET_PROPERTY: u8 = 0x02;
pub const DMP_TYPE: u8 = 0xA1;
pub const PROPERTY_COUNT: u16 = 0x0201;

pub const SOURCE_NAME_LEN: usize = 64;
pub const DEFAULT_PRIORITY: u8 = 100;
pub const SACN_PORT: u16 = 5568;
