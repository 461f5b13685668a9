//! Byte offsets and constants for Art-Net 4 packets
//!
//! All packets open with the 8-byte identifier, a little-endian opcode
//! and (except ArtPollReply) the big-endian protocol version.

use std::ops::Range;

pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
pub const PROTOCOL_VERSION: u16 = 14;

pub const ID_RANGE: Range<usize> = 0..8;
pub const OPCODE_RANGE: Range<usize> = 8..10;
pub const VERSION_RANGE: Range<usize> = 10..12;
pub const HEADER_LEN: usize = 12;

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DIAG_DATA: u16 = 0x2300;
pub const OP_COMMAND: u16 = 0x2400;
pub const OP_DMX: u16 = 0x5000;
pub const OP_SYNC: u16 = 0x5200;
pub const OP_TOD_REQUEST: u16 = 0x8000;
pub const OP_TOD_DATA: u16 = 0x8100;
pub const OP_TOD_CONTROL: u16 = 0x8200;
pub const OP_RDM: u16 = 0x8300;
pub const OP_TIME_CODE: u16 = 0x9700;
pub const OP_TRIGGER: u16 = 0x9900;

// ArtDmx
pub const DMX_SEQUENCE_OFFSET: usize = 12;
pub const DMX_PHYSICAL_OFFSET: usize = 13;
pub const DMX_SUBUNI_OFFSET: usize = 14;
pub const DMX_NET_OFFSET: usize = 15;
pub const DMX_LENGTH_RANGE: Range<usize> = 16..18;
pub const DMX_DATA_OFFSET: usize = 18;
pub const DMX_MAX_SLOTS: usize = 512;

// ArtPoll
pub const POLL_TALK_TO_ME_OFFSET: usize = 12;
pub const POLL_PRIORITY_OFFSET: usize = 13;
pub const POLL_LEN: usize = 14;

// ArtSync
pub const SYNC_LEN: usize = 14;

// ArtDiagData
pub const DIAG_PRIORITY_OFFSET: usize = 13;
pub const DIAG_LENGTH_RANGE: Range<usize> = 16..18;
pub const DIAG_DATA_OFFSET: usize = 18;

// ArtTimeCode
pub const TIME_CODE_FRAMES_OFFSET: usize = 14;
pub const TIME_CODE_SECONDS_OFFSET: usize = 15;
pub const TIME_CODE_MINUTES_OFFSET: usize = 16;
pub const TIME_CODE_HOURS_OFFSET: usize = 17;
pub const TIME_CODE_TYPE_OFFSET: usize = 18;
pub const TIME_CODE_LEN: usize = 19;

// ArtCommand
pub const COMMAND_ESTA_RANGE: Range<usize> = 12..14;
pub const COMMAND_LENGTH_RANGE: Range<usize> = 14..16;
pub const COMMAND_DATA_OFFSET: usize = 16;
pub const COMMAND_MAX_DATA: usize = 512;

// ArtTrigger
pub const TRIGGER_OEM_RANGE: Range<usize> = 14..16;
pub const TRIGGER_KEY_OFFSET: usize = 16;
pub const TRIGGER_SUBKEY_OFFSET: usize = 17;
pub const TRIGGER_DATA_OFFSET: usize = 18;
pub const TRIGGER_MAX_DATA: usize = 512;

// ArtPollReply (fixed 239 bytes, no protocol version field)
pub const REPLY_IP_RANGE: Range<usize> = 10..14;
pub const REPLY_PORT_RANGE: Range<usize> = 14..16;
pub const REPLY_VERSION_RANGE: Range<usize> = 16..18;
pub const REPLY_NET_SWITCH_OFFSET: usize = 18;
pub const REPLY_SUB_SWITCH_OFFSET: usize = 19;
pub const REPLY_OEM_RANGE: Range<usize> = 20..22;
pub const REPLY_UBEA_OFFSET: usize = 22;
pub const REPLY_STATUS1_OFFSET: usize = 23;
pub const REPLY_ESTA_RANGE: Range<usize> = 24..26;
pub const REPLY_PORT_NAME_RANGE: Range<usize> = 26..44;
pub const REPLY_LONG_NAME_RANGE: Range<usize> = 44..108;
pub const REPLY_NODE_REPORT_RANGE: Range<usize> = 108..172;
pub const REPLY_NUM_PORTS_RANGE: Range<usize> = 172..174;
pub const REPLY_PORT_TYPES_RANGE: Range<usize> = 174..178;
pub const REPLY_GOOD_INPUT_RANGE: Range<usize> = 178..182;
pub const REPLY_GOOD_OUTPUT_RANGE: Range<usize> = 182..186;
pub const REPLY_SW_IN_RANGE: Range<usize> = 186..190;
pub const REPLY_SW_OUT_RANGE: Range<usize> = 190..194;
pub const REPLY_STYLE_OFFSET: usize = 200;
pub const REPLY_MAC_RANGE: Range<usize> = 201..207;
pub const REPLY_BIND_IP_RANGE: Range<usize> = 207..211;
pub const REPLY_BIND_INDEX_OFFSET: usize = 211;
pub const REPLY_STATUS2_OFFSET: usize = 212;
pub const REPLY_LEN: usize = 239;

// ArtTodRequest
pub const TOD_REQUEST_NET_OFFSET: usize = 21;
pub const TOD_REQUEST_COMMAND_OFFSET: usize = 22;
pub const TOD_REQUEST_ADD_COUNT_OFFSET: usize = 23;
pub const TOD_REQUEST_ADDRESS_OFFSET: usize = 24;
pub const TOD_REQUEST_LEN: usize = 25;

// ArtTodData
pub const TOD_DATA_RDM_VER_OFFSET: usize = 12;
pub const TOD_DATA_PORT_OFFSET: usize = 13;
pub const TOD_DATA_NET_OFFSET: usize = 21;
pub const TOD_DATA_COMMAND_OFFSET: usize = 22;
pub const TOD_DATA_ADDRESS_OFFSET: usize = 23;
pub const TOD_DATA_UID_TOTAL_RANGE: Range<usize> = 24..26;
pub const TOD_DATA_BLOCK_COUNT_OFFSET: usize = 26;
pub const TOD_DATA_UID_COUNT_OFFSET: usize = 27;
pub const TOD_DATA_UID_OFFSET: usize = 28;

// ArtTodControl
pub const TOD_CONTROL_NET_OFFSET: usize = 21;
pub const TOD_CONTROL_COMMAND_OFFSET: usize = 22;
pub const TOD_CONTROL_ADDRESS_OFFSET: usize = 23;
pub const TOD_CONTROL_LEN: usize = 24;

// ArtRdm
pub const RDM_VER_OFFSET: usize = 12;
pub const RDM_NET_OFFSET: usize = 21;
pub const RDM_COMMAND_OFFSET: usize = 22;
pub const RDM_ADDRESS_OFFSET: usize = 23;
pub const RDM_DATA_OFFSET: usize = 24;

pub const RDM_PROTOCOL_VERSION: u8 = 0x01;
pub const TOD_FULL: u8 = 0x00;
pub const TOD_FLUSH: u8 = 0x01;
pub const AR_PROCESS: u8 = 0x00;
