//! E1.20 constants: command classes, response types and well-known PIDs

pub const START_CODE: u8 = 0xCC;
pub const SUB_START_CODE: u8 = 0x01;
/// Frame bytes before the parameter data (including the start code)
pub const FRAME_HEADER_LEN: usize = 24;
pub const MAX_PDL: u8 = 231;

// Command classes
pub const DISCOVERY_COMMAND: u8 = 0x10;
pub const DISCOVERY_COMMAND_RESPONSE: u8 = 0x11;
pub const GET_COMMAND: u8 = 0x20;
pub const GET_COMMAND_RESPONSE: u8 = 0x21;
pub const SET_COMMAND: u8 = 0x30;
pub const SET_COMMAND_RESPONSE: u8 = 0x31;

// Response types (carried in the port-id byte of response frames)
pub const RESPONSE_TYPE_ACK: u8 = 0x00;
pub const RESPONSE_TYPE_ACK_TIMER: u8 = 0x01;
pub const RESPONSE_TYPE_NACK_REASON: u8 = 0x02;
pub const RESPONSE_TYPE_ACK_OVERFLOW: u8 = 0x03;

// Discovery parameter ids
pub const PID_DISC_UNIQUE_BRANCH: u16 = 0x0001;
pub const PID_DISC_MUTE: u16 = 0x0002;
pub const PID_DISC_UN_MUTE: u16 = 0x0003;

// Common management parameter ids
pub const PID_SUPPORTED_PARAMETERS: u16 = 0x0050;
pub const PID_PARAMETER_DESCRIPTION: u16 = 0x0051;
pub const PID_DEVICE_INFO: u16 = 0x0060;
pub const PID_SOFTWARE_VERSION_LABEL: u16 = 0x00C0;
pub const PID_DEVICE_LABEL: u16 = 0x0082;
pub const PID_MANUFACTURER_LABEL: u16 = 0x0081;
pub const PID_DEVICE_MODEL_DESCRIPTION: u16 = 0x0080;
pub const PID_DMX_START_ADDRESS: u16 = 0x00F0;
pub const PID_IDENTIFY_DEVICE: u16 = 0x1000;

// NACK reason codes
pub const NACK_UNKNOWN_PID: u16 = 0x0000;
pub const NACK_FORMAT_ERROR: u16 = 0x0001;
pub const NACK_HARDWARE_FAULT: u16 = 0x0002;
pub const NACK_WRITE_PROTECT: u16 = 0x0004;
pub const NACK_UNSUPPORTED_COMMAND_CLASS: u16 = 0x0005;
pub const NACK_DATA_OUT_OF_RANGE: u16 = 0x0006;

// Discovery response framing
pub const DISCOVERY_PREAMBLE_BYTE: u8 = 0xFE;
pub const DISCOVERY_PREAMBLE_SEPARATOR: u8 = 0xAA;
pub const DISCOVERY_PREAMBLE_MAX: usize = 7;
