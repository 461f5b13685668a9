//! E1.20 RDM frame encode/decode
//!
//! One frame type serves both directions: requests carry a port id in
//! the byte that responses reuse for the response type, and the
//! command class distinguishes the two.

use luxflow_core::Uid;

use super::consts;
use super::error::RdmError;
use super::Result;

/// An E1.20 RDM message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmFrame {
    pub destination: Uid,
    pub source: Uid,
    pub transaction: u8,
    /// Port id on requests, response type on responses
    pub port_id: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: u8,
    pub pid: u16,
    pub parameter_data: Vec<u8>,
}

impl RdmFrame {
    /// Convenience constructor for a request frame
    pub fn request(
        destination: Uid,
        source: Uid,
        transaction: u8,
        command_class: u8,
        pid: u16,
        parameter_data: Vec<u8>,
    ) -> Self {
        Self {
            destination,
            source,
            transaction,
            port_id: 1,
            message_count: 0,
            sub_device: 0,
            command_class,
            pid,
            parameter_data,
        }
    }

    /// Whether the command class is one of the `_RESPONSE` classes
    pub fn is_response(&self) -> bool {
        matches!(
            self.command_class,
            consts::DISCOVERY_COMMAND_RESPONSE
                | consts::GET_COMMAND_RESPONSE
                | consts::SET_COMMAND_RESPONSE
        )
    }

    /// Encode to wire bytes, appending the 16-bit checksum
    pub fn encode(&self) -> Result<Vec<u8>> {
        let pdl = self.parameter_data.len();
        if pdl > consts::MAX_PDL as usize {
            return Err(RdmError::InvalidPdl { pdl: pdl as u8 });
        }
        let message_length = consts::FRAME_HEADER_LEN + pdl;

        let mut frame = Vec::with_capacity(message_length + 2);
        frame.push(consts::START_CODE);
        frame.push(consts::SUB_START_CODE);
        frame.push(message_length as u8);
        frame.extend_from_slice(&self.destination.to_bytes());
        frame.extend_from_slice(&self.source.to_bytes());
        frame.push(self.transaction);
        frame.push(self.port_id);
        frame.push(self.message_count);
        frame.extend_from_slice(&self.sub_device.to_be_bytes());
        frame.push(self.command_class);
        frame.extend_from_slice(&self.pid.to_be_bytes());
        frame.push(pdl as u8);
        frame.extend_from_slice(&self.parameter_data);

        let checksum = checksum(&frame);
        frame.extend_from_slice(&checksum.to_be_bytes());
        Ok(frame)
    }

    /// Encode without the leading 0xCC start code (the Art-Net OpRdm form)
    pub fn encode_sans_start_code(&self) -> Result<Vec<u8>> {
        let mut frame = self.encode()?;
        frame.remove(0);
        Ok(frame)
    }

    /// Decode from wire bytes, validating structure and checksum
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < consts::FRAME_HEADER_LEN + 2 {
            return Err(RdmError::InvalidLength {
                length: payload.len(),
            });
        }
        if payload[0] != consts::START_CODE {
            return Err(RdmError::InvalidStartCode { value: payload[0] });
        }
        if payload[1] != consts::SUB_START_CODE {
            return Err(RdmError::InvalidStartCode { value: payload[1] });
        }

        let message_length = payload[2] as usize;
        if message_length < consts::FRAME_HEADER_LEN || message_length + 2 > payload.len() {
            return Err(RdmError::InvalidLength {
                length: message_length,
            });
        }

        let pdl = payload[23];
        if pdl > consts::MAX_PDL || consts::FRAME_HEADER_LEN + pdl as usize > message_length {
            return Err(RdmError::InvalidPdl { pdl });
        }

        let computed = checksum(&payload[..message_length]);
        let found = u16::from_be_bytes([payload[message_length], payload[message_length + 1]]);
        if computed != found {
            return Err(RdmError::ChecksumMismatch { computed, found });
        }

        Ok(Self {
            destination: Uid::from_bytes(&payload[3..9])?,
            source: Uid::from_bytes(&payload[9..15])?,
            transaction: payload[15],
            port_id: payload[16],
            message_count: payload[17],
            sub_device: u16::from_be_bytes([payload[18], payload[19]]),
            command_class: payload[20],
            pid: u16::from_be_bytes([payload[21], payload[22]]),
            parameter_data: payload[24..24 + pdl as usize].to_vec(),
        })
    }

    /// Decode a frame that is missing its 0xCC start code
    pub fn decode_sans_start_code(payload: &[u8]) -> Result<Self> {
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(consts::START_CODE);
        frame.extend_from_slice(payload);
        Self::decode(&frame)
    }
}

/// Unsigned sum of every byte, mod 2^16
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16))
}
