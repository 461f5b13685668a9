//! EPT protocol messages (extensible payload transport)

use super::cursor::{write_text, Cursor};
use super::error::RdmnetDecodeError;
use super::Result;

pub const VECTOR_DATA: u32 = 0x01;
pub const VECTOR_STATUS: u32 = 0x02;

/// Status carried by an EPT Status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EptStatusCode {
    Ok = 0,
    UnknownCid = 1,
    UnknownVector = 2,
    MalformedPacket = 3,
}

impl TryFrom<u16> for EptStatusCode {
    type Error = RdmnetDecodeError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::UnknownCid),
            2 => Ok(Self::UnknownVector),
            3 => Ok(Self::MalformedPacket),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "ept status code",
                value: value as u32,
            }),
        }
    }
}

/// An EPT-domain message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EptMessage {
    Data {
        sequence: u32,
        manufacturer: u16,
        protocol: u16,
        payload: Vec<u8>,
    },
    Status {
        sequence: u32,
        status: EptStatusCode,
        text: String,
    },
}

impl EptMessage {
    /// The message's inner vector
    pub fn vector(&self) -> u32 {
        match self {
            Self::Data { .. } => VECTOR_DATA,
            Self::Status { .. } => VECTOR_STATUS,
        }
    }

    /// The message's sequence number
    pub fn sequence(&self) -> u32 {
        match self {
            Self::Data { sequence, .. } | Self::Status { sequence, .. } => *sequence,
        }
    }

    /// Encode to the EPT wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&self.vector().to_be_bytes());
        out.extend_from_slice(&self.sequence().to_be_bytes());

        match self {
            Self::Data {
                manufacturer,
                protocol,
                payload,
                ..
            } => {
                out.extend_from_slice(&manufacturer.to_be_bytes());
                out.extend_from_slice(&protocol.to_be_bytes());
                out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                out.extend_from_slice(payload);
            }
            Self::Status { status, text, .. } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                write_text(&mut out, text);
            }
        }
        out
    }

    /// Strictly decode from the EPT wire layout
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);
        let vector = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;

        let message = match vector {
            VECTOR_DATA => {
                let manufacturer = cursor.read_u16()?;
                let protocol = cursor.read_u16()?;
                let length = cursor.read_u32()? as usize;
                if cursor.remaining() < length {
                    return Err(RdmnetDecodeError::LengthOverrun {
                        claimed: length,
                        available: cursor.remaining(),
                    });
                }
                let data = cursor.take(length)?.to_vec();
                Self::Data {
                    sequence,
                    manufacturer,
                    protocol,
                    payload: data,
                }
            }
            VECTOR_STATUS => {
                let status = EptStatusCode::try_from(cursor.read_u16()?)?;
                let text = cursor.read_text()?;
                Self::Status {
                    sequence,
                    status,
                    text,
                }
            }
            vector => return Err(RdmnetDecodeError::UnknownVector { vector }),
        };

        cursor.expect_end()?;
        Ok(message)
    }
}
