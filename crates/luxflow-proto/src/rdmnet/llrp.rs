//! LLRP protocol messages (low-level discovery)

use luxflow_core::Uid;

use super::cursor::Cursor;
use super::error::RdmnetDecodeError;
use super::Result;

pub const VECTOR_PROBE_REQUEST: u32 = 0x01;
pub const VECTOR_PROBE_REPLY: u32 = 0x02;
pub const VECTOR_RDM_COMMAND: u32 = 0x03;
pub const VECTOR_RDM_RESPONSE: u32 = 0x04;

/// An LLRP-domain message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlrpMessage {
    ProbeRequest {
        sequence: u32,
        lower: Uid,
        upper: Uid,
    },
    ProbeReply {
        sequence: u32,
        target: Uid,
    },
    RdmCommand {
        sequence: u32,
        target: Uid,
        rdm: Vec<u8>,
    },
    RdmResponse {
        sequence: u32,
        target: Uid,
        rdm: Vec<u8>,
    },
}

impl LlrpMessage {
    /// The message's inner vector
    pub fn vector(&self) -> u32 {
        match self {
            Self::ProbeRequest { .. } => VECTOR_PROBE_REQUEST,
            Self::ProbeReply { .. } => VECTOR_PROBE_REPLY,
            Self::RdmCommand { .. } => VECTOR_RDM_COMMAND,
            Self::RdmResponse { .. } => VECTOR_RDM_RESPONSE,
        }
    }

    /// The message's sequence number
    pub fn sequence(&self) -> u32 {
        match self {
            Self::ProbeRequest { sequence, .. }
            | Self::ProbeReply { sequence, .. }
            | Self::RdmCommand { sequence, .. }
            | Self::RdmResponse { sequence, .. } => *sequence,
        }
    }

    /// Encode to the LLRP wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(20);
        out.extend_from_slice(&self.vector().to_be_bytes());
        out.extend_from_slice(&self.sequence().to_be_bytes());

        match self {
            Self::ProbeRequest { lower, upper, .. } => {
                out.extend_from_slice(&lower.to_bytes());
                out.extend_from_slice(&upper.to_bytes());
            }
            Self::ProbeReply { target, .. } => {
                out.extend_from_slice(&target.to_bytes());
            }
            Self::RdmCommand { target, rdm, .. } | Self::RdmResponse { target, rdm, .. } => {
                out.extend_from_slice(&target.to_bytes());
                out.extend_from_slice(&(rdm.len() as u16).to_be_bytes());
                out.extend_from_slice(rdm);
            }
        }
        out
    }

    /// Strictly decode from the LLRP wire layout
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);
        let vector = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;

        let message = match vector {
            VECTOR_PROBE_REQUEST => {
                let lower = Uid::from_bytes(cursor.take(6)?)?;
                let upper = Uid::from_bytes(cursor.take(6)?)?;
                Self::ProbeRequest {
                    sequence,
                    lower,
                    upper,
                }
            }
            VECTOR_PROBE_REPLY => {
                let target = Uid::from_bytes(cursor.take(6)?)?;
                Self::ProbeReply { sequence, target }
            }
            VECTOR_RDM_COMMAND | VECTOR_RDM_RESPONSE => {
                let target = Uid::from_bytes(cursor.take(6)?)?;
                let length = cursor.read_u16()? as usize;
                if cursor.remaining() < length {
                    return Err(RdmnetDecodeError::LengthOverrun {
                        claimed: length,
                        available: cursor.remaining(),
                    });
                }
                let rdm = cursor.take(length)?.to_vec();
                if vector == VECTOR_RDM_COMMAND {
                    Self::RdmCommand {
                        sequence,
                        target,
                        rdm,
                    }
                } else {
                    Self::RdmResponse {
                        sequence,
                        target,
                        rdm,
                    }
                }
            }
            vector => return Err(RdmnetDecodeError::UnknownVector { vector }),
        };

        cursor.expect_end()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_request_fixed_length() {
        let message = LlrpMessage::ProbeRequest {
            sequence: 1,
            lower: Uid::MIN,
            upper: Uid::MAX,
        };
        let wire = message.encode();
        assert_eq!(wire.len(), 20);
        assert_eq!(LlrpMessage::decode(&wire).unwrap(), message);
    }

    #[test]
    fn test_probe_reply_fixed_length() {
        let message = LlrpMessage::ProbeReply {
            sequence: 2,
            target: Uid::new(0x4c55, 7),
        };
        let wire = message.encode();
        assert_eq!(wire.len(), 14);
        assert_eq!(LlrpMessage::decode(&wire).unwrap(), message);
    }

    #[test]
    fn test_rdm_round_trip() {
        let message = LlrpMessage::RdmCommand {
            sequence: 3,
            target: Uid::new(1, 2),
            rdm: vec![1, 2, 3],
        };
        assert_eq!(LlrpMessage::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut wire = LlrpMessage::ProbeReply {
            sequence: 2,
            target: Uid::MIN,
        }
        .encode();
        wire.push(0);
        assert!(matches!(
            LlrpMessage::decode(&wire),
            Err(RdmnetDecodeError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_vector() {
        let mut wire = LlrpMessage::ProbeReply {
            sequence: 2,
            target: Uid::MIN,
        }
        .encode();
        wire[3] = 9;
        assert!(matches!(
            LlrpMessage::decode(&wire),
            Err(RdmnetDecodeError::UnknownVector { vector: 9 })
        ));
    }
}
