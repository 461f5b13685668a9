//! RPT protocol messages (RDM transport over RDMnet)
//!
//! RdmCommand/RdmResponse carry a whole E1.20 frame; the outer
//! destination/source UIDs must mirror the embedded frame's, and the
//! decoder re-runs the embedded checksum validation.

use luxflow_core::Uid;

use crate::rdm::RdmFrame;

use super::cursor::{write_text, Cursor};
use super::error::RdmnetDecodeError;
use super::Result;

pub const VECTOR_STATUS: u32 = 0x01;
pub const VECTOR_RDM_COMMAND: u32 = 0x02;
pub const VECTOR_RDM_RESPONSE: u32 = 0x03;
pub const VECTOR_ENDPOINT_ADVERTISEMENT: u32 = 0x04;
pub const VECTOR_ENDPOINT_ADVERTISEMENT_ACK: u32 = 0x05;

/// Status carried by an RPT Status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RptStatusCode {
    Ok = 0,
    UnknownRdmUid = 1,
    RdmTimeout = 2,
    RdmInvalidResponse = 3,
    UnknownEndpoint = 4,
}

impl TryFrom<u16> for RptStatusCode {
    type Error = RdmnetDecodeError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::UnknownRdmUid),
            2 => Ok(Self::RdmTimeout),
            3 => Ok(Self::RdmInvalidResponse),
            4 => Ok(Self::UnknownEndpoint),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "rpt status code",
                value: value as u32,
            }),
        }
    }
}

/// The role an endpoint advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EndpointRole {
    Controller = 1,
    Responder = 2,
    Proxy = 3,
}

impl TryFrom<u8> for EndpointRole {
    type Error = RdmnetDecodeError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Controller),
            2 => Ok(Self::Responder),
            3 => Ok(Self::Proxy),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "endpoint role",
                value: value as u32,
            }),
        }
    }
}

/// An RPT-domain message
#[derive(Debug, Clone, PartialEq)]
pub enum RptMessage {
    Status {
        sequence: u32,
        status: RptStatusCode,
        text: String,
    },
    RdmCommand {
        sequence: u32,
        endpoint_id: u16,
        frame: RdmFrame,
    },
    RdmResponse {
        sequence: u32,
        endpoint_id: u16,
        frame: RdmFrame,
    },
    EndpointAdvertisement {
        sequence: u32,
        endpoint_id: u16,
        role: EndpointRole,
        profiles: Vec<u16>,
    },
    EndpointAdvertisementAck {
        sequence: u32,
        endpoint_id: u16,
        accepted: bool,
        status: RptStatusCode,
    },
}

impl RptMessage {
    /// The message's inner vector
    pub fn vector(&self) -> u32 {
        match self {
            Self::Status { .. } => VECTOR_STATUS,
            Self::RdmCommand { .. } => VECTOR_RDM_COMMAND,
            Self::RdmResponse { .. } => VECTOR_RDM_RESPONSE,
            Self::EndpointAdvertisement { .. } => VECTOR_ENDPOINT_ADVERTISEMENT,
            Self::EndpointAdvertisementAck { .. } => VECTOR_ENDPOINT_ADVERTISEMENT_ACK,
        }
    }

    /// The message's sequence number
    pub fn sequence(&self) -> u32 {
        match self {
            Self::Status { sequence, .. }
            | Self::RdmCommand { sequence, .. }
            | Self::RdmResponse { sequence, .. }
            | Self::EndpointAdvertisement { sequence, .. }
            | Self::EndpointAdvertisementAck { sequence, .. } => *sequence,
        }
    }

    /// Encode to the RPT wire layout
    ///
    /// Fails only when an embedded RDM frame cannot be encoded (PDL
    /// out of range).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&self.vector().to_be_bytes());
        out.extend_from_slice(&self.sequence().to_be_bytes());

        match self {
            Self::Status { status, text, .. } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                write_text(&mut out, text);
            }
            Self::RdmCommand {
                endpoint_id, frame, ..
            }
            | Self::RdmResponse {
                endpoint_id, frame, ..
            } => {
                let rdm = frame.encode()?;
                out.extend_from_slice(&endpoint_id.to_be_bytes());
                out.extend_from_slice(&(rdm.len() as u16).to_be_bytes());
                out.extend_from_slice(&frame.destination.to_bytes());
                out.extend_from_slice(&frame.source.to_bytes());
                out.extend_from_slice(&rdm);
            }
            Self::EndpointAdvertisement {
                endpoint_id,
                role,
                profiles,
                ..
            } => {
                out.extend_from_slice(&endpoint_id.to_be_bytes());
                out.push(*role as u8);
                out.push(profiles.len() as u8);
                for profile in profiles {
                    out.extend_from_slice(&profile.to_be_bytes());
                }
            }
            Self::EndpointAdvertisementAck {
                endpoint_id,
                accepted,
                status,
                ..
            } => {
                out.extend_from_slice(&endpoint_id.to_be_bytes());
                out.push(u8::from(*accepted));
                out.extend_from_slice(&(*status as u16).to_be_bytes());
            }
        }
        Ok(out)
    }

    /// Strictly decode from the RPT wire layout
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);
        let vector = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;

        let message = match vector {
            VECTOR_STATUS => {
                let status = RptStatusCode::try_from(cursor.read_u16()?)?;
                let text = cursor.read_text()?;
                Self::Status {
                    sequence,
                    status,
                    text,
                }
            }
            VECTOR_RDM_COMMAND | VECTOR_RDM_RESPONSE => {
                let endpoint_id = cursor.read_u16()?;
                let rdm_length = cursor.read_u16()? as usize;
                let outer_destination = Uid::from_bytes(cursor.take(6)?)?;
                let outer_source = Uid::from_bytes(cursor.take(6)?)?;
                if cursor.remaining() < rdm_length {
                    return Err(RdmnetDecodeError::LengthOverrun {
                        claimed: rdm_length,
                        available: cursor.remaining(),
                    });
                }
                let frame = RdmFrame::decode(cursor.take(rdm_length)?)?;
                if outer_destination != frame.destination {
                    return Err(RdmnetDecodeError::UidMismatch {
                        field: "destination",
                        outer: outer_destination.to_string(),
                        embedded: frame.destination.to_string(),
                    });
                }
                if outer_source != frame.source {
                    return Err(RdmnetDecodeError::UidMismatch {
                        field: "source",
                        outer: outer_source.to_string(),
                        embedded: frame.source.to_string(),
                    });
                }
                if vector == VECTOR_RDM_COMMAND {
                    Self::RdmCommand {
                        sequence,
                        endpoint_id,
                        frame,
                    }
                } else {
                    Self::RdmResponse {
                        sequence,
                        endpoint_id,
                        frame,
                    }
                }
            }
            VECTOR_ENDPOINT_ADVERTISEMENT => {
                let endpoint_id = cursor.read_u16()?;
                let role = EndpointRole::try_from(cursor.read_u8()?)?;
                let count = cursor.read_u8()? as usize;
                let mut profiles = Vec::with_capacity(count);
                for _ in 0..count {
                    profiles.push(cursor.read_u16()?);
                }
                Self::EndpointAdvertisement {
                    sequence,
                    endpoint_id,
                    role,
                    profiles,
                }
            }
            VECTOR_ENDPOINT_ADVERTISEMENT_ACK => {
                let endpoint_id = cursor.read_u16()?;
                let accepted = match cursor.read_u8()? {
                    0 => false,
                    1 => true,
                    value => {
                        return Err(RdmnetDecodeError::InvalidEnumValue {
                            field: "advertisement ack accepted",
                            value: value as u32,
                        })
                    }
                };
                let status = RptStatusCode::try_from(cursor.read_u16()?)?;
                Self::EndpointAdvertisementAck {
                    sequence,
                    endpoint_id,
                    accepted,
                    status,
                }
            }
            vector => return Err(RdmnetDecodeError::UnknownVector { vector }),
        };

        cursor.expect_end()?;
        Ok(message)
    }
}
