//! Broker protocol messages
//!
//! Every message opens with a 32-bit vector and a 32-bit sequence.
//! Decoding is strict: unknown vectors, non-zero reserved bytes,
//! out-of-range enum values, overrunning length fields and trailing
//! bytes all fail.

use super::cursor::{write_text, Cursor};
use super::error::RdmnetDecodeError;
use super::rpt::EndpointRole;
use super::Result;

pub const VECTOR_CONNECT_REQUEST: u32 = 0x01;
pub const VECTOR_CONNECT_REPLY: u32 = 0x02;
pub const VECTOR_CLIENT_BIND_REQUEST: u32 = 0x03;
pub const VECTOR_CLIENT_BIND_REPLY: u32 = 0x04;
pub const VECTOR_HEARTBEAT: u32 = 0x05;
pub const VECTOR_DISCONNECT: u32 = 0x06;
pub const VECTOR_CLIENT_LIST_REQUEST: u32 = 0x07;
pub const VECTOR_CLIENT_LIST_REPLY: u32 = 0x08;
pub const VECTOR_ENDPOINT_LIST_REQUEST: u32 = 0x09;
pub const VECTOR_ENDPOINT_LIST_REPLY: u32 = 0x0A;

/// The role a client takes towards the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientRole {
    Controller = 1,
    Device = 2,
    Monitor = 3,
}

impl TryFrom<u8> for ClientRole {
    type Error = RdmnetDecodeError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Controller),
            2 => Ok(Self::Device),
            3 => Ok(Self::Monitor),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "client role",
                value: value as u32,
            }),
        }
    }
}

/// Status carried by broker replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BrokerStatusCode {
    Ok = 0,
    Rejected = 1,
    InvalidScope = 2,
    Unauthorized = 3,
    AlreadyConnected = 4,
    InvalidRequest = 5,
}

impl TryFrom<u16> for BrokerStatusCode {
    type Error = RdmnetDecodeError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Ok),
            1 => Ok(Self::Rejected),
            2 => Ok(Self::InvalidScope),
            3 => Ok(Self::Unauthorized),
            4 => Ok(Self::AlreadyConnected),
            5 => Ok(Self::InvalidRequest),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "broker status code",
                value: value as u32,
            }),
        }
    }
}

/// Reason carried by a Disconnect message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DisconnectReason {
    Shutdown = 0,
    CapacityExhausted = 1,
    UserReconfigure = 2,
    SoftwareFault = 3,
}

impl TryFrom<u16> for DisconnectReason {
    type Error = RdmnetDecodeError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Shutdown),
            1 => Ok(Self::CapacityExhausted),
            2 => Ok(Self::UserReconfigure),
            3 => Ok(Self::SoftwareFault),
            _ => Err(RdmnetDecodeError::InvalidEnumValue {
                field: "disconnect reason",
                value: value as u32,
            }),
        }
    }
}

/// A broker-domain message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerMessage {
    ConnectRequest {
        sequence: u32,
        role: ClientRole,
        scope: String,
    },
    ConnectReply {
        sequence: u32,
        status: BrokerStatusCode,
        client_id: u32,
        text: String,
    },
    ClientBindRequest {
        sequence: u32,
        endpoint_id: u16,
        requested_role: EndpointRole,
        profiles: Vec<u16>,
    },
    ClientBindReply {
        sequence: u32,
        status: BrokerStatusCode,
        endpoint_id: u16,
        negotiated_role: EndpointRole,
        negotiated_profile: u16,
        text: String,
    },
    Heartbeat {
        sequence: u32,
    },
    Disconnect {
        sequence: u32,
        reason: DisconnectReason,
        text: String,
    },
    ClientListRequest {
        sequence: u32,
    },
    ClientListReply {
        sequence: u32,
        status: BrokerStatusCode,
        client_ids: Vec<u32>,
    },
    EndpointListRequest {
        sequence: u32,
    },
    EndpointListReply {
        sequence: u32,
        status: BrokerStatusCode,
        endpoints: Vec<u16>,
    },
}

impl BrokerMessage {
    /// The message's inner vector
    pub fn vector(&self) -> u32 {
        match self {
            Self::ConnectRequest { .. } => VECTOR_CONNECT_REQUEST,
            Self::ConnectReply { .. } => VECTOR_CONNECT_REPLY,
            Self::ClientBindRequest { .. } => VECTOR_CLIENT_BIND_REQUEST,
            Self::ClientBindReply { .. } => VECTOR_CLIENT_BIND_REPLY,
            Self::Heartbeat { .. } => VECTOR_HEARTBEAT,
            Self::Disconnect { .. } => VECTOR_DISCONNECT,
            Self::ClientListRequest { .. } => VECTOR_CLIENT_LIST_REQUEST,
            Self::ClientListReply { .. } => VECTOR_CLIENT_LIST_REPLY,
            Self::EndpointListRequest { .. } => VECTOR_ENDPOINT_LIST_REQUEST,
            Self::EndpointListReply { .. } => VECTOR_ENDPOINT_LIST_REPLY,
        }
    }

    /// The message's sequence number
    pub fn sequence(&self) -> u32 {
        match self {
            Self::ConnectRequest { sequence, .. }
            | Self::ConnectReply { sequence, .. }
            | Self::ClientBindRequest { sequence, .. }
            | Self::ClientBindReply { sequence, .. }
            | Self::Heartbeat { sequence }
            | Self::Disconnect { sequence, .. }
            | Self::ClientListRequest { sequence }
            | Self::ClientListReply { sequence, .. }
            | Self::EndpointListRequest { sequence }
            | Self::EndpointListReply { sequence, .. } => *sequence,
        }
    }

    /// Encode to the broker wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&self.vector().to_be_bytes());
        out.extend_from_slice(&self.sequence().to_be_bytes());

        match self {
            Self::ConnectRequest { role, scope, .. } => {
                out.push(*role as u8);
                out.push(0); // reserved
                write_text(&mut out, scope);
            }
            Self::ConnectReply {
                status,
                client_id,
                text,
                ..
            } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                out.extend_from_slice(&client_id.to_be_bytes());
                out.extend_from_slice(text.as_bytes());
            }
            Self::ClientBindRequest {
                endpoint_id,
                requested_role,
                profiles,
                ..
            } => {
                out.extend_from_slice(&endpoint_id.to_be_bytes());
                out.push(*requested_role as u8);
                out.push(profiles.len() as u8);
                for profile in profiles {
                    out.extend_from_slice(&profile.to_be_bytes());
                }
            }
            Self::ClientBindReply {
                status,
                endpoint_id,
                negotiated_role,
                negotiated_profile,
                text,
                ..
            } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                out.extend_from_slice(&endpoint_id.to_be_bytes());
                out.push(*negotiated_role as u8);
                out.push(0); // reserved
                out.extend_from_slice(&negotiated_profile.to_be_bytes());
                write_text(&mut out, text);
            }
            Self::Heartbeat { .. }
            | Self::ClientListRequest { .. }
            | Self::EndpointListRequest { .. } => {}
            Self::Disconnect { reason, text, .. } => {
                out.extend_from_slice(&(*reason as u16).to_be_bytes());
                write_text(&mut out, text);
            }
            Self::ClientListReply {
                status, client_ids, ..
            } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                out.push(client_ids.len() as u8);
                for id in client_ids {
                    out.extend_from_slice(&id.to_be_bytes());
                }
            }
            Self::EndpointListReply {
                status, endpoints, ..
            } => {
                out.extend_from_slice(&(*status as u16).to_be_bytes());
                out.push(endpoints.len() as u8);
                for endpoint in endpoints {
                    out.extend_from_slice(&endpoint.to_be_bytes());
                }
            }
        }
        out
    }

    /// Strictly decode from the broker wire layout
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);
        let vector = cursor.read_u32()?;
        let sequence = cursor.read_u32()?;

        let message = match vector {
            VECTOR_CONNECT_REQUEST => {
                let role = ClientRole::try_from(cursor.read_u8()?)?;
                cursor.read_reserved()?;
                let scope = cursor.read_text()?;
                Self::ConnectRequest {
                    sequence,
                    role,
                    scope,
                }
            }
            VECTOR_CONNECT_REPLY => {
                let status = BrokerStatusCode::try_from(cursor.read_u16()?)?;
                let client_id = cursor.read_u32()?;
                let text = cursor.read_text_to_end()?;
                Self::ConnectReply {
                    sequence,
                    status,
                    client_id,
                    text,
                }
            }
            VECTOR_CLIENT_BIND_REQUEST => {
                let endpoint_id = cursor.read_u16()?;
                let requested_role = EndpointRole::try_from(cursor.read_u8()?)?;
                let count = cursor.read_u8()? as usize;
                let mut profiles = Vec::with_capacity(count);
                for _ in 0..count {
                    profiles.push(cursor.read_u16()?);
                }
                Self::ClientBindRequest {
                    sequence,
                    endpoint_id,
                    requested_role,
                    profiles,
                }
            }
            VECTOR_CLIENT_BIND_REPLY => {
                let status = BrokerStatusCode::try_from(cursor.read_u16()?)?;
                let endpoint_id = cursor.read_u16()?;
                let negotiated_role = EndpointRole::try_from(cursor.read_u8()?)?;
                cursor.read_reserved()?;
                let negotiated_profile = cursor.read_u16()?;
                let text = cursor.read_text()?;
                Self::ClientBindReply {
                    sequence,
                    status,
                    endpoint_id,
                    negotiated_role,
                    negotiated_profile,
                    text,
                }
            }
            VECTOR_HEARTBEAT => Self::Heartbeat { sequence },
            VECTOR_DISCONNECT => {
                let reason = DisconnectReason::try_from(cursor.read_u16()?)?;
                let text = cursor.read_text()?;
                Self::Disconnect {
                    sequence,
                    reason,
                    text,
                }
            }
            VECTOR_CLIENT_LIST_REQUEST => Self::ClientListRequest { sequence },
            VECTOR_CLIENT_LIST_REPLY => {
                let status = BrokerStatusCode::try_from(cursor.read_u16()?)?;
                let count = cursor.read_u8()? as usize;
                let mut client_ids = Vec::with_capacity(count);
                for _ in 0..count {
                    client_ids.push(cursor.read_u32()?);
                }
                Self::ClientListReply {
                    sequence,
                    status,
                    client_ids,
                }
            }
            VECTOR_ENDPOINT_LIST_REQUEST => Self::EndpointListRequest { sequence },
            VECTOR_ENDPOINT_LIST_REPLY => {
                let status = BrokerStatusCode::try_from(cursor.read_u16()?)?;
                let count = cursor.read_u8()? as usize;
                let mut endpoints = Vec::with_capacity(count);
                for _ in 0..count {
                    endpoints.push(cursor.read_u16()?);
                }
                Self::EndpointListReply {
                    sequence,
                    status,
                    endpoints,
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

    fn round_trip(message: BrokerMessage) {
        let decoded = BrokerMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_connect_request_round_trip() {
        round_trip(BrokerMessage::ConnectRequest {
            sequence: 1,
            role: ClientRole::Controller,
            scope: "default".to_string(),
        });
    }

    #[test]
    fn test_connect_request_layout() {
        let wire = BrokerMessage::ConnectRequest {
            sequence: 0x0102_0304,
            role: ClientRole::Device,
            scope: "live".to_string(),
        }
        .encode();
        assert_eq!(&wire[..4], &[0, 0, 0, 1]);
        assert_eq!(&wire[4..8], &[1, 2, 3, 4]);
        assert_eq!(wire[8], 2);
        assert_eq!(wire[9], 0);
        assert_eq!(&wire[10..12], &[0, 4]);
        assert_eq!(&wire[12..], b"live");
    }

    #[test]
    fn test_connect_reply_round_trip() {
        round_trip(BrokerMessage::ConnectReply {
            sequence: 9,
            status: BrokerStatusCode::Ok,
            client_id: 99,
            text: "welcome".to_string(),
        });
    }

    #[test]
    fn test_client_bind_round_trip() {
        round_trip(BrokerMessage::ClientBindRequest {
            sequence: 2,
            endpoint_id: 1,
            requested_role: EndpointRole::Controller,
            profiles: vec![0x0100, 0x0200],
        });
        round_trip(BrokerMessage::ClientBindReply {
            sequence: 2,
            status: BrokerStatusCode::Ok,
            endpoint_id: 1,
            negotiated_role: EndpointRole::Controller,
            negotiated_profile: 0x0100,
            text: String::new(),
        });
    }

    #[test]
    fn test_fixed_length_messages() {
        let wire = BrokerMessage::Heartbeat { sequence: 42 }.encode();
        assert_eq!(wire.len(), 8);
        round_trip(BrokerMessage::Heartbeat { sequence: 42 });
        round_trip(BrokerMessage::ClientListRequest { sequence: 43 });
        round_trip(BrokerMessage::EndpointListRequest { sequence: 44 });
    }

    #[test]
    fn test_list_replies_round_trip() {
        round_trip(BrokerMessage::ClientListReply {
            sequence: 5,
            status: BrokerStatusCode::Ok,
            client_ids: vec![1, 2, 99],
        });
        round_trip(BrokerMessage::EndpointListReply {
            sequence: 6,
            status: BrokerStatusCode::Ok,
            endpoints: vec![0, 1],
        });
    }

    #[test]
    fn test_disconnect_round_trip() {
        round_trip(BrokerMessage::Disconnect {
            sequence: 7,
            reason: DisconnectReason::Shutdown,
            text: "bye".to_string(),
        });
    }

    #[test]
    fn test_decode_rejects_unknown_vector() {
        let mut wire = BrokerMessage::Heartbeat { sequence: 1 }.encode();
        wire[3] = 0x0B;
        assert!(matches!(
            BrokerMessage::decode(&wire),
            Err(RdmnetDecodeError::UnknownVector { vector: 0x0B })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut wire = BrokerMessage::Heartbeat { sequence: 1 }.encode();
        wire.push(0);
        assert!(matches!(
            BrokerMessage::decode(&wire),
            Err(RdmnetDecodeError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_reserved_byte() {
        let mut wire = BrokerMessage::ConnectRequest {
            sequence: 1,
            role: ClientRole::Controller,
            scope: "x".to_string(),
        }
        .encode();
        wire[9] = 0xFF;
        assert!(matches!(
            BrokerMessage::decode(&wire),
            Err(RdmnetDecodeError::ReservedNonZero { offset: 9, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_role() {
        let mut wire = BrokerMessage::ConnectRequest {
            sequence: 1,
            role: ClientRole::Controller,
            scope: "x".to_string(),
        }
        .encode();
        wire[8] = 0;
        assert!(matches!(
            BrokerMessage::decode(&wire),
            Err(RdmnetDecodeError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_scope_overrun() {
        let mut wire = BrokerMessage::ConnectRequest {
            sequence: 1,
            role: ClientRole::Controller,
            scope: "abc".to_string(),
        }
        .encode();
        wire[11] = 200; // scope length beyond the buffer
        assert!(matches!(
            BrokerMessage::decode(&wire),
            Err(RdmnetDecodeError::LengthOverrun { .. })
        ));
    }
}
