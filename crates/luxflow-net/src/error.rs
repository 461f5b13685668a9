//! Error types for senders, discovery and the RDMnet client
//!
//! Every RDMnet-facing failure carries a domain and a stable code so
//! callers can match on behaviour instead of message strings. Sender
//! and controller failures wrap the codec errors they surface.

use std::fmt;

use thiserror::Error;

use luxflow_proto::rdmnet::BrokerStatusCode;

/// Where an error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Broker,
    Rpt,
    Ept,
    Llrp,
    Transport,
    Timeout,
    Protocol,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Broker => "broker",
            Self::Rpt => "rpt",
            Self::Ept => "ept",
            Self::Llrp => "llrp",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BrokerDecodeError,
    RptDecodeError,
    EptDecodeError,
    LlrpDecodeError,
    StreamFramingError,
    BrokerRejected,
    BrokerInvalidScope,
    BrokerUnauthorized,
    BrokerAlreadyConnected,
    BrokerInvalidRequest,
    NegotiationRoleMismatch,
    NegotiationProfileMismatch,
    ResponseTimeout,
    ProtocolError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BrokerDecodeError => "BROKER_DECODE_ERROR",
            Self::RptDecodeError => "RPT_DECODE_ERROR",
            Self::EptDecodeError => "EPT_DECODE_ERROR",
            Self::LlrpDecodeError => "LLRP_DECODE_ERROR",
            Self::StreamFramingError => "STREAM_FRAMING_ERROR",
            Self::BrokerRejected => "BROKER_REJECTED",
            Self::BrokerInvalidScope => "BROKER_INVALID_SCOPE",
            Self::BrokerUnauthorized => "BROKER_UNAUTHORIZED",
            Self::BrokerAlreadyConnected => "BROKER_ALREADY_CONNECTED",
            Self::BrokerInvalidRequest => "BROKER_INVALID_REQUEST",
            Self::NegotiationRoleMismatch => "NEGOTIATION_ROLE_MISMATCH",
            Self::NegotiationProfileMismatch => "NEGOTIATION_PROFILE_MISMATCH",
            Self::ResponseTimeout => "RESPONSE_TIMEOUT",
            Self::ProtocolError => "PROTOCOL_ERROR",
        };
        f.write_str(name)
    }
}

/// An RDMnet client error: domain, stable code, human-readable message
/// and (for broker status failures) the numeric status
#[derive(Error, Debug, Clone)]
#[error("{domain}/{code}: {message}")]
pub struct RdmnetError {
    pub domain: ErrorDomain,
    pub code: ErrorCode,
    pub message: String,
    pub status: Option<BrokerStatusCode>,
}

impl RdmnetError {
    pub fn new(domain: ErrorDomain, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            status: None,
        }
    }

    /// A broker status failure, preserving the numeric status
    pub fn broker_status(status: BrokerStatusCode, text: &str) -> Self {
        let code = match status {
            BrokerStatusCode::Ok | BrokerStatusCode::Rejected => ErrorCode::BrokerRejected,
            BrokerStatusCode::InvalidScope => ErrorCode::BrokerInvalidScope,
            BrokerStatusCode::Unauthorized => ErrorCode::BrokerUnauthorized,
            BrokerStatusCode::AlreadyConnected => ErrorCode::BrokerAlreadyConnected,
            BrokerStatusCode::InvalidRequest => ErrorCode::BrokerInvalidRequest,
        };
        Self {
            domain: ErrorDomain::Broker,
            code,
            message: format!("broker refused request ({status:?}): {text}"),
            status: Some(status),
        }
    }

    pub fn timeout() -> Self {
        Self::new(
            ErrorDomain::Timeout,
            ErrorCode::ResponseTimeout,
            "no response before the deadline",
        )
    }

    pub fn socket_closed() -> Self {
        Self::new(
            ErrorDomain::Protocol,
            ErrorCode::ProtocolError,
            "socket closed",
        )
    }
}

impl From<std::io::Error> for RdmnetError {
    fn from(error: std::io::Error) -> Self {
        Self::new(
            ErrorDomain::Protocol,
            ErrorCode::ProtocolError,
            error.to_string(),
        )
    }
}

/// Errors from senders, discovery and the controller
#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Art-Net error: {0}")]
    ArtNet(#[from] luxflow_proto::artnet::ArtNetError),

    #[error("sACN error: {0}")]
    Sacn(#[from] luxflow_proto::sacn::SacnError),

    #[error("RDM error: {0}")]
    Rdm(#[from] luxflow_proto::rdm::RdmError),

    #[error("DMX error: {0}")]
    Core(#[from] luxflow_core::CoreError),

    #[error(transparent)]
    Rdmnet(#[from] RdmnetError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetError>;
