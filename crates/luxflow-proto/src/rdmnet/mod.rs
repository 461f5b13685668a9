//! RDMnet (E1.33) message codecs
//!
//! Four message domains travel over the ACN root layer, selected by
//! the root vector: Broker (session management), RPT (RDM transport),
//! EPT (extensible payloads) and LLRP (low-level discovery). Each
//! domain dispatches again on an inner 32-bit vector.
//!
//! The root vectors follow the E1.33 registry. The inner vectors are
//! this codebase's profile (see the per-module constants); they are
//! exact wire values, not a claim of compatibility with arbitrary
//! third-party brokers.

pub mod broker;
mod cursor;
pub mod ept;
pub mod error;
pub mod llrp;
pub mod rpt;

pub use broker::{BrokerMessage, BrokerStatusCode, ClientRole, DisconnectReason};
pub use ept::{EptMessage, EptStatusCode};
pub use error::{RdmnetDecodeError, Result};
pub use llrp::LlrpMessage;
pub use rpt::{EndpointRole, RptMessage, RptStatusCode};

/// Root-layer vector for the RPT domain
pub const VECTOR_ROOT_RPT: u32 = 0x0000_0005;
/// Root-layer vector for the Broker domain
pub const VECTOR_ROOT_BROKER: u32 = 0x0000_0009;
/// Root-layer vector for the LLRP domain
pub const VECTOR_ROOT_LLRP: u32 = 0x0000_000A;
/// Root-layer vector for the EPT domain
pub const VECTOR_ROOT_EPT: u32 = 0x0000_000B;

/// A decoded RDMnet message of any domain
#[derive(Debug, Clone, PartialEq)]
pub enum RdmnetMessage {
    Broker(BrokerMessage),
    Rpt(RptMessage),
    Ept(EptMessage),
    Llrp(LlrpMessage),
}

impl RdmnetMessage {
    /// Decode a root-layer payload by its root vector
    ///
    /// Unknown root vectors fail, like every other unknown vector.
    pub fn decode(root_vector: u32, payload: &[u8]) -> Result<Self> {
        match root_vector {
            VECTOR_ROOT_BROKER => Ok(Self::Broker(BrokerMessage::decode(payload)?)),
            VECTOR_ROOT_RPT => Ok(Self::Rpt(RptMessage::decode(payload)?)),
            VECTOR_ROOT_EPT => Ok(Self::Ept(EptMessage::decode(payload)?)),
            VECTOR_ROOT_LLRP => Ok(Self::Llrp(LlrpMessage::decode(payload)?)),
            vector => Err(RdmnetDecodeError::UnknownVector { vector }),
        }
    }

    /// The root-layer vector this message travels under
    pub fn root_vector(&self) -> u32 {
        match self {
            Self::Broker(_) => VECTOR_ROOT_BROKER,
            Self::Rpt(_) => VECTOR_ROOT_RPT,
            Self::Ept(_) => VECTOR_ROOT_EPT,
            Self::Llrp(_) => VECTOR_ROOT_LLRP,
        }
    }

    /// The inner sequence number
    pub fn sequence(&self) -> u32 {
        match self {
            Self::Broker(message) => message.sequence(),
            Self::Rpt(message) => message.sequence(),
            Self::Ept(message) => message.sequence(),
            Self::Llrp(message) => message.sequence(),
        }
    }
}
