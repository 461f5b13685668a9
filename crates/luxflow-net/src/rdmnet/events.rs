//! Typed events broadcast by the RDMnet client

use std::time::Duration;

use luxflow_proto::rdmnet::RdmnetMessage;

use crate::error::{ErrorCode, ErrorDomain};

use super::capabilities::EndpointCapability;

/// Broker session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    /// No socket
    Disconnected,
    /// Socket up, no broker session
    TcpConnected,
    /// ConnectRequest sent, waiting for the reply
    Connecting,
    /// Broker accepted the connect
    Connected,
    /// ClientBindRequest sent, waiting for the reply
    Binding,
    /// Endpoint bound and negotiated
    Bound,
    /// A session step failed
    Error,
}

/// Events emitted on the client's broadcast channel
#[derive(Debug, Clone)]
pub enum RdmnetEvent {
    /// Every successfully decoded inbound message
    Message(RdmnetMessage),
    /// The broker session state changed
    BrokerState(BrokerState),
    /// A reconnect attempt is scheduled
    Reconnecting { attempt: u32, delay: Duration },
    /// A heartbeat was sent
    Heartbeat,
    /// An endpoint capability entry actually changed
    EndpointCapabilitiesUpdated(EndpointCapability),
    /// A non-fatal protocol failure (decode errors, socket faults)
    Error {
        domain: ErrorDomain,
        code: ErrorCode,
        message: String,
    },
    /// The socket closed
    Disconnected,
}
