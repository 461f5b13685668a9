//! RDMnet stream client
//!
//! A reconnecting, optionally TLS-secured TCP client for an RDMnet
//! broker: ACN root-layer reframing, typed message dispatch, a
//! request/response waiter table, the broker session state machine,
//! endpoint capability tracking, heartbeats and LLRP discovery.

pub mod capabilities;
pub mod client;
pub mod config;
pub mod events;
mod transport;
mod waiters;

pub use capabilities::{normalize_profiles, CapabilitySource, EndpointCapability};
pub use client::{AdvertisementAck, BrokerSessionOptions, RdmnetClient};
pub use config::{AuthContext, PostConnectAuth, RdmnetClientConfig, TlsOptions};
pub use events::{BrokerState, RdmnetEvent};
