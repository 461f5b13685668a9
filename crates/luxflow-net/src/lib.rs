//! LuxFlow network layer
//!
//! Everything that moves LuxFlow bytes on and off the wire:
//! - [`artnet`] / [`sacn`] - asynchronous DMX senders
//! - [`artnet_rdm`] - RDM management traffic over Art-Net (OpTod*/OpRdm)
//! - [`discovery`] - E1.20 binary-split device discovery
//! - [`rdmnet`] - the reconnecting RDMnet broker client
//! - [`controller`] - the universe-owning DMX controller
//!
//! Wire layouts live in `luxflow-proto`; value types in `luxflow-core`.

/// Art-Net DMX sender
pub mod artnet;
/// Art-Net RDM client
pub mod artnet_rdm;
/// DMX controller
pub mod controller;
/// RDM binary-split discovery
pub mod discovery;
/// Error types
pub mod error;
/// RDMnet stream client
pub mod rdmnet;
/// sACN DMX sender
pub mod sacn;

pub use artnet::{ArtNetSendOptions, ArtNetSender, ArtNetSenderConfig};
pub use artnet_rdm::{ArtNetRdmClient, ArtNetRdmClientConfig};
pub use controller::{
    DmxController, DmxControllerConfig, DmxProtocol, DmxSender, SenderFactory,
};
pub use discovery::{discover_devices, DiscoveredDevice, DiscoveryOptions, RdmTransport};
pub use error::{ErrorCode, ErrorDomain, NetError, RdmnetError, Result};
pub use rdmnet::{
    AdvertisementAck, BrokerSessionOptions, BrokerState, CapabilitySource, EndpointCapability,
    RdmnetClient, RdmnetClientConfig, RdmnetEvent, TlsOptions,
};
pub use sacn::{SacnSender, SacnSenderConfig};
