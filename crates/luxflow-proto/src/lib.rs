//! LuxFlow wire codecs
//!
//! Bit-exact builders and parsers for the protocols LuxFlow speaks:
//!
//! - [`artnet`] - Art-Net 4 packets (DMX, sync, poll, diagnostics,
//!   time code, trigger, and the OpTod*/OpRdm RDM transport)
//! - [`sacn`] - E1.31 streaming DMX data packets
//! - [`acn`] - the ACN root layer framing RDMnet's TCP stream
//! - [`rdmnet`] - Broker, RPT, EPT and LLRP message codecs
//! - [`rdm`] - E1.20 RDM frames and discovery responses
//!
//! Everything here is pure: bytes in, typed values out, no sockets.
//! The senders and clients live in `luxflow-net`.

pub mod acn;
pub mod artnet;
pub mod rdm;
pub mod rdmnet;
pub mod sacn;
