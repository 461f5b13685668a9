//! RDM (E1.20) binary-split discovery
//!
//! Walks the UID space with DISC_UNIQUE_BRANCH probes over an abstract
//! transport, splitting any range that produces more than one decodable
//! response and muting devices as they are found so they stop answering
//! further probes.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use luxflow_core::Uid;
use luxflow_proto::rdm::{consts, decode_discovery_response, RdmFrame};

use crate::Result;

/// An RDM request/response transport the discovery algorithm can drive
#[async_trait]
pub trait RdmTransport {
    /// The controller UID stamped as the source of generated requests
    fn source_uid(&self) -> Uid;

    /// Probe `[low, high]` with DISC_UNIQUE_BRANCH and collect the raw
    /// response payloads that arrived in the response window
    async fn send_discovery_unique_branch(
        &mut self,
        low: Uid,
        high: Uid,
        transaction: u8,
    ) -> Result<Vec<Vec<u8>>>;

    /// Send an RDM request, returning one response when a device answers
    async fn send_request(&mut self, request: &RdmFrame) -> Result<Option<RdmFrame>>;

    /// Mute one device so it stops answering discovery probes
    ///
    /// The default implementation routes a DISC_MUTE through
    /// [`send_request`](Self::send_request); transports with a native
    /// mute can override it.
    async fn send_mute(&mut self, uid: Uid, transaction: u8) -> Result<()> {
        let request = RdmFrame::request(
            uid,
            self.source_uid(),
            transaction,
            consts::DISCOVERY_COMMAND,
            consts::PID_DISC_MUTE,
            vec![],
        );
        self.send_request(&request).await?;
        Ok(())
    }

    /// Lift a previously applied mute
    async fn send_unmute(&mut self, uid: Uid, transaction: u8) -> Result<()> {
        let request = RdmFrame::request(
            uid,
            self.source_uid(),
            transaction,
            consts::DISCOVERY_COMMAND,
            consts::PID_DISC_UN_MUTE,
            vec![],
        );
        self.send_request(&request).await?;
        Ok(())
    }
}

/// Options for [`discover_devices`]
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Lower bound of the search range (inclusive)
    pub low: Uid,
    /// Upper bound of the search range (inclusive)
    pub high: Uid,
    /// Mute each device as it is found
    pub mute_found: bool,
    /// Send DISC_UN_MUTE to every muted device after the walk
    pub unmute_at_end: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            low: Uid::MIN,
            high: Uid::MAX,
            mute_found: true,
            unmute_at_end: false,
        }
    }
}

/// One discovered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub uid: Uid,
    pub muted: bool,
}

struct DiscoveryState {
    found: Vec<DiscoveredDevice>,
    mute_found: bool,
}

impl DiscoveryState {
    fn transaction(&self) -> u8 {
        (self.found.len() % 256) as u8
    }
}

/// Run binary-split discovery over `transport`
///
/// Recursion is depth-first, lower half before upper half, so results
/// come back in ascending UID order for well-behaved responders.
pub async fn discover_devices<T>(
    transport: &mut T,
    options: DiscoveryOptions,
) -> Result<Vec<DiscoveredDevice>>
where
    T: RdmTransport + Send,
{
    let mut state = DiscoveryState {
        found: Vec::new(),
        mute_found: options.mute_found,
    };
    discover_range(transport, options.low, options.high, &mut state).await?;

    if options.unmute_at_end {
        let muted: Vec<Uid> = state
            .found
            .iter()
            .filter(|device| device.muted)
            .map(|device| device.uid)
            .collect();
        for uid in muted {
            let transaction = state.transaction();
            if let Err(error) = transport.send_unmute(uid, transaction).await {
                tracing::warn!("unmute of {} failed: {}", uid, error);
            }
        }
    }

    tracing::info!("RDM discovery finished: {} device(s)", state.found.len());
    Ok(state.found)
}

fn discover_range<'a, T>(
    transport: &'a mut T,
    low: Uid,
    high: Uid,
    state: &'a mut DiscoveryState,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>
where
    T: RdmTransport + Send,
{
    Box::pin(async move {
        let transaction = state.transaction();
        let responses = transport
            .send_discovery_unique_branch(low, high, transaction)
            .await?;

        let decoded: Vec<Uid> = responses
            .iter()
            .filter_map(|payload| decode_discovery_response(payload).ok())
            .collect();

        match decoded.as_slice() {
            [] => Ok(()),
            [uid] if uid.in_range(low, high) => {
                let uid = *uid;
                tracing::debug!("discovered {} in [{}, {}]", uid, low, high);
                let muted = if state.mute_found {
                    transport.send_mute(uid, transaction).await.is_ok()
                } else {
                    false
                };
                state.found.push(DiscoveredDevice { uid, muted });
                Ok(())
            }
            _ => {
                // Collision (or an out-of-range responder): split and
                // walk both halves, lower first.
                if low >= high {
                    return Ok(());
                }
                let mid = Uid::midpoint(low, high)?;
                discover_range(transport, low, mid, state).await?;
                discover_range(transport, Uid::from_u64(mid.to_u64() + 1), high, state).await
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxflow_proto::rdm::encode_discovery_response;

    /// A scripted transport backed by a fixed set of virtual devices
    struct MockTransport {
        devices: Vec<Uid>,
        muted: Vec<Uid>,
        unmuted: Vec<Uid>,
        probes: usize,
    }

    impl MockTransport {
        fn new(devices: Vec<Uid>) -> Self {
            Self {
                devices,
                muted: Vec::new(),
                unmuted: Vec::new(),
                probes: 0,
            }
        }
    }

    #[async_trait]
    impl RdmTransport for MockTransport {
        fn source_uid(&self) -> Uid {
            Uid::new(0x02B0, 1)
        }

        async fn send_discovery_unique_branch(
            &mut self,
            low: Uid,
            high: Uid,
            _transaction: u8,
        ) -> Result<Vec<Vec<u8>>> {
            self.probes += 1;
            Ok(self
                .devices
                .iter()
                .filter(|uid| uid.in_range(low, high) && !self.muted.contains(uid))
                .map(|uid| encode_discovery_response(*uid))
                .collect())
        }

        async fn send_request(&mut self, request: &RdmFrame) -> Result<Option<RdmFrame>> {
            match request.pid {
                consts::PID_DISC_MUTE => self.muted.push(request.destination),
                consts::PID_DISC_UN_MUTE => self.unmuted.push(request.destination),
                _ => {}
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_single_device() {
        let uid = Uid::new(0x4c55, 0x0000_1234);
        let mut transport = MockTransport::new(vec![uid]);
        let found = discover_devices(&mut transport, DiscoveryOptions::default())
            .await
            .unwrap();

        assert_eq!(found, vec![DiscoveredDevice { uid, muted: true }]);
        assert_eq!(transport.muted, vec![uid]);
    }

    #[tokio::test]
    async fn test_multiple_devices_found_in_order() {
        let uids = vec![
            Uid::new(0x0001, 10),
            Uid::new(0x4c55, 77),
            Uid::new(0xAAAA, 3),
        ];
        let mut transport = MockTransport::new(uids.clone());
        let found = discover_devices(&mut transport, DiscoveryOptions::default())
            .await
            .unwrap();

        let found_uids: Vec<Uid> = found.iter().map(|device| device.uid).collect();
        assert_eq!(found_uids, uids);
        assert!(found.iter().all(|device| device.muted));
        // The split actually recursed.
        assert!(transport.probes > 3);
    }

    #[tokio::test]
    async fn test_empty_range_stops_immediately() {
        let mut transport = MockTransport::new(vec![]);
        let found = discover_devices(&mut transport, DiscoveryOptions::default())
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(transport.probes, 1);
    }

    #[tokio::test]
    async fn test_no_mute_when_disabled() {
        let uid = Uid::new(1, 2);
        let mut transport = MockTransport::new(vec![uid]);
        // Without muting the device keeps answering, so narrow the
        // range to a single UID to let the walk terminate.
        let found = discover_devices(
            &mut transport,
            DiscoveryOptions {
                low: uid,
                high: uid,
                mute_found: false,
                unmute_at_end: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(found, vec![DiscoveredDevice { uid, muted: false }]);
        assert!(transport.muted.is_empty());
    }

    #[tokio::test]
    async fn test_unmute_at_end() {
        let uids = vec![Uid::new(1, 1), Uid::new(2, 2)];
        let mut transport = MockTransport::new(uids.clone());
        discover_devices(
            &mut transport,
            DiscoveryOptions {
                unmute_at_end: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(transport.unmuted, uids);
    }
}
