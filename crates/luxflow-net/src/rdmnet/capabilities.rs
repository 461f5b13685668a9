//! Endpoint capability cache
//!
//! Tracks what each endpoint can do and where that knowledge came
//! from: our own advertisements, a peer's advertisement relayed by the
//! broker, or the broker's bind negotiation.

use std::time::Instant;

use luxflow_proto::rdmnet::EndpointRole;

/// Where a capability entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilitySource {
    LocalAdvertisement,
    RemoteAdvertisement,
    BrokerNegotiation,
}

/// One endpoint's cached capabilities
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCapability {
    pub endpoint_id: u16,
    pub role: Option<EndpointRole>,
    /// Sorted, deduplicated profile ids
    pub profiles: Vec<u16>,
    pub source: CapabilitySource,
    pub updated_at: Instant,
}

/// Normalize a profile list: sorted and deduplicated
pub fn normalize_profiles(mut profiles: Vec<u16>) -> Vec<u16> {
    profiles.sort_unstable();
    profiles.dedup();
    profiles
}

impl EndpointCapability {
    /// Whether an update to these fields would be an observable change
    pub fn differs_from(&self, role: Option<EndpointRole>, profiles: &[u16], source: CapabilitySource) -> bool {
        self.role != role || self.profiles != profiles || self.source != source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_profiles() {
        assert_eq!(
            normalize_profiles(vec![0x0300, 0x0100, 0x0300, 0x0200]),
            vec![0x0100, 0x0200, 0x0300]
        );
        assert!(normalize_profiles(vec![]).is_empty());
    }

    #[test]
    fn test_differs_from() {
        let entry = EndpointCapability {
            endpoint_id: 1,
            role: Some(EndpointRole::Controller),
            profiles: vec![0x0100],
            source: CapabilitySource::BrokerNegotiation,
            updated_at: Instant::now(),
        };

        assert!(!entry.differs_from(
            Some(EndpointRole::Controller),
            &[0x0100],
            CapabilitySource::BrokerNegotiation
        ));
        assert!(entry.differs_from(
            Some(EndpointRole::Responder),
            &[0x0100],
            CapabilitySource::BrokerNegotiation
        ));
        assert!(entry.differs_from(
            Some(EndpointRole::Controller),
            &[0x0100, 0x0200],
            CapabilitySource::BrokerNegotiation
        ));
        assert!(entry.differs_from(
            Some(EndpointRole::Controller),
            &[0x0100],
            CapabilitySource::RemoteAdvertisement
        ));
    }
}
