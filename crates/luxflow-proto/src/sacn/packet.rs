//! E1.31 data packet builder and parser

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use uuid::Uuid;

use luxflow_core::{UNIVERSE_MAX, UNIVERSE_TEST};

use super::error::SacnError;
use super::layout;
use super::Result;

/// Validate an sACN universe (1-63999, plus the test universe 64214)
pub fn validate_sacn_universe(universe: u16) -> Result<u16> {
    if (1..=UNIVERSE_MAX).contains(&universe) || universe == UNIVERSE_TEST {
        Ok(universe)
    } else {
        Err(SacnError::InvalidUniverse { universe })
    }
}

/// The multicast group for a universe: `239.255.<high byte>.<low byte>`
pub fn multicast_group(universe: u16) -> Result<Ipv4Addr> {
    let universe = validate_sacn_universe(universe)?;
    Ok(Ipv4Addr::new(
        239,
        255,
        (universe >> 8) as u8,
        (universe & 0xFF) as u8,
    ))
}

/// DMX payload for a packet build
#[derive(Debug, Clone)]
pub enum SacnPayload {
    /// Sparse channel map (1-512). Values are percentages (0-100) by
    /// default, or raw 0-255 levels when `use_raw_dmx_values` is set.
    Channels(BTreeMap<u16, f64>),
    /// A raw DMX frame; the first 512 bytes are used as-is
    Raw(Vec<u8>),
}

/// Options for building an E1.31 data packet
#[derive(Debug, Clone)]
pub struct SacnPacketOptions {
    pub universe: u16,
    pub payload: SacnPayload,
    pub sequence: u8,
    /// ASCII source name, truncated to 63 bytes plus terminating null
    pub source_name: String,
    pub priority: u8,
    /// Component identifier; a random v4 UUID when omitted
    pub cid: Option<[u8; 16]>,
    pub options: u8,
    pub sync_universe: u16,
    /// Treat channel-map values as raw 0-255 levels instead of percentages
    pub use_raw_dmx_values: bool,
}

impl Default for SacnPacketOptions {
    fn default() -> Self {
        Self {
            universe: 1,
            payload: SacnPayload::Raw(Vec::new()),
            sequence: 0,
            source_name: String::new(),
            priority: layout::DEFAULT_PRIORITY,
            cid: None,
            options: 0,
            sync_universe: 0,
            use_raw_dmx_values: false,
        }
    }
}

/// A parsed or built E1.31 data packet
#[derive(Debug, Clone)]
pub struct SacnPacket {
    pub universe: u16,
    pub sequence: u8,
    pub priority: u8,
    pub options: u8,
    pub sync_universe: u16,
    pub source_name: String,
    pub cid: [u8; 16],
    pub slots: [u8; layout::DMX_SLOTS],
}

impl SacnPacket {
    /// Build a packet from options, resolving the payload to 512 slots
    pub fn build(options: &SacnPacketOptions) -> Result<Self> {
        let universe = validate_sacn_universe(options.universe)?;
        let mut slots = [0u8; layout::DMX_SLOTS];

        match &options.payload {
            SacnPayload::Raw(data) => {
                let len = data.len().min(layout::DMX_SLOTS);
                slots[..len].copy_from_slice(&data[..len]);
            }
            SacnPayload::Channels(channels) => {
                for (&channel, &value) in channels {
                    if !(1..=layout::DMX_SLOTS as u16).contains(&channel) {
                        return Err(SacnError::InvalidChannel { channel });
                    }
                    slots[channel as usize - 1] = if options.use_raw_dmx_values {
                        value.round().clamp(0.0, 255.0) as u8
                    } else {
                        (value.clamp(0.0, 100.0) * 2.55).round() as u8
                    };
                }
            }
        }

        Ok(Self {
            universe,
            sequence: options.sequence,
            priority: options.priority,
            options: options.options,
            sync_universe: options.sync_universe,
            source_name: options.source_name.clone(),
            cid: options.cid.unwrap_or_else(|| *Uuid::new_v4().as_bytes()),
            slots,
        })
    }

    /// Serialize to the 638-byte wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packet = vec![0u8; layout::PACKET_LEN];

        // Root layer
        packet[layout::PREAMBLE_SIZE_RANGE].copy_from_slice(&layout::PREAMBLE_SIZE.to_be_bytes());
        packet[layout::POSTAMBLE_SIZE_RANGE].copy_from_slice(&layout::POSTAMBLE_SIZE.to_be_bytes());
        packet[layout::ACN_PID_RANGE].copy_from_slice(layout::ACN_PID);
        packet[layout::ROOT_FLAGS_RANGE].copy_from_slice(&layout::ROOT_FLAGS.to_be_bytes());
        packet[layout::ROOT_VECTOR_RANGE].copy_from_slice(&layout::ROOT_VECTOR_DATA.to_be_bytes());
        packet[layout::CID_RANGE].copy_from_slice(&self.cid);

        // Framing layer
        packet[layout::FRAMING_FLAGS_RANGE].copy_from_slice(&layout::FRAMING_FLAGS.to_be_bytes());
        packet[layout::FRAMING_VECTOR_RANGE]
            .copy_from_slice(&layout::FRAMING_VECTOR_DMX.to_be_bytes());
        let name = self.source_name.as_bytes();
        let name_len = name.len().min(layout::SOURCE_NAME_LEN - 1);
        packet[layout::SOURCE_NAME_RANGE.start..layout::SOURCE_NAME_RANGE.start + name_len]
            .copy_from_slice(&name[..name_len]);
        packet[layout::PRIORITY_OFFSET] = self.priority;
        packet[layout::SYNC_UNIVERSE_RANGE].copy_from_slice(&self.sync_universe.to_be_bytes());
        packet[layout::SEQUENCE_OFFSET] = self.sequence;
        packet[layout::OPTIONS_OFFSET] = self.options;
        packet[layout::UNIVERSE_RANGE].copy_from_slice(&self.universe.to_be_bytes());

        // DMP layer
        packet[layout::DMP_FLAGS_RANGE].copy_from_slice(&layout::DMP_FLAGS.to_be_bytes());
        packet[layout::DMP_VECTOR_OFFSET] = layout::DMP_VECTOR_SET_PROPERTY;
        packet[layout::DMP_TYPE_OFFSET] = layout::DMP_TYPE;
        packet[layout::FIRST_ADDRESS_RANGE].copy_from_slice(&0u16.to_be_bytes());
        packet[layout::ADDRESS_INCREMENT_RANGE].copy_from_slice(&1u16.to_be_bytes());
        packet[layout::PROPERTY_COUNT_RANGE].copy_from_slice(&layout::PROPERTY_COUNT.to_be_bytes());
        packet[layout::START_CODE_OFFSET] = 0;
        packet[layout::DMX_DATA_OFFSET..].copy_from_slice(&self.slots);

        packet
    }

    /// Parse a 638-byte wire packet, asserting every fixed field
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        if payload.len() < layout::PACKET_LEN {
            return Err(SacnError::TooShort {
                needed: layout::PACKET_LEN,
                actual: payload.len(),
            });
        }

        let read_u16 = |range: std::ops::Range<usize>| {
            u16::from_be_bytes([payload[range.start], payload[range.start + 1]])
        };
        let read_u32 = |range: std::ops::Range<usize>| {
            u32::from_be_bytes([
                payload[range.start],
                payload[range.start + 1],
                payload[range.start + 2],
                payload[range.start + 3],
            ])
        };

        if read_u16(layout::PREAMBLE_SIZE_RANGE) != layout::PREAMBLE_SIZE
            || read_u16(layout::POSTAMBLE_SIZE_RANGE) != layout::POSTAMBLE_SIZE
        {
            return Err(SacnError::InvalidPreamble);
        }
        if &payload[layout::ACN_PID_RANGE] != layout::ACN_PID {
            return Err(SacnError::InvalidAcnPid);
        }

        let root_flags = read_u16(layout::ROOT_FLAGS_RANGE);
        if root_flags != layout::ROOT_FLAGS {
            return Err(SacnError::InvalidFlags {
                layer: "root",
                value: root_flags,
            });
        }
        let root_vector = read_u32(layout::ROOT_VECTOR_RANGE);
        if root_vector != layout::ROOT_VECTOR_DATA {
            return Err(SacnError::InvalidRootVector { value: root_vector });
        }

        let framing_flags = read_u16(layout::FRAMING_FLAGS_RANGE);
        if framing_flags != layout::FRAMING_FLAGS {
            return Err(SacnError::InvalidFlags {
                layer: "framing",
                value: framing_flags,
            });
        }
        let framing_vector = read_u32(layout::FRAMING_VECTOR_RANGE);
        if framing_vector != layout::FRAMING_VECTOR_DMX {
            return Err(SacnError::InvalidFramingVector {
                value: framing_vector,
            });
        }

        let dmp_flags = read_u16(layout::DMP_FLAGS_RANGE);
        if dmp_flags != layout::DMP_FLAGS {
            return Err(SacnError::InvalidFlags {
                layer: "DMP",
                value: dmp_flags,
            });
        }
        let dmp_vector = payload[layout::DMP_VECTOR_OFFSET];
        if dmp_vector != layout::DMP_VECTOR_SET_PROPERTY {
            return Err(SacnError::InvalidDmpVector { value: dmp_vector });
        }
        let dmp_type = payload[layout::DMP_TYPE_OFFSET];
        if dmp_type != layout::DMP_TYPE {
            return Err(SacnError::InvalidDmpType { value: dmp_type });
        }
        let first_address = read_u16(layout::FIRST_ADDRESS_RANGE);
        if first_address != 0 {
            return Err(SacnError::InvalidFirstAddress {
                value: first_address,
            });
        }
        let increment = read_u16(layout::ADDRESS_INCREMENT_RANGE);
        if increment != 1 {
            return Err(SacnError::InvalidAddressIncrement { value: increment });
        }
        let count = read_u16(layout::PROPERTY_COUNT_RANGE);
        if count != layout::PROPERTY_COUNT {
            return Err(SacnError::InvalidPropertyValueCount { count });
        }
        let start_code = payload[layout::START_CODE_OFFSET];
        if start_code != 0 {
            return Err(SacnError::InvalidStartCode { value: start_code });
        }

        let universe = validate_sacn_universe(read_u16(layout::UNIVERSE_RANGE))?;

        let mut cid = [0u8; 16];
        cid.copy_from_slice(&payload[layout::CID_RANGE]);
        let mut slots = [0u8; layout::DMX_SLOTS];
        slots.copy_from_slice(&payload[layout::DMX_DATA_OFFSET..layout::PACKET_LEN]);

        Ok(Self {
            universe,
            sequence: payload[layout::SEQUENCE_OFFSET],
            priority: payload[layout::PRIORITY_OFFSET],
            options: payload[layout::OPTIONS_OFFSET],
            sync_universe: read_u16(layout::SYNC_UNIVERSE_RANGE),
            source_name: String::from_utf8_lossy(&payload[layout::SOURCE_NAME_RANGE])
                .trim_end_matches('\0')
                .to_string(),
            cid,
            slots,
        })
    }
}
