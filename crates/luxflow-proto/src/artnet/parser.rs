//! Art-Net packet parsers
//!
//! Parsers return `Ok(None)` when the buffer is not the expected
//! Art-Net packet at all (foreign identifier or opcode) and an error
//! when it claims to be one but is malformed.

use luxflow_core::Uid;

use super::error::ArtNetError;
use super::layout;
use super::{PortAddress, Result};

fn require_len(payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(ArtNetError::TooShort {
            needed,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn has_artnet_header(payload: &[u8]) -> bool {
    payload.len() >= layout::OPCODE_RANGE.end && &payload[layout::ID_RANGE] == layout::ARTNET_ID
}

/// Peek at the opcode of an Art-Net packet, or `None` for foreign traffic
pub fn parse_opcode(payload: &[u8]) -> Option<u16> {
    if !has_artnet_header(payload) {
        return None;
    }
    Some(u16::from_le_bytes([payload[8], payload[9]]))
}

/// A parsed ArtDmx packet
#[derive(Debug, Clone)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    pub net: u8,
    pub sub_net: u8,
    /// Reconstructed 1-based universe index
    pub universe: u16,
    pub length: u16,
    pub data: Vec<u8>,
}

/// Parse an ArtDmx packet
pub fn parse_art_dmx(payload: &[u8]) -> Result<Option<ArtDmx>> {
    if parse_opcode(payload) != Some(layout::OP_DMX) {
        return Ok(None);
    }
    require_len(payload, layout::DMX_DATA_OFFSET)?;

    let length = u16::from_be_bytes([payload[16], payload[17]]);
    if length < 2 || length as usize > layout::DMX_MAX_SLOTS {
        return Err(ArtNetError::InvalidLength { length });
    }
    require_len(payload, layout::DMX_DATA_OFFSET + length as usize)?;

    let sub_uni = payload[layout::DMX_SUBUNI_OFFSET];
    let address = PortAddress {
        net: payload[layout::DMX_NET_OFFSET] & 0x7F,
        sub_net: sub_uni >> 4,
        universe: sub_uni & 0x0F,
    };

    Ok(Some(ArtDmx {
        sequence: payload[layout::DMX_SEQUENCE_OFFSET],
        physical: payload[layout::DMX_PHYSICAL_OFFSET],
        net: address.net,
        sub_net: address.sub_net,
        universe: address.to_universe(),
        length,
        data: payload[layout::DMX_DATA_OFFSET..layout::DMX_DATA_OFFSET + length as usize]
            .to_vec(),
    }))
}

fn read_padded_string(payload: &[u8], range: std::ops::Range<usize>) -> String {
    String::from_utf8_lossy(&payload[range])
        .trim_end_matches('\0')
        .to_string()
}

/// Parse an ArtPollReply node description
pub fn parse_art_poll_reply(payload: &[u8]) -> Result<Option<super::builder::ArtPollReply>> {
    if parse_opcode(payload) != Some(layout::OP_POLL_REPLY) {
        return Ok(None);
    }
    require_len(payload, layout::REPLY_LEN)?;

    let mut reply = super::builder::ArtPollReply::default();
    reply.ip.copy_from_slice(&payload[layout::REPLY_IP_RANGE]);
    reply.port = u16::from_le_bytes([payload[14], payload[15]]);
    reply.firmware_version = u16::from_be_bytes([payload[16], payload[17]]);
    reply.net_switch = payload[layout::REPLY_NET_SWITCH_OFFSET];
    reply.sub_switch = payload[layout::REPLY_SUB_SWITCH_OFFSET];
    reply.oem = u16::from_be_bytes([payload[20], payload[21]]);
    reply.ubea_version = payload[layout::REPLY_UBEA_OFFSET];
    reply.status1 = payload[layout::REPLY_STATUS1_OFFSET];
    reply.esta = u16::from_le_bytes([payload[24], payload[25]]);
    reply.port_name = read_padded_string(payload, layout::REPLY_PORT_NAME_RANGE);
    reply.long_name = read_padded_string(payload, layout::REPLY_LONG_NAME_RANGE);
    reply.node_report = read_padded_string(payload, layout::REPLY_NODE_REPORT_RANGE);
    reply.num_ports = u16::from_be_bytes([payload[172], payload[173]]);
    reply
        .port_types
        .copy_from_slice(&payload[layout::REPLY_PORT_TYPES_RANGE]);
    reply
        .good_input
        .copy_from_slice(&payload[layout::REPLY_GOOD_INPUT_RANGE]);
    reply
        .good_output
        .copy_from_slice(&payload[layout::REPLY_GOOD_OUTPUT_RANGE]);
    reply.sw_in.copy_from_slice(&payload[layout::REPLY_SW_IN_RANGE]);
    reply.sw_out.copy_from_slice(&payload[layout::REPLY_SW_OUT_RANGE]);
    reply.style = payload[layout::REPLY_STYLE_OFFSET];
    reply.mac.copy_from_slice(&payload[layout::REPLY_MAC_RANGE]);
    reply
        .bind_ip
        .copy_from_slice(&payload[layout::REPLY_BIND_IP_RANGE]);
    reply.bind_index = payload[layout::REPLY_BIND_INDEX_OFFSET];
    reply.status2 = payload[layout::REPLY_STATUS2_OFFSET];
    Ok(Some(reply))
}

/// A parsed ArtTodData table advertisement
#[derive(Debug, Clone)]
pub struct ArtTodData {
    /// Reconstructed 1-based universe index
    pub universe: u16,
    pub uid_total: u16,
    pub block_count: u8,
    pub uids: Vec<Uid>,
}

/// Parse an ArtTodData packet
pub fn parse_art_tod_data(payload: &[u8]) -> Result<Option<ArtTodData>> {
    if parse_opcode(payload) != Some(layout::OP_TOD_DATA) {
        return Ok(None);
    }
    require_len(payload, layout::TOD_DATA_UID_OFFSET)?;

    let uid_count = payload[layout::TOD_DATA_UID_COUNT_OFFSET] as usize;
    let needed = layout::TOD_DATA_UID_OFFSET + uid_count * 6;
    require_len(payload, needed)?;

    let sub_uni = payload[layout::TOD_DATA_ADDRESS_OFFSET];
    let address = PortAddress {
        net: payload[layout::TOD_DATA_NET_OFFSET] & 0x7F,
        sub_net: sub_uni >> 4,
        universe: sub_uni & 0x0F,
    };

    let mut uids = Vec::with_capacity(uid_count);
    for chunk in payload[layout::TOD_DATA_UID_OFFSET..needed].chunks_exact(6) {
        // chunks_exact guarantees 6-byte slices
        if let Ok(uid) = Uid::from_bytes(chunk) {
            uids.push(uid);
        }
    }

    Ok(Some(ArtTodData {
        universe: address.to_universe(),
        uid_total: u16::from_be_bytes([payload[24], payload[25]]),
        block_count: payload[layout::TOD_DATA_BLOCK_COUNT_OFFSET],
        uids,
    }))
}

/// A parsed ArtRdm packet: the embedded RDM frame without its start code
#[derive(Debug, Clone)]
pub struct ArtRdm {
    /// Reconstructed 1-based universe index
    pub universe: u16,
    pub rdm_data: Vec<u8>,
}

/// Parse an ArtRdm packet
pub fn parse_art_rdm(payload: &[u8]) -> Result<Option<ArtRdm>> {
    if parse_opcode(payload) != Some(layout::OP_RDM) {
        return Ok(None);
    }
    require_len(payload, layout::RDM_DATA_OFFSET + 1)?;

    let sub_uni = payload[layout::RDM_ADDRESS_OFFSET];
    let address = PortAddress {
        net: payload[layout::RDM_NET_OFFSET] & 0x7F,
        sub_net: sub_uni >> 4,
        universe: sub_uni & 0x0F,
    };

    Ok(Some(ArtRdm {
        universe: address.to_universe(),
        rdm_data: payload[layout::RDM_DATA_OFFSET..].to_vec(),
    }))
}
