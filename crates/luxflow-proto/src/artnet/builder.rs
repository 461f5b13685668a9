//! Art-Net packet builders
//!
//! Each builder emits the exact byte layout from [`super::layout`]:
//! the 8-byte identifier, the little-endian opcode, the big-endian
//! protocol version (14), then the opcode-specific body.

use luxflow_core::Uid;

use super::error::ArtNetError;
use super::layout;
use super::{PortAddress, Result};

fn header(opcode: u16) -> Vec<u8> {
    let mut packet = Vec::with_capacity(layout::HEADER_LEN);
    packet.extend_from_slice(layout::ARTNET_ID);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.extend_from_slice(&layout::PROTOCOL_VERSION.to_be_bytes());
    packet
}

/// The ArtPoll `TalkToMe` behaviour bitfield
#[derive(Debug, Clone, Copy, Default)]
pub struct TalkToMe {
    /// bit 1: send diagnostics messages
    pub diagnostics: bool,
    /// bit 2: send diagnostics unicast instead of broadcast
    pub unicast_diagnostics: bool,
    /// bit 3: send ArtPollReply on changes without waiting for a poll
    pub reply_on_change: bool,
    /// bit 4: send ArtPollReply when node input changes
    pub reply_on_input_change: bool,
    /// bit 5: enable IEEE VLC transmission
    pub ieee_vlc: bool,
    /// bit 6: include node report with data transmission
    pub node_report_on_data: bool,
}

impl TalkToMe {
    fn to_byte(self) -> u8 {
        let mut byte = 0u8;
        if self.diagnostics {
            byte |= 1 << 1;
        }
        if self.unicast_diagnostics {
            byte |= 1 << 2;
        }
        if self.reply_on_change {
            byte |= 1 << 3;
        }
        if self.reply_on_input_change {
            byte |= 1 << 4;
        }
        if self.ieee_vlc {
            byte |= 1 << 5;
        }
        if self.node_report_on_data {
            byte |= 1 << 6;
        }
        byte
    }
}

/// Build an ArtPoll packet (14 bytes)
pub fn build_art_poll(flags: TalkToMe, priority: u8) -> Vec<u8> {
    let mut packet = header(layout::OP_POLL);
    packet.push(flags.to_byte());
    packet.push(priority);
    packet
}

/// Options for building an ArtDmx (OpDmx) packet
#[derive(Debug, Clone)]
pub struct ArtDmxOptions<'a> {
    /// 1-based universe index (1-32768)
    pub universe: u16,
    pub sequence: u8,
    pub physical: u8,
    pub data: &'a [u8],
    /// Override the payload length (clamped to 512); defaults to `data.len()`
    pub length: Option<u16>,
}

/// Build an ArtDmx packet: 18 header bytes plus the DMX payload
pub fn build_art_dmx(options: &ArtDmxOptions<'_>) -> Result<Vec<u8>> {
    let address = PortAddress::from_universe(options.universe)?;
    let length = (options.length.unwrap_or(options.data.len() as u16) as usize)
        .min(layout::DMX_MAX_SLOTS);

    let mut packet = header(layout::OP_DMX);
    packet.push(options.sequence);
    packet.push(options.physical);
    packet.push(address.sub_uni());
    packet.push(address.net);
    packet.extend_from_slice(&(length as u16).to_be_bytes());

    let copy_len = options.data.len().min(length);
    packet.extend_from_slice(&options.data[..copy_len]);
    packet.resize(layout::DMX_DATA_OFFSET + length, 0);
    Ok(packet)
}

/// Build an ArtSync packet (14 bytes, two aux zero bytes)
pub fn build_art_sync() -> Vec<u8> {
    let mut packet = header(layout::OP_SYNC);
    packet.extend_from_slice(&[0, 0]);
    packet
}

/// Build an ArtDiagData packet carrying a null-terminated text payload
pub fn build_art_diag_data(priority: u8, text: &str) -> Result<Vec<u8>> {
    // Length field counts the text plus its terminating null.
    let length = text.len() + 1;
    if length > layout::COMMAND_MAX_DATA {
        return Err(ArtNetError::PayloadTooLong {
            length,
            max: layout::COMMAND_MAX_DATA,
        });
    }
    let mut packet = header(layout::OP_DIAG_DATA);
    packet.push(0);
    packet.push(priority);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&(length as u16).to_be_bytes());
    packet.extend_from_slice(text.as_bytes());
    packet.push(0);
    Ok(packet)
}

/// SMPTE time code type carried by ArtTimeCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeCodeType {
    Film24 = 0,
    Ebu25 = 1,
    Df30 = 2,
    Smpte30 = 3,
}

/// An Art-Net time code frame
#[derive(Debug, Clone, Copy)]
pub struct ArtTimeCode {
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub kind: TimeCodeType,
}

/// Build an ArtTimeCode packet (19 bytes)
pub fn build_art_time_code(time_code: &ArtTimeCode) -> Vec<u8> {
    let mut packet = header(layout::OP_TIME_CODE);
    packet.extend_from_slice(&[0, 0]);
    packet.push(time_code.frames);
    packet.push(time_code.seconds);
    packet.push(time_code.minutes);
    packet.push(time_code.hours);
    packet.push(time_code.kind as u8);
    packet
}

/// Build an ArtCommand packet with an ESTA code and a text payload
pub fn build_art_command(esta: u16, text: &str) -> Result<Vec<u8>> {
    let length = text.len() + 1;
    if length > layout::COMMAND_MAX_DATA {
        return Err(ArtNetError::PayloadTooLong {
            length,
            max: layout::COMMAND_MAX_DATA,
        });
    }
    let mut packet = header(layout::OP_COMMAND);
    packet.extend_from_slice(&esta.to_be_bytes());
    packet.extend_from_slice(&(length as u16).to_be_bytes());
    packet.extend_from_slice(text.as_bytes());
    packet.push(0);
    Ok(packet)
}

/// Build an ArtTrigger packet
pub fn build_art_trigger(oem: u16, key: u8, sub_key: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > layout::TRIGGER_MAX_DATA {
        return Err(ArtNetError::PayloadTooLong {
            length: payload.len(),
            max: layout::TRIGGER_MAX_DATA,
        });
    }
    let mut packet = header(layout::OP_TRIGGER);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&oem.to_be_bytes());
    packet.push(key);
    packet.push(sub_key);
    packet.extend_from_slice(payload);
    Ok(packet)
}

/// Fields of an ArtPollReply node description (fixed 239-byte packet)
#[derive(Debug, Clone)]
pub struct ArtPollReply {
    pub ip: [u8; 4],
    pub port: u16,
    pub firmware_version: u16,
    pub net_switch: u8,
    pub sub_switch: u8,
    pub oem: u16,
    pub ubea_version: u8,
    pub status1: u8,
    pub esta: u16,
    pub port_name: String,
    pub long_name: String,
    pub node_report: String,
    pub num_ports: u16,
    pub port_types: [u8; 4],
    pub good_input: [u8; 4],
    pub good_output: [u8; 4],
    pub sw_in: [u8; 4],
    pub sw_out: [u8; 4],
    pub style: u8,
    pub mac: [u8; 6],
    pub bind_ip: [u8; 4],
    pub bind_index: u8,
    pub status2: u8,
}

impl Default for ArtPollReply {
    fn default() -> Self {
        Self {
            ip: [0; 4],
            port: 6454,
            firmware_version: 0,
            net_switch: 0,
            sub_switch: 0,
            oem: 0,
            ubea_version: 0,
            status1: 0,
            esta: 0,
            port_name: String::new(),
            long_name: String::new(),
            node_report: String::new(),
            num_ports: 0,
            port_types: [0; 4],
            good_input: [0; 4],
            good_output: [0; 4],
            sw_in: [0; 4],
            sw_out: [0; 4],
            style: 0,
            mac: [0; 6],
            bind_ip: [0; 4],
            bind_index: 0,
            status2: 0,
        }
    }
}

fn write_padded(packet: &mut [u8], range: std::ops::Range<usize>, text: &str) {
    let field = &mut packet[range];
    field.fill(0);
    let copy = text.as_bytes().len().min(field.len().saturating_sub(1));
    field[..copy].copy_from_slice(&text.as_bytes()[..copy]);
}

/// Build an ArtPollReply packet (239 bytes; PollReply carries no protocol version)
pub fn build_art_poll_reply(reply: &ArtPollReply) -> Vec<u8> {
    let mut packet = vec![0u8; layout::REPLY_LEN];
    packet[layout::ID_RANGE].copy_from_slice(layout::ARTNET_ID);
    packet[layout::OPCODE_RANGE].copy_from_slice(&layout::OP_POLL_REPLY.to_le_bytes());
    packet[layout::REPLY_IP_RANGE].copy_from_slice(&reply.ip);
    // Port and ESTA code are little-endian in PollReply.
    packet[layout::REPLY_PORT_RANGE].copy_from_slice(&reply.port.to_le_bytes());
    packet[layout::REPLY_VERSION_RANGE].copy_from_slice(&reply.firmware_version.to_be_bytes());
    packet[layout::REPLY_NET_SWITCH_OFFSET] = reply.net_switch;
    packet[layout::REPLY_SUB_SWITCH_OFFSET] = reply.sub_switch;
    packet[layout::REPLY_OEM_RANGE].copy_from_slice(&reply.oem.to_be_bytes());
    packet[layout::REPLY_UBEA_OFFSET] = reply.ubea_version;
    packet[layout::REPLY_STATUS1_OFFSET] = reply.status1;
    packet[layout::REPLY_ESTA_RANGE].copy_from_slice(&reply.esta.to_le_bytes());
    write_padded(&mut packet, layout::REPLY_PORT_NAME_RANGE, &reply.port_name);
    write_padded(&mut packet, layout::REPLY_LONG_NAME_RANGE, &reply.long_name);
    write_padded(&mut packet, layout::REPLY_NODE_REPORT_RANGE, &reply.node_report);
    packet[layout::REPLY_NUM_PORTS_RANGE].copy_from_slice(&reply.num_ports.to_be_bytes());
    packet[layout::REPLY_PORT_TYPES_RANGE].copy_from_slice(&reply.port_types);
    packet[layout::REPLY_GOOD_INPUT_RANGE].copy_from_slice(&reply.good_input);
    packet[layout::REPLY_GOOD_OUTPUT_RANGE].copy_from_slice(&reply.good_output);
    packet[layout::REPLY_SW_IN_RANGE].copy_from_slice(&reply.sw_in);
    packet[layout::REPLY_SW_OUT_RANGE].copy_from_slice(&reply.sw_out);
    packet[layout::REPLY_STYLE_OFFSET] = reply.style;
    packet[layout::REPLY_MAC_RANGE].copy_from_slice(&reply.mac);
    packet[layout::REPLY_BIND_IP_RANGE].copy_from_slice(&reply.bind_ip);
    packet[layout::REPLY_BIND_INDEX_OFFSET] = reply.bind_index;
    packet[layout::REPLY_STATUS2_OFFSET] = reply.status2;
    packet
}

fn rdm_body_header(opcode: u16, universe: u16) -> Result<(Vec<u8>, PortAddress)> {
    let address = PortAddress::from_universe(universe)?;
    let mut packet = header(opcode);
    // Two filler bytes plus seven spare bytes precede the Net field.
    packet.resize(layout::TOD_REQUEST_NET_OFFSET, 0);
    Ok((packet, address))
}

/// Build an ArtTodRequest for one universe (25 bytes)
pub fn build_art_tod_request(universe: u16) -> Result<Vec<u8>> {
    let (mut packet, address) = rdm_body_header(layout::OP_TOD_REQUEST, universe)?;
    packet.push(address.net);
    packet.push(layout::TOD_FULL);
    packet.push(1);
    packet.push(address.sub_uni());
    Ok(packet)
}

/// Build an ArtTodData packet advertising a table of discovered UIDs
pub fn build_art_tod_data(universe: u16, uids: &[Uid]) -> Result<Vec<u8>> {
    if uids.len() > 200 {
        return Err(ArtNetError::PayloadTooLong {
            length: uids.len(),
            max: 200,
        });
    }
    let address = PortAddress::from_universe(universe)?;
    let mut packet = header(layout::OP_TOD_DATA);
    packet.resize(layout::TOD_DATA_UID_OFFSET, 0);
    packet[layout::TOD_DATA_RDM_VER_OFFSET] = layout::RDM_PROTOCOL_VERSION;
    packet[layout::TOD_DATA_PORT_OFFSET] = 1;
    packet[layout::TOD_DATA_NET_OFFSET] = address.net;
    packet[layout::TOD_DATA_COMMAND_OFFSET] = layout::TOD_FULL;
    packet[layout::TOD_DATA_ADDRESS_OFFSET] = address.sub_uni();
    packet[layout::TOD_DATA_UID_TOTAL_RANGE].copy_from_slice(&(uids.len() as u16).to_be_bytes());
    packet[layout::TOD_DATA_BLOCK_COUNT_OFFSET] = 0;
    packet[layout::TOD_DATA_UID_COUNT_OFFSET] = uids.len() as u8;
    for uid in uids {
        packet.extend_from_slice(&uid.to_bytes());
    }
    Ok(packet)
}

/// Build an ArtTodControl packet (`flush` forces rediscovery)
pub fn build_art_tod_control(universe: u16, flush: bool) -> Result<Vec<u8>> {
    let (mut packet, address) = rdm_body_header(layout::OP_TOD_CONTROL, universe)?;
    packet.push(address.net);
    packet.push(if flush {
        layout::TOD_FLUSH
    } else {
        layout::TOD_FULL
    });
    packet.push(address.sub_uni());
    Ok(packet)
}

/// Build an ArtRdm packet wrapping an encoded RDM frame without its 0xCC start code
pub fn build_art_rdm(universe: u16, rdm_sans_start_code: &[u8]) -> Result<Vec<u8>> {
    let address = PortAddress::from_universe(universe)?;
    let mut packet = header(layout::OP_RDM);
    packet.resize(layout::RDM_DATA_OFFSET, 0);
    packet[layout::RDM_VER_OFFSET] = layout::RDM_PROTOCOL_VERSION;
    packet[layout::RDM_NET_OFFSET] = address.net;
    packet[layout::RDM_COMMAND_OFFSET] = layout::AR_PROCESS;
    packet[layout::RDM_ADDRESS_OFFSET] = address.sub_uni();
    packet.extend_from_slice(rdm_sans_start_code);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_art_poll_structure() {
        let flags = TalkToMe {
            diagnostics: true,
            reply_on_change: true,
            ..Default::default()
        };
        let packet = build_art_poll(flags, 0x10);

        assert_eq!(packet.len(), layout::POLL_LEN);
        assert_eq!(&packet[..8], layout::ARTNET_ID);
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x20);
        assert_eq!(packet[10], 0);
        assert_eq!(packet[11], 14);
        assert_eq!(packet[12], 0b0000_1010);
        assert_eq!(packet[13], 0x10);
    }

    #[test]
    fn test_art_dmx_structure() {
        let packet = build_art_dmx(&ArtDmxOptions {
            universe: 257,
            sequence: 11,
            physical: 2,
            data: &[1, 2, 3, 4],
            length: None,
        })
        .unwrap();

        assert_eq!(packet.len(), 18 + 4);
        assert_eq!(packet[12], 11);
        assert_eq!(packet[13], 2);
        assert_eq!(packet[14], 0x00); // SubUni
        assert_eq!(packet[15], 0x01); // Net
        assert_eq!(&packet[16..18], &[0, 4]);
        assert_eq!(&packet[18..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_art_dmx_length_override_pads() {
        let packet = build_art_dmx(&ArtDmxOptions {
            universe: 1,
            sequence: 0,
            physical: 0,
            data: &[9, 9],
            length: Some(6),
        })
        .unwrap();

        assert_eq!(packet.len(), 24);
        assert_eq!(&packet[18..], &[9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn test_art_dmx_length_clamped_to_512() {
        let data = [1u8; 600];
        let packet = build_art_dmx(&ArtDmxOptions {
            universe: 1,
            sequence: 0,
            physical: 0,
            data: &data,
            length: None,
        })
        .unwrap();
        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_art_sync_structure() {
        let packet = build_art_sync();
        assert_eq!(packet.len(), layout::SYNC_LEN);
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x52);
    }

    #[test]
    fn test_art_time_code_structure() {
        let packet = build_art_time_code(&ArtTimeCode {
            frames: 12,
            seconds: 34,
            minutes: 56,
            hours: 7,
            kind: TimeCodeType::Ebu25,
        });
        assert_eq!(packet.len(), layout::TIME_CODE_LEN);
        assert_eq!(&packet[14..19], &[12, 34, 56, 7, 1]);
    }

    #[test]
    fn test_art_poll_reply_structure() {
        let packet = build_art_poll_reply(&ArtPollReply {
            ip: [10, 0, 0, 2],
            port_name: "node".to_string(),
            ..Default::default()
        });
        assert_eq!(packet.len(), layout::REPLY_LEN);
        assert_eq!(packet[9], 0x21);
        assert_eq!(&packet[10..14], &[10, 0, 0, 2]);
        // Port 6454 little-endian
        assert_eq!(&packet[14..16], &[0x36, 0x19]);
        assert_eq!(&packet[26..30], b"node");
    }

    #[test]
    fn test_art_tod_request_structure() {
        let packet = build_art_tod_request(257).unwrap();
        assert_eq!(packet.len(), layout::TOD_REQUEST_LEN);
        assert_eq!(packet[9], 0x80);
        assert_eq!(packet[layout::TOD_REQUEST_NET_OFFSET], 1);
        assert_eq!(packet[layout::TOD_REQUEST_ADD_COUNT_OFFSET], 1);
        assert_eq!(packet[layout::TOD_REQUEST_ADDRESS_OFFSET], 0x00);
    }

    #[test]
    fn test_art_rdm_wraps_frame() {
        let rdm = [0x01, 0x18, 0xAA];
        let packet = build_art_rdm(1, &rdm).unwrap();
        assert_eq!(packet[9], 0x83);
        assert_eq!(packet[layout::RDM_VER_OFFSET], 0x01);
        assert_eq!(&packet[layout::RDM_DATA_OFFSET..], &rdm);
    }
}
