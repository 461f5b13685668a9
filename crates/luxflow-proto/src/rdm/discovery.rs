//! DISC_UNIQUE_BRANCH response framing
//!
//! Discovery responses are not regular RDM frames: responders emit up
//! to seven 0xFE preamble bytes, a 0xAA separator, then the UID and
//! its checksum with each byte transmitted twice under alternating
//! 0xAA/0x55 masks so that colliding responders still produce a
//! decodable pattern failure. ANDing each adjacent pair recovers the
//! original byte.

use luxflow_core::Uid;

use super::consts;
use super::error::RdmError;
use super::frame::checksum;
use super::Result;

/// Decode one DISC_UNIQUE_BRANCH response into the responding UID
///
/// Fails on a malformed preamble or a masked-checksum mismatch (the
/// usual signature of two responders answering at once).
pub fn decode_discovery_response(payload: &[u8]) -> Result<Uid> {
    // Locate the separator within the permitted preamble window.
    let mut separator = None;
    for (index, &byte) in payload
        .iter()
        .take(consts::DISCOVERY_PREAMBLE_MAX + 1)
        .enumerate()
    {
        match byte {
            consts::DISCOVERY_PREAMBLE_SEPARATOR => {
                separator = Some(index);
                break;
            }
            consts::DISCOVERY_PREAMBLE_BYTE => continue,
            _ => return Err(RdmError::InvalidDiscoveryPreamble),
        }
    }
    let separator = separator.ok_or(RdmError::InvalidDiscoveryPreamble)?;

    let body = &payload[separator + 1..];
    if body.len() < 16 {
        return Err(RdmError::InvalidLength {
            length: payload.len(),
        });
    }

    let masked_uid = &body[..12];
    let mut uid_bytes = [0u8; 6];
    for (index, pair) in masked_uid.chunks_exact(2).enumerate() {
        uid_bytes[index] = pair[0] & pair[1];
    }

    let checksum_hi = body[12] & body[13];
    let checksum_lo = body[14] & body[15];
    let found = u16::from_be_bytes([checksum_hi, checksum_lo]);
    let computed = checksum(masked_uid);
    if computed != found {
        return Err(RdmError::ChecksumMismatch { computed, found });
    }

    Ok(Uid::from_bytes(&uid_bytes)?)
}

/// Encode a DISC_UNIQUE_BRANCH response for `uid` (mock responders, tests)
pub fn encode_discovery_response(uid: Uid) -> Vec<u8> {
    let mut payload = vec![consts::DISCOVERY_PREAMBLE_BYTE; consts::DISCOVERY_PREAMBLE_MAX];
    payload.push(consts::DISCOVERY_PREAMBLE_SEPARATOR);

    let mut masked_uid = Vec::with_capacity(12);
    for byte in uid.to_bytes() {
        masked_uid.push(byte | 0xAA);
        masked_uid.push(byte | 0x55);
    }
    let checksum = checksum(&masked_uid).to_be_bytes();
    payload.extend_from_slice(&masked_uid);
    payload.push(checksum[0] | 0xAA);
    payload.push(checksum[0] | 0x55);
    payload.push(checksum[1] | 0xAA);
    payload.push(checksum[1] | 0x55);
    payload
}
