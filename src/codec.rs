//! On-air frame codec: build and parse (§4.4, §6, §9).
//!
//! One shared codec for both build and parse, parameterized only by
//! direction flags and station/peer address, resolving the "Duplicated frame
//! codec" redesign note (§9) — the teacher's own AP-side and station-side
//! near-duplicate builder/parser code is exactly the anti-pattern this
//! module exists to avoid. Every integer is little-endian and the
//! application header has no padding, matching the teacher's own manual
//! `to_le_bytes`/`from_le_bytes` field extraction style rather than reaching
//! for a bitfield-derive crate (spec §9 "Packed structures + byte layout";
//! see `node_task::extract_sequence_from_payload` for the teacher's own
//! hand-rolled byte extraction).

use crate::error::CodecError;
use crate::types::{ClassId, DataType, MAX_PACKET_SIZE, NUM_CLASSES};

/// Fixed MAC-layer header length (§3, §4.4).
pub const MAC_HDR_SIZE: usize = 24;

/// Application header length: `NUM_CLASSES` counts (u32) + `NUM_CLASSES`
/// type tags (u8) + `total_size` (u16) + `timestamp` (u32).
pub const APP_HDR_SIZE: usize = NUM_CLASSES * 4 + NUM_CLASSES + 2 + 4;

const DATA_FRAME_TYPE: u8 = 0x08;
const FLAG_TO_DS: u8 = 0x01;
const FLAG_FROM_DS: u8 = 0x02;

pub type MacAddr = [u8; 6];

pub const BROADCAST: MacAddr = [0xff; 6];

/// Which endpoint is building/parsing the frame. Station uplinks set
/// ToDS; the AP's downlink sets FromDS (§4.4, §9 direction-flag Open
/// Question resolution: flags match the endpoint role).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    StationToAp,
    ApToStation,
}

impl Direction {
    fn flags(self) -> u8 {
        match self {
            Direction::StationToAp => FLAG_TO_DS,
            Direction::ApToStation => FLAG_FROM_DS,
        }
    }

    /// The direction a receiver on `role` expects to accept (§4.4 step 2).
    fn expected_for_receiver(role: Direction) -> Direction {
        match role {
            // A station receives AP->station frames; an AP receives station->AP frames.
            Direction::StationToAp => Direction::ApToStation,
            Direction::ApToStation => Direction::StationToAp,
        }
    }
}

/// Addressing context a codec instance builds/parses frames for.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub direction: Direction,
    pub own_address: MacAddr,
    pub bssid: MacAddr,
}

/// Per-class counts and type tags describing one frame's payload layout.
#[derive(Debug, Clone, Copy)]
pub struct ClassLayout {
    pub count: [u32; NUM_CLASSES],
    pub data_type: [DataType; NUM_CLASSES],
}

/// A frame successfully parsed off the air (§4.5 input to the receiver pipeline).
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub layout: ClassLayout,
    pub total_size: u16,
    pub timestamp_ms: u32,
    pub payload: Vec<u8>,
    /// Set when the declared `total_size` exceeded the bytes actually
    /// present; `payload` holds only what was available (§4.4 `PayloadTruncated`).
    pub truncated: bool,
}

/// Build one on-air frame: MAC header + application header + payload.
///
/// `peer` is the destination MAC; pass [`BROADCAST`] when the peer address
/// is unknown (§9: broadcast is a fallback, not the default).
pub fn build_frame(endpoint: &Endpoint, peer: MacAddr, layout: &ClassLayout, payload: &[u8], timestamp_ms: u32) -> Vec<u8> {
    let total_size = payload.len();
    debug_assert!(total_size <= MAX_PACKET_SIZE);

    let mut frame = Vec::with_capacity(MAC_HDR_SIZE + APP_HDR_SIZE + total_size);

    // MAC header.
    frame.push(DATA_FRAME_TYPE);
    frame.push(endpoint.direction.flags());
    frame.push(0); // byte 2, reserved
    frame.push(0); // byte 3, reserved
    frame.extend_from_slice(&peer); // bytes 4..9: destination
    frame.extend_from_slice(&endpoint.own_address); // bytes 10..15: source
    frame.extend_from_slice(&endpoint.bssid); // bytes 16..21: BSSID
    frame.push(0); // byte 22, reserved
    frame.push(0); // byte 23, reserved
    debug_assert_eq!(frame.len(), MAC_HDR_SIZE);

    // Application header.
    for count in &layout.count {
        frame.extend_from_slice(&count.to_le_bytes());
    }
    for data_type in &layout.data_type {
        frame.push(data_type.ordinal());
    }
    frame.extend_from_slice(&(total_size as u16).to_le_bytes());
    frame.extend_from_slice(&timestamp_ms.to_le_bytes());
    debug_assert_eq!(frame.len(), MAC_HDR_SIZE + APP_HDR_SIZE);

    frame.extend_from_slice(payload);
    frame
}

/// Parse a raw 802.11 data frame received by `role` (§4.4 steps 1-6).
pub fn parse_frame(role: Direction, raw: &[u8]) -> Result<ParsedFrame, CodecError> {
    if raw.len() < MAC_HDR_SIZE + APP_HDR_SIZE {
        return Err(CodecError::TooShort);
    }

    let frame_type = raw[0];
    let flags = raw[1];
    let expected = Direction::expected_for_receiver(role);
    if frame_type != DATA_FRAME_TYPE || flags != expected.flags() {
        return Err(CodecError::WrongFrameType);
    }

    // Destination matching against a specific station address is the
    // caller's job via `accepts_destination`; parsing itself only validates
    // frame shape and header fields.
    let mut offset = MAC_HDR_SIZE;
    let mut count = [0u32; NUM_CLASSES];
    for slot in count.iter_mut() {
        *slot = u32::from_le_bytes(raw[offset..offset + 4].try_into().unwrap());
        offset += 4;
    }

    let mut data_type = [DataType::Int8; NUM_CLASSES];
    for slot in data_type.iter_mut() {
        let ordinal = raw[offset];
        offset += 1;
        if ordinal > DataType::MAX_ORDINAL {
            return Err(CodecError::InvalidTypeTag);
        }
        *slot = DataType::from_ordinal(ordinal).unwrap();
    }

    let total_size = u16::from_le_bytes(raw[offset..offset + 2].try_into().unwrap());
    offset += 2;
    if total_size as usize > MAX_PACKET_SIZE {
        return Err(CodecError::TotalSizeTooLarge);
    }

    let timestamp_ms = u32::from_le_bytes(raw[offset..offset + 4].try_into().unwrap());
    offset += 4;
    debug_assert_eq!(offset, MAC_HDR_SIZE + APP_HDR_SIZE);

    // §4.4 step 5: recompute expected size and warn (not reject) on mismatch.
    let expected_size: usize = count.iter().zip(data_type.iter()).map(|(c, t)| *c as usize * t.width()).sum();
    if expected_size != total_size as usize {
        log::warn!("frame total_size ({total_size}) does not match sum of class runs ({expected_size})");
    }

    let available = &raw[offset..];
    let truncated = available.len() < total_size as usize;
    let payload_len = available.len().min(total_size as usize);
    let payload = available[..payload_len].to_vec();

    Ok(ParsedFrame {
        layout: ClassLayout { count, data_type },
        total_size,
        timestamp_ms,
        payload,
        truncated,
    })
}

/// Destination-matching rule (§4.4 step 3): accept only frames addressed to
/// `own_address` or to [`BROADCAST`].
pub fn accepts_destination(raw: &[u8], own_address: MacAddr) -> bool {
    if raw.len() < 10 {
        return false;
    }
    let destination: MacAddr = raw[4..10].try_into().unwrap();
    destination == own_address || destination == BROADCAST
}
