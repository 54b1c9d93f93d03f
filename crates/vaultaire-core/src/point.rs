//! Point Burst Codec
//!
//! A burst is the payload of one writer ingress frame: a contiguous run of
//! point records with no count or framing around them.
//!
//! ## Record Layout
//!
//! Every record starts with a 24-byte little-endian header:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┐
//! │ address (8)  │ time (8)     │ payload (8)  │
//! └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! If the address has its extended bit set, `payload` is the byte length
//! of an inline blob that immediately follows the header; the next record
//! starts after it. Otherwise `payload` is the value itself and the next
//! record starts 24 bytes in.
//!
//! Decoding is all-or-nothing: any truncation or overrun fails the whole
//! burst and yields no points.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::{Address, Time};

/// Size of the fixed point header in bytes.
pub const POINT_HEADER_LEN: usize = 24;

/// One decoded point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub address: Address,
    pub time: Time,
    pub payload: PointPayload,
}

/// The payload word of a point: an inline value for simple addresses, an
/// out-of-band blob for extended ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointPayload {
    Simple(u64),
    Extended(Bytes),
}

impl Point {
    pub fn simple(address: u64, time: Time, value: u64) -> Point {
        Point {
            address: Address(address),
            time,
            payload: PointPayload::Simple(value),
        }
    }

    pub fn extended(address: u64, time: Time, blob: impl Into<Bytes>) -> Point {
        Point {
            address: Address(address),
            time,
            payload: PointPayload::Extended(blob.into()),
        }
    }
}

/// Encode a 24-byte simple-shaped record.
///
/// This is the exact shape stored in simple bucket objects, where the
/// third word is either the inline value or the resolved extended offset.
pub fn encode_simple_record(address: Address, time: Time, word: u64) -> [u8; 24] {
    let mut record = [0u8; 24];
    record[0..8].copy_from_slice(&address.0.to_le_bytes());
    record[8..16].copy_from_slice(&time.to_le_bytes());
    record[16..24].copy_from_slice(&word.to_le_bytes());
    record
}

/// Encode a burst of points into one contiguous payload.
pub fn encode_burst(points: &[Point]) -> Bytes {
    let mut buf = BytesMut::new();
    for point in points {
        match &point.payload {
            PointPayload::Simple(value) => {
                buf.put_slice(&encode_simple_record(point.address, point.time, *value));
            }
            PointPayload::Extended(blob) => {
                buf.put_slice(&encode_simple_record(
                    point.address,
                    point.time,
                    blob.len() as u64,
                ));
                buf.put_slice(blob);
            }
        }
    }
    buf.freeze()
}

/// Decode a whole burst, or fail without yielding any point.
pub fn decode_burst(data: &Bytes) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining < POINT_HEADER_LEN {
            return Err(Error::Truncated {
                needed: POINT_HEADER_LEN,
                have: remaining,
            });
        }

        let address = Address(read_u64(data, offset));
        let time = read_u64(data, offset + 8);
        let payload = read_u64(data, offset + 16);
        offset += POINT_HEADER_LEN;

        if address.is_extended() {
            let len = usize::try_from(payload).map_err(|_| Error::PointOverrun(offset))?;
            if len > data.len() - offset {
                return Err(Error::PointOverrun(offset));
            }
            points.push(Point {
                address,
                time,
                payload: PointPayload::Extended(data.slice(offset..offset + len)),
            });
            offset += len;
        } else {
            points.push(Point {
                address,
                time,
                payload: PointPayload::Simple(payload),
            });
        }
    }

    Ok(points)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(word)
}
