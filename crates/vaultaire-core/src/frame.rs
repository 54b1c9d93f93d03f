//! Vault Disk Records
//!
//! The contents-side bucket objects store a stream of framed records,
//! each a `VaultPrefix` followed by a protobuf-encoded [`VaultPoint`]:
//!
//! ```text
//! ┌───────────────────┬─────────────────────────┐
//! │ body length (u64) │ VaultPoint protobuf     │  × N
//! └───────────────────┴─────────────────────────┘
//! ```
//!
//! The same u64 little-endian prefix frames the raw payloads in the
//! internal store's extended objects, so the prefix helpers live here
//! for both users.
//!
//! Readers walk the stream until the buffer is exhausted. Points are
//! idempotent by timestamp, so a duplicate timestamp inside one object is
//! discarded and the first stored record wins.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;

use crate::error::{Error, Result};

/// Size of a vault record length prefix in bytes.
pub const VAULT_PREFIX_LEN: usize = 8;

/// One point as stored in a vault bucket object.
#[derive(Clone, PartialEq, Message)]
pub struct VaultPoint {
    #[prost(uint64, tag = "1")]
    pub address: u64,

    #[prost(uint64, tag = "2")]
    pub timestamp: u64,

    #[prost(uint64, tag = "3")]
    pub payload: u64,
}

/// Frame `body` with its length prefix into `buf`.
pub fn put_vault_prefix(buf: &mut BytesMut, body_len: usize) {
    buf.put_u64_le(body_len as u64);
}

/// Read a length prefix at `offset`, returning the body length.
pub fn read_vault_prefix(raw: &[u8], offset: usize) -> Result<u64> {
    if raw.len() < offset + VAULT_PREFIX_LEN {
        return Err(Error::Truncated {
            needed: offset + VAULT_PREFIX_LEN,
            have: raw.len(),
        });
    }
    Ok((&raw[offset..offset + VAULT_PREFIX_LEN]).get_u64_le())
}

/// Serialize points as a stream of prefixed records.
pub fn encode_vault_records(points: &[VaultPoint]) -> Bytes {
    let mut buf = BytesMut::new();
    for point in points {
        let body = point.encode_to_vec();
        put_vault_prefix(&mut buf, body.len());
        buf.put_slice(&body);
    }
    buf.freeze()
}

/// Parse a whole bucket object, dropping duplicate timestamps so the first
/// stored record wins.
pub fn read_vault_object(raw: &[u8]) -> Result<Vec<VaultPoint>> {
    let mut points: Vec<VaultPoint> = Vec::new();
    let mut offset = 0usize;

    while offset < raw.len() {
        let body_len = read_vault_prefix(raw, offset)? as usize;
        offset += VAULT_PREFIX_LEN;

        if body_len > raw.len() - offset {
            return Err(Error::Truncated {
                needed: offset + body_len,
                have: raw.len(),
            });
        }

        let point = VaultPoint::decode(&raw[offset..offset + body_len])?;
        offset += body_len;

        if !points.iter().any(|p| p.timestamp == point.timestamp) {
            points.push(point);
        }
    }

    Ok(points)
}
