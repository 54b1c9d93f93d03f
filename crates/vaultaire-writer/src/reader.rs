//! Bucket Read-Back
//!
//! The read side of the bucket formats the flush writer produces. Simple
//! buckets are streams of 24-byte records; a record whose address has the
//! extended bit set carries the byte offset of its payload inside the
//! bucket's extended object instead of an inline value.
//!
//! Points are idempotent by `(origin, source, timestamp)` and the first
//! stored record wins: a duplicate `(address, time)` later in the same
//! object is discarded while scanning forward.

use std::collections::HashSet;

use bytes::Bytes;
use vaultaire_core::point::{Point, PointPayload, POINT_HEADER_LEN};
use vaultaire_core::{label, Address, Epoch, Lane, Origin, Time};
use vaultaire_pool::Pool;

use crate::error::{Error, Result};

/// One record as stored in a simple bucket object; `word` is the inline
/// value for simple addresses and the extended-object offset for
/// extended ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleRecord {
    pub address: Address,
    pub time: Time,
    pub word: u64,
}

/// Parse a simple bucket object, discarding duplicate `(address, time)`
/// records so the first write wins.
pub fn parse_simple_bucket(raw: &[u8]) -> Result<Vec<SimpleRecord>> {
    if raw.len() % POINT_HEADER_LEN != 0 {
        return Err(Error::Codec(vaultaire_core::Error::Truncated {
            needed: raw.len().next_multiple_of(POINT_HEADER_LEN),
            have: raw.len(),
        }));
    }

    let mut seen: HashSet<(u64, Time)> = HashSet::new();
    let mut records = Vec::with_capacity(raw.len() / POINT_HEADER_LEN);
    for chunk in raw.chunks_exact(POINT_HEADER_LEN) {
        let mut word = [0u8; 8];
        word.copy_from_slice(&chunk[0..8]);
        let address = Address(u64::from_le_bytes(word));
        word.copy_from_slice(&chunk[8..16]);
        let time = u64::from_le_bytes(word);
        word.copy_from_slice(&chunk[16..24]);
        let value = u64::from_le_bytes(word);

        if seen.insert((address.0, time)) {
            records.push(SimpleRecord {
                address,
                time,
                word: value,
            });
        }
    }
    Ok(records)
}

/// Extract the length-prefixed payload at `offset` in an extended bucket
/// object.
pub fn extended_payload_at(raw: &[u8], offset: u64) -> Result<Bytes> {
    let start = usize::try_from(offset).map_err(|_| {
        Error::Codec(vaultaire_core::Error::OffsetOutOfRange {
            offset,
            len: raw.len(),
        })
    })?;
    if start.checked_add(8).map_or(true, |end| end > raw.len()) {
        return Err(Error::Codec(vaultaire_core::Error::OffsetOutOfRange {
            offset,
            len: raw.len(),
        }));
    }

    let mut word = [0u8; 8];
    word.copy_from_slice(&raw[start..start + 8]);
    let len = u64::from_le_bytes(word) as usize;
    let body = start + 8;
    if len > raw.len() - body {
        return Err(Error::Codec(vaultaire_core::Error::Truncated {
            needed: body + len,
            have: raw.len(),
        }));
    }
    Ok(Bytes::copy_from_slice(&raw[body..body + len]))
}

/// Read every point of one `(origin, epoch, bucket)`, joining extended
/// records to their out-of-band payloads.
pub async fn read_points(
    pool: &dyn Pool,
    origin: &Origin,
    epoch: Epoch,
    bucket: u64,
) -> Result<Vec<Point>> {
    let simple_object = pool
        .read_full(&label::bucket_label(origin, bucket, epoch, Lane::Simple))
        .await?
        .unwrap_or_default();
    let records = parse_simple_bucket(&simple_object)?;

    let extended_object = if records.iter().any(|r| r.address.is_extended()) {
        pool.read_full(&label::bucket_label(origin, bucket, epoch, Lane::Extended))
            .await?
            .unwrap_or_default()
    } else {
        Bytes::new()
    };

    let mut points = Vec::with_capacity(records.len());
    for record in records {
        let payload = if record.address.is_extended() {
            PointPayload::Extended(extended_payload_at(&extended_object, record.word)?)
        } else {
            PointPayload::Simple(record.word)
        };
        points.push(Point {
            address: record.address,
            time: record.time,
            payload,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};
    use vaultaire_core::point::encode_simple_record;

    #[test]
    fn test_parse_simple_bucket() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&encode_simple_record(Address(2), 10, 7));
        raw.extend_from_slice(&encode_simple_record(Address(4), 20, 8));
        let records = parse_simple_bucket(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, Address(2));
        assert_eq!(records[1].word, 8);
    }

    #[test]
    fn test_parse_simple_bucket_first_write_wins() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&encode_simple_record(Address(2), 10, 7));
        raw.extend_from_slice(&encode_simple_record(Address(2), 10, 99));
        raw.extend_from_slice(&encode_simple_record(Address(2), 11, 8));
        let records = parse_simple_bucket(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].word, 7);
    }

    #[test]
    fn test_parse_simple_bucket_keeps_same_time_other_address() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&encode_simple_record(Address(2), 10, 1));
        raw.extend_from_slice(&encode_simple_record(Address(4), 10, 2));
        assert_eq!(parse_simple_bucket(&raw).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_ragged_bucket_fails() {
        let raw = vec![0u8; 25];
        assert!(parse_simple_bucket(&raw).is_err());
    }

    #[test]
    fn test_extended_payload_at() {
        let mut raw = BytesMut::new();
        raw.put_slice(&[0xAB; 100]); // pre-existing garbage
        raw.put_u64_le(5);
        raw.put_slice(b"AAAAA");
        assert_eq!(&extended_payload_at(&raw, 100).unwrap()[..], b"AAAAA");
    }

    #[test]
    fn test_extended_payload_out_of_range() {
        assert!(extended_payload_at(b"short", 100).is_err());
    }

    #[test]
    fn test_extended_payload_truncated_body() {
        let mut raw = BytesMut::new();
        raw.put_u64_le(50);
        raw.put_slice(b"not fifty bytes");
        assert!(extended_payload_at(&raw, 0).is_err());
    }
}
