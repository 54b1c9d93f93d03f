//! Day Maps
//!
//! A day map is the ordered `epoch -> bucket count` table that tells the
//! writer which bucket generation a point's timestamp falls in. Each
//! origin keeps two, one for the simple side and one for the extended
//! side, persisted as an object of 16-byte little-endian records:
//!
//! ```text
//! ┌──────────────┬──────────────────┐
//! │ epoch (8)    │ no_buckets (8)   │  × N
//! └──────────────┴──────────────────┘
//! ```
//!
//! Rolling a day over appends one record; resolution finds the greatest
//! epoch at or below the queried time. A time before the first epoch has
//! no generation and resolves to `None`.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::{Epoch, Time};

/// Size of one persisted day-map record in bytes.
pub const DAY_MAP_ENTRY_LEN: usize = 16;

/// Ordered `epoch -> bucket count` table for one origin lane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayMap {
    days: BTreeMap<Epoch, u64>,
}

impl DayMap {
    pub fn new() -> DayMap {
        DayMap::default()
    }

    /// Parse a persisted day-map object.
    pub fn load(raw: &[u8]) -> Result<DayMap> {
        if raw.len() % DAY_MAP_ENTRY_LEN != 0 {
            return Err(Error::CorruptDayMap(raw.len()));
        }

        let mut days = BTreeMap::new();
        for entry in raw.chunks_exact(DAY_MAP_ENTRY_LEN) {
            let mut word = [0u8; 8];
            word.copy_from_slice(&entry[0..8]);
            let epoch = u64::from_le_bytes(word);
            word.copy_from_slice(&entry[8..16]);
            let no_buckets = u64::from_le_bytes(word);
            days.insert(epoch, no_buckets);
        }
        Ok(DayMap { days })
    }

    /// Serialize the whole map in epoch order.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.days.len() * DAY_MAP_ENTRY_LEN);
        for (&epoch, &no_buckets) in &self.days {
            buf.put_slice(&encode_entry(epoch, no_buckets));
        }
        buf.freeze()
    }

    /// Resolve `t` to the generation it falls in: the entry with the
    /// greatest epoch ≤ `t`, or `None` for an empty map or a time before
    /// the first epoch.
    pub fn lookup(&self, t: Time) -> Option<(Epoch, u64)> {
        self.days
            .range(..=t)
            .next_back()
            .map(|(&epoch, &no_buckets)| (epoch, no_buckets))
    }

    pub fn insert(&mut self, epoch: Epoch, no_buckets: u64) {
        self.days.insert(epoch, no_buckets);
    }

    /// The newest generation, if any.
    pub fn latest(&self) -> Option<(Epoch, u64)> {
        self.days
            .iter()
            .next_back()
            .map(|(&epoch, &no_buckets)| (epoch, no_buckets))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}

/// One 16-byte record, ready to append to a day-map object.
pub fn encode_entry(epoch: Epoch, no_buckets: u64) -> [u8; DAY_MAP_ENTRY_LEN] {
    let mut entry = [0u8; DAY_MAP_ENTRY_LEN];
    entry[0..8].copy_from_slice(&epoch.to_le_bytes());
    entry[8..16].copy_from_slice(&no_buckets.to_le_bytes());
    entry
}
