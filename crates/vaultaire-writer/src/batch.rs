//! Batch State
//!
//! Everything one origin's batcher accumulates between flushes. The state
//! is pure data with pure transitions; the batcher feeds points in and
//! the flush writer drains it.
//!
//! ## Buffers
//!
//! Points land in per-`(epoch, bucket)` byte buffers:
//!
//! - `simple`: concatenated 24-byte records, written out verbatim.
//! - `extended`: concatenated `u64 len ‖ payload` frames, appended to the
//!   bucket's extended object at flush.
//! - `pending`: for every extended point, the `(address, time,
//!   local_offset)` triple that becomes its 24-byte simple record once
//!   the extended object's pre-append size is known. `local_offset` is
//!   the running sum of payload lengths before this point, so the first
//!   point of a batch resolves to exactly the pre-append size.
//!
//! Triples are kept in ingress order, so the resolved simple records land
//! on disk in the order the points arrived.
//!
//! Reply handles are collected per message and answered only after the
//! whole batch is durably written; a batch is all-or-nothing from the
//! client's side.

use std::collections::HashMap;
use std::time::Instant;

use bytes::{BufMut, BytesMut};
use vaultaire_core::point::encode_simple_record;
use vaultaire_core::{Address, Epoch, Time};

use crate::ingress::ReplyHandle;

/// A `(epoch, bucket)` pair naming one bucket object.
pub type BucketKey = (Epoch, u64);

/// One extended point waiting for its base offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub address: Address,
    pub time: Time,
    pub local_offset: u64,
}

/// Offset bookkeeping for one bucket's extended buffer.
#[derive(Debug, Default)]
pub struct PendingExtended {
    /// Sum of payload lengths accumulated so far.
    pub running_len: u64,
    /// Triples in ingress order.
    pub writes: Vec<PendingWrite>,
}

/// In-memory accumulation for one origin between flushes.
pub struct BatchState {
    pub replies: Vec<ReplyHandle>,
    pub simple: HashMap<BucketKey, BytesMut>,
    pub extended: HashMap<BucketKey, BytesMut>,
    pub pending: HashMap<BucketKey, PendingExtended>,
    pub start: Instant,
}

impl BatchState {
    pub fn new() -> BatchState {
        BatchState {
            replies: Vec::new(),
            simple: HashMap::new(),
            extended: HashMap::new(),
            pending: HashMap::new(),
            start: Instant::now(),
        }
    }

    /// Register a message's reply handle for acknowledgment at flush.
    pub fn push_reply(&mut self, reply: ReplyHandle) {
        self.replies.push(reply);
    }

    /// Append a simple point's 24-byte record to its bucket buffer.
    pub fn append_simple(&mut self, epoch: Epoch, bucket: u64, address: Address, time: Time, value: u64) {
        self.simple
            .entry((epoch, bucket))
            .or_default()
            .put_slice(&encode_simple_record(address, time, value));
    }

    /// Append an extended point: frame the payload into the extended
    /// buffer and queue the offset triple for flush-time patching.
    pub fn append_extended(
        &mut self,
        epoch: Epoch,
        bucket: u64,
        address: Address,
        time: Time,
        payload: &[u8],
    ) {
        let pending = self.pending.entry((epoch, bucket)).or_default();
        pending.writes.push(PendingWrite {
            address,
            time,
            local_offset: pending.running_len,
        });
        pending.running_len += payload.len() as u64;

        let buffer = self.extended.entry((epoch, bucket)).or_default();
        buffer.put_u64_le(payload.len() as u64);
        buffer.put_slice(payload);
    }

    /// Whether anything has been accumulated since the batch opened.
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty() && self.simple.is_empty() && self.extended.is_empty()
    }

    pub fn age(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}
