//! Writer Error Types
//!
//! ## Error Categories
//!
//! ### Per-message errors
//! Decode failures and unknown origins never surface here; the batcher
//! answers those with a `Failure` reply and keeps running.
//!
//! ### Flush errors
//! - `Pool`: the object store failed mid-flush. Fatal to the batch; no
//!   acknowledgments are sent and clients retry through the broker.
//! - `MissingBaseOffset`: a pending extended entry had no base offset
//!   from the pre-stat phase. This cannot happen unless the flush phases
//!   disagree about which buckets exist, so it is a programming error and
//!   fatal.
//! - `DayMapUnresolved`: a point was dispatched with a timestamp before
//!   the origin's first epoch.

use thiserror::Error;
use vaultaire_core::{Epoch, Origin, Time};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] vaultaire_core::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] vaultaire_pool::Error),

    #[error("No base offset recorded for epoch {epoch} bucket {bucket}")]
    MissingBaseOffset { epoch: Epoch, bucket: u64 },

    #[error("Origin {origin} has no epoch covering time {time}")]
    DayMapUnresolved { origin: Origin, time: Time },

    #[error("Writer is shut down")]
    Shutdown,
}
