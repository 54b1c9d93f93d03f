//! Codec Error Types
//!
//! This module defines all error types that can occur while framing or
//! parsing Vaultaire wire and disk formats.
//!
//! ## Error Categories
//!
//! ### Wire Errors
//! - `IllegalOpCode`: contents operation header is unknown or the frame
//!   length doesn't match the operation
//! - `Truncated`: a frame ended before the bytes its header promised
//! - `PointOverrun`: an extended point's inline payload runs past the end
//!   of the burst
//!
//! ### Disk Errors
//! - `CorruptDayMap`: a day-map object whose length is not a multiple of
//!   the 16-byte entry size
//! - `ProtoDecode`: a vault record's protobuf body failed to parse
//!
//! ### Data Errors
//! - `InvalidSourceDict`: a source dict that can't be canonicalized
//!
//! ## Usage
//!
//! All codecs return `Result<T>` which is aliased to `Result<T, Error>`,
//! so failures propagate with `?`. Decode errors never leave partially
//! parsed output behind.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Illegal op code")]
    IllegalOpCode,

    #[error("Truncated frame: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("Point stream overruns buffer at offset {0}")]
    PointOverrun(usize),

    #[error("Corrupt day map: {0} bytes is not a multiple of 16")]
    CorruptDayMap(usize),

    #[error("Invalid source dict: {0}")]
    InvalidSourceDict(String),

    #[error("Extended offset {offset} out of range for object of {len} bytes")]
    OffsetOutOfRange { offset: u64, len: usize },

    #[error("Vault record decode error: {0}")]
    ProtoDecode(#[from] prost::DecodeError),
}
