//! Vaultaire core wire types and framing codecs.
//!
//! Everything in this crate is pure: addresses, origins, source dicts,
//! point bursts, contents operations, day maps, vault disk records and
//! object labels. I/O against the pool lives in `vaultaire-pool`, the
//! write pipeline in `vaultaire-writer`.

pub mod contents;
pub mod daymap;
pub mod error;
pub mod frame;
pub mod label;
pub mod origin;
pub mod point;
pub mod sourcedict;
pub mod types;

pub use contents::ContentsOperation;
pub use daymap::DayMap;
pub use error::{Error, Result};
pub use frame::VaultPoint;
pub use label::Lane;
pub use origin::Origin;
pub use point::{Point, PointPayload};
pub use sourcedict::SourceDict;
pub use types::{Address, Epoch, Time, NANOSECONDS};
