//! Object Labels
//!
//! Deterministic names for everything the store keeps in the object pool.
//! All labels are prefixed with the layout version tag and the origin, so
//! one pool can hold many origins and a layout bump can coexist with old
//! data. Numeric fields are zero-padded to 20 digits, wide enough for any
//! u64, which keeps labels fixed-width and lexically sortable.

use crate::origin::Origin;
use crate::types::{Address, Epoch, Time, NANOSECONDS};

/// On-disk layout version tag.
pub const VERSION_TAG: &str = "02";

/// Which side of an origin's namespace an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Simple,
    Extended,
}

impl Lane {
    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Simple => "simple",
            Lane::Extended => "extended",
        }
    }
}

/// Label of a point bucket object.
pub fn bucket_label(origin: &Origin, bucket: u64, epoch: Epoch, lane: Lane) -> String {
    format!(
        "{}_{}_{:020}_{:020}_{}",
        VERSION_TAG,
        origin,
        bucket,
        epoch,
        lane.as_str()
    )
}

/// Label of the per-origin flush lock object.
pub fn write_lock_label(origin: &Origin) -> String {
    format!("{}_{}_write_lock", VERSION_TAG, origin)
}

/// Label of an internal-store object for a bookkeeping address.
pub fn internal_label(origin: &Origin, address: Address, lane: Lane) -> String {
    format!(
        "{}_{}_INTERNAL_{:020}_{:020}_{}",
        VERSION_TAG,
        origin,
        address.0,
        0,
        lane.as_str()
    )
}

/// Prefix shared by every internal-store object of an origin.
pub fn internal_prefix(origin: &Origin) -> String {
    format!("{}_{}_INTERNAL_", VERSION_TAG, origin)
}

/// Label of the day-map object for one lane of an origin.
pub fn day_map_label(origin: &Origin, lane: Lane) -> String {
    format!("{}_{}_{}_days", VERSION_TAG, origin, lane.as_str())
}

/// Label of a contents-hash bucket: the source's hash identity plus the
/// window-aligned time, `window` in seconds.
pub fn hash_label(origin: &Origin, source_hash: &str, t: Time, window: u64) -> String {
    let aligned = (t / (window * NANOSECONDS)) * window;
    format!("{}_{}_{}_{}", VERSION_TAG, origin, source_hash, aligned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pony() -> Origin {
        Origin::tidy("PONY")
    }

    #[test]
    fn test_bucket_label() {
        assert_eq!(
            bucket_label(&pony(), 7, 1_405_945_500_000_000_000, Lane::Simple),
            "02_PONY::::::_00000000000000000007_01405945500000000000_simple"
        );
    }

    #[test]
    fn test_extended_bucket_label_suffix() {
        let label = bucket_label(&pony(), 0, 0, Lane::Extended);
        assert!(label.ends_with("_extended"));
    }

    #[test]
    fn test_write_lock_label() {
        assert_eq!(write_lock_label(&pony()), "02_PONY::::::_write_lock");
    }

    #[test]
    fn test_internal_label() {
        assert_eq!(
            internal_label(&pony(), Address(4), Lane::Simple),
            "02_PONY::::::_INTERNAL_00000000000000000004_00000000000000000000_simple"
        );
    }

    #[test]
    fn test_internal_labels_share_origin_prefix() {
        let label = internal_label(&pony(), Address(128), Lane::Extended);
        assert!(label.starts_with(&internal_prefix(&pony())));
    }

    #[test]
    fn test_day_map_labels() {
        assert_eq!(day_map_label(&pony(), Lane::Simple), "02_PONY::::::_simple_days");
        assert_eq!(
            day_map_label(&pony(), Lane::Extended),
            "02_PONY::::::_extended_days"
        );
    }

    #[test]
    fn test_hash_label_window_alignment() {
        // 1405945503s into the epoch, 10s window: aligned down to 1405945500
        let t = 1_405_945_503_000_000_000;
        let label = hash_label(&pony(), "DWuREaQyy1R92fxC6JLepNXavWY", t, 10);
        assert_eq!(
            label,
            "02_PONY::::::_DWuREaQyy1R92fxC6JLepNXavWY_1405945500"
        );
    }

    #[test]
    fn test_bucket_labels_are_collision_free() {
        let a = bucket_label(&pony(), 1, 2, Lane::Simple);
        let b = bucket_label(&pony(), 2, 1, Lane::Simple);
        assert_ne!(a, b);
    }
}
