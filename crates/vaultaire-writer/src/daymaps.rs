//! Origin Day-Map Cache and Rollover
//!
//! Each origin persists two day maps in the pool, one per lane. Batchers
//! treat them as read-mostly snapshots: loaded before the first message
//! of a batch, dropped after every flush so the next batch re-reads them,
//! and never shared between batchers.
//!
//! A rollover appends one `(now, bucket_count)` entry to a lane's day-map
//! object when a bucket object outgrows the rollover threshold. Another
//! writer may have already rolled the same lane, so the map is re-read
//! under the check and the append is skipped when an epoch at or past the
//! flushed batch's start already exists.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use vaultaire_core::daymap::{self, DayMap};
use vaultaire_core::{label, Lane, Origin, Time};
use vaultaire_pool::Pool;

use crate::error::Result;

/// The two day maps of one origin.
#[derive(Debug, Clone)]
pub struct OriginDayMaps {
    pub simple: DayMap,
    pub extended: DayMap,
}

/// Nanoseconds since the UNIX epoch, the unit day maps are keyed in.
pub(crate) fn now_nanos() -> Time {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Load both of an origin's day maps, or `None` while either is missing:
/// an origin does not exist until both lanes have been provisioned.
pub async fn load(pool: &dyn Pool, origin: &Origin) -> Result<Option<OriginDayMaps>> {
    let simple = pool.read_full(&label::day_map_label(origin, Lane::Simple)).await?;
    let extended = pool
        .read_full(&label::day_map_label(origin, Lane::Extended))
        .await?;

    match (simple, extended) {
        (Some(simple), Some(extended)) => Ok(Some(OriginDayMaps {
            simple: DayMap::load(&simple)?,
            extended: DayMap::load(&extended)?,
        })),
        _ => Ok(None),
    }
}

/// Provision an origin: write initial day maps for both lanes starting at
/// epoch 0 with `no_buckets` lanes each. Used by deployment tooling and
/// the test suites.
pub async fn provision(pool: &dyn Pool, origin: &Origin, no_buckets: u64) -> Result<()> {
    for lane in [Lane::Simple, Lane::Extended] {
        let mut map = DayMap::new();
        map.insert(0, no_buckets);
        pool.write_full(&label::day_map_label(origin, lane), &map.encode())
            .await?;
    }
    info!(origin = %origin, no_buckets, "origin provisioned");
    Ok(())
}

/// Start a new bucket generation for one lane of an origin.
///
/// Idempotent against racing writers: skipped when the lane already has
/// an epoch at or past `not_before` (the flushed batch's start time).
/// The new generation keeps the latest bucket count, falling back to
/// `default_buckets` for a lane that has never been written.
pub async fn roll_over(
    pool: &dyn Pool,
    origin: &Origin,
    lane: Lane,
    not_before: Time,
    default_buckets: u64,
) -> Result<()> {
    let map_label = label::day_map_label(origin, lane);
    let current = match pool.read_full(&map_label).await? {
        Some(raw) => DayMap::load(&raw)?,
        None => DayMap::new(),
    };

    if let Some((latest, _)) = current.latest() {
        if latest >= not_before {
            debug!(
                origin = %origin,
                lane = lane.as_str(),
                latest,
                "day already rolled by another writer"
            );
            return Ok(());
        }
    }

    let no_buckets = current.latest().map(|(_, n)| n).unwrap_or(default_buckets);
    let epoch = now_nanos();
    pool.append(&map_label, &daymap::encode_entry(epoch, no_buckets))
        .await?;

    info!(
        origin = %origin,
        lane = lane.as_str(),
        epoch,
        no_buckets,
        "rolled day over"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultaire_pool::MemoryPool;

    fn pony() -> Origin {
        Origin::tidy("PONY")
    }

    #[tokio::test]
    async fn test_load_absent_origin_is_none() {
        let pool = MemoryPool::new();
        assert!(load(&pool, &pony()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_requires_both_lanes() {
        let pool = MemoryPool::new();
        let mut map = DayMap::new();
        map.insert(0, 8);
        pool.write_full(&label::day_map_label(&pony(), Lane::Simple), &map.encode())
            .await
            .unwrap();
        assert!(load(&pool, &pony()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provision_then_load() {
        let pool = MemoryPool::new();
        provision(&pool, &pony(), 16).await.unwrap();

        let maps = load(&pool, &pony()).await.unwrap().unwrap();
        assert_eq!(maps.simple.lookup(12345), Some((0, 16)));
        assert_eq!(maps.extended.lookup(12345), Some((0, 16)));
    }

    #[tokio::test]
    async fn test_roll_over_appends_new_epoch() {
        let pool = MemoryPool::new();
        provision(&pool, &pony(), 16).await.unwrap();

        roll_over(&pool, &pony(), Lane::Simple, now_nanos(), 128)
            .await
            .unwrap();

        let maps = load(&pool, &pony()).await.unwrap().unwrap();
        assert_eq!(maps.simple.len(), 2);
        // the new generation keeps the previous bucket count
        assert_eq!(maps.simple.latest().map(|(_, n)| n), Some(16));
        // the extended lane is untouched
        assert_eq!(maps.extended.len(), 1);
    }

    #[tokio::test]
    async fn test_roll_over_is_idempotent() {
        let pool = MemoryPool::new();
        provision(&pool, &pony(), 16).await.unwrap();

        let batch_start = now_nanos().saturating_sub(1_000_000);
        roll_over(&pool, &pony(), Lane::Simple, batch_start, 128)
            .await
            .unwrap();
        // a racing writer re-checking with the same batch start must not
        // add a third epoch
        roll_over(&pool, &pony(), Lane::Simple, batch_start, 128)
            .await
            .unwrap();

        let maps = load(&pool, &pony()).await.unwrap().unwrap();
        assert_eq!(maps.simple.len(), 2);
    }

    #[tokio::test]
    async fn test_roll_over_on_empty_map_uses_default() {
        let pool = MemoryPool::new();
        pool.write_full(&label::day_map_label(&pony(), Lane::Extended), &[])
            .await
            .unwrap();

        roll_over(&pool, &pony(), Lane::Extended, 0, 64).await.unwrap();

        let raw = pool
            .read_full(&label::day_map_label(&pony(), Lane::Extended))
            .await
            .unwrap()
            .unwrap();
        let map = DayMap::load(&raw).unwrap();
        assert_eq!(map.latest().map(|(_, n)| n), Some(64));
    }
}
