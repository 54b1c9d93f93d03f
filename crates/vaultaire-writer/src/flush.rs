//! Flush Writer
//!
//! Drains one origin's [`BatchState`] into the pool as a two-phase write,
//! all of it under the origin's exclusive write lock:
//!
//! 1. **Extended pre-stat + append.** Every extended buffer is appended
//!    to its bucket object after statting the object's current size (an
//!    absent object counts as zero). All buckets run concurrently; the
//!    pre-append sizes become the base offsets for phase 2.
//! 2. **Offset patching.** Every pending triple is resolved against its
//!    bucket's base offset and emitted as a 24-byte simple record,
//!    appended after any directly-accumulated simple records for the
//!    same bucket.
//! 3. **Simple write.** Every patched simple buffer is written with
//!    `write_full`, which also reports the post-write object size.
//! 4. **Acknowledge.** Every reply handle gets `Success`. Only then is
//!    the lock released, so a client that saw an ack can immediately read
//!    its points under the next lock holder.
//! 5. **Rollover.** If the largest observed bucket object outgrew the
//!    rollover threshold, the lane's day map gets a new generation.
//!
//! A store error in phase 1 or 3 aborts the flush before any ack: clients
//! time out and retry through the broker. The phases are not atomic with
//! each other; extended bytes whose simple write failed are unreferenced
//! garbage, harmless because readers only reach extended data through
//! simple-record offsets.

use std::collections::{HashMap, HashSet};

use futures::future;
use tracing::{debug, info};
use vaultaire_core::point::encode_simple_record;
use vaultaire_core::{label, Lane, Origin};
use vaultaire_pool::Pool;

use crate::batch::{BatchState, BucketKey};
use crate::config::WriterConfig;
use crate::daymaps::{self, now_nanos};
use crate::error::{Error, Result};
use crate::ingress::Reply;

/// Bucket object size that ends a bucket generation.
pub const BUCKET_SIZE: u64 = 4 * 1024 * 1024;

/// Write one batch out and acknowledge its messages.
pub async fn flush_batch(
    pool: &dyn Pool,
    origin: &Origin,
    state: BatchState,
    config: &WriterConfig,
) -> Result<()> {
    let flushed_at = now_nanos();
    let lock = pool
        .exclusive_lock(&label::write_lock_label(origin))
        .await?;

    // Phase 1: extended pre-stat + append, all buckets in flight.
    let extended_ops = state.extended.iter().map(|(&(epoch, bucket), buffer)| {
        let object = label::bucket_label(origin, bucket, epoch, Lane::Extended);
        async move {
            let base = pool.stat(&object).await?.unwrap_or(0);
            pool.append(&object, buffer).await?;
            debug!(
                origin = %origin,
                epoch,
                bucket,
                base,
                appended = buffer.len(),
                "extended bucket appended"
            );
            Ok::<_, Error>(((epoch, bucket), base, base + buffer.len() as u64))
        }
    });
    let extended_written = future::try_join_all(extended_ops).await?;

    let base_offsets: HashMap<BucketKey, u64> = extended_written
        .iter()
        .map(|&(key, base, _)| (key, base))
        .collect();
    let max_extended_size = extended_written
        .iter()
        .map(|&(_, _, size)| size)
        .max()
        .unwrap_or(0);

    // Phase 2: resolve pending triples into simple records. A bucket that
    // only saw extended points still produces a simple buffer here.
    let mut simple = state.simple;
    let buckets: HashSet<BucketKey> = simple
        .keys()
        .chain(state.pending.keys())
        .copied()
        .collect();

    for key in &buckets {
        if let Some(pending) = state.pending.get(key) {
            let base = *base_offsets.get(key).ok_or(Error::MissingBaseOffset {
                epoch: key.0,
                bucket: key.1,
            })?;
            let buffer = simple.entry(*key).or_default();
            for write in &pending.writes {
                buffer.extend_from_slice(&encode_simple_record(
                    write.address,
                    write.time,
                    base + write.local_offset,
                ));
            }
        }
    }

    // Phase 3: write every simple buffer, collecting post-write sizes.
    let simple_ops = simple.iter().map(|(&(epoch, bucket), buffer)| {
        let object = label::bucket_label(origin, bucket, epoch, Lane::Simple);
        async move {
            let size = pool.write_full(&object, buffer).await?;
            debug!(origin = %origin, epoch, bucket, size, "simple bucket written");
            Ok::<_, Error>(size)
        }
    });
    let simple_sizes = future::try_join_all(simple_ops).await?;
    let max_simple_size = simple_sizes.iter().copied().max().unwrap_or(0);

    // Phase 4: both writes are durable, acknowledge everything.
    let acked = state.replies.len();
    for reply in state.replies {
        reply.ack(Reply::Success);
    }

    drop(lock);

    info!(
        origin = %origin,
        messages = acked,
        simple_buckets = simple.len(),
        extended_buckets = base_offsets.len(),
        "batch flushed"
    );

    // Phase 5: end any bucket generation that outgrew its objects.
    if max_simple_size > config.bucket_rollover_bytes {
        daymaps::roll_over(pool, origin, Lane::Simple, flushed_at, config.default_buckets)
            .await?;
    }
    if max_extended_size > config.bucket_rollover_bytes {
        daymaps::roll_over(
            pool,
            origin,
            Lane::Extended,
            flushed_at,
            config.default_buckets,
        )
        .await?;
    }

    Ok(())
}
