//! Writer Configuration
//!
//! Controls how batchers accumulate and flush:
//!
//! - **batch_period_ms**: how long a batch stays open before a tick
//!   flushes it (default: 4 seconds)
//! - **tick_interval_ms**: granularity of the per-batcher timer
//!   (default: 100 ms)
//! - **bucket_rollover_bytes**: bucket object size that triggers a day
//!   rollover (default: 4 MiB)
//! - **ingress_queue_depth**: bound of each batcher's input channel; a
//!   single slot keeps the dispatcher lock-stepped with slow batchers
//!   (default: 1)
//! - **default_buckets**: bucket count used when a rollover finds an
//!   empty day map (default: 128)
//!
//! ## Usage
//!
//! ```ignore
//! // Faster flushing for tests
//! let config = WriterConfig {
//!     batch_period_ms: 50,
//!     tick_interval_ms: 10,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Batch window in milliseconds before a flush is due (default: 4s)
    #[serde(default = "default_batch_period_ms")]
    pub batch_period_ms: u64,

    /// Tick generator interval in milliseconds (default: 100ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simple/extended bucket size that triggers a day rollover
    /// (default: 4 MiB)
    #[serde(default = "default_bucket_rollover_bytes")]
    pub bucket_rollover_bytes: u64,

    /// Bound of each batcher's input channel (default: 1)
    #[serde(default = "default_ingress_queue_depth")]
    pub ingress_queue_depth: usize,

    /// Bucket count for a rollover on an empty day map (default: 128)
    #[serde(default = "default_buckets")]
    pub default_buckets: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_period_ms: default_batch_period_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            bucket_rollover_bytes: default_bucket_rollover_bytes(),
            ingress_queue_depth: default_ingress_queue_depth(),
            default_buckets: default_buckets(),
        }
    }
}

impl WriterConfig {
    pub fn batch_period(&self) -> Duration {
        Duration::from_millis(self.batch_period_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_batch_period_ms() -> u64 {
    4_000
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_bucket_rollover_bytes() -> u64 {
    crate::flush::BUCKET_SIZE
}

fn default_ingress_queue_depth() -> usize {
    1
}

fn default_buckets() -> u64 {
    128
}
