//! Vaultaire Object Pool
//!
//! This crate defines the object-store surface the write pipeline runs
//! against: a flat label -> blob namespace with appends, whole-object
//! writes, stats and advisory exclusive locks.
//!
//! ## The Surface
//!
//! The [`Pool`] trait is deliberately small. The flush protocol needs
//! exactly:
//!
//! - `append`: grow an object in place (extended buckets, day maps)
//! - `write_full`: replace an object and learn its resulting size in the
//!   same operation (simple buckets)
//! - `stat` / `read_full`: probe and fetch, with absence as `None`
//! - `list`: enumerate labels under a prefix (internal store)
//! - `exclusive_lock`: serialize flushes for one origin across writers
//!
//! ## Backends
//!
//! - [`MemoryPool`]: objects in a process-local map. Used by the test
//!   suites and useful for single-process deployments.
//! - [`FsPool`]: one file per object under a root directory, with lock
//!   files for the exclusive locks.
//!
//! ## Locking
//!
//! `exclusive_lock` returns a [`LockGuard`] that releases on drop, so the
//! lock is released even if the critical section unwinds. Locks are
//! advisory: nothing stops a caller writing an object it did not lock.
//!
//! ## Example
//!
//! ```ignore
//! let pool: Arc<dyn Pool> = Arc::new(MemoryPool::new());
//!
//! let _lock = pool.exclusive_lock("02_PONY::::::_write_lock").await?;
//! pool.append("02_PONY::::::_..._extended", &payload).await?;
//! let size = pool.write_full("02_PONY::::::_..._simple", &records).await?;
//! ```

pub mod error;
pub mod fs;
pub mod memory;

pub use error::{Error, Result};
pub use fs::FsPool;
pub use memory::MemoryPool;

use async_trait::async_trait;
use bytes::Bytes;

/// Held for the lifetime of an exclusive lock; dropping it releases the
/// lock, including on unwind.
pub struct LockGuard {
    _inner: Box<dyn std::any::Any + Send>,
}

impl LockGuard {
    pub fn new(inner: impl std::any::Any + Send) -> LockGuard {
        LockGuard {
            _inner: Box::new(inner),
        }
    }
}

/// A flat label -> blob object store.
///
/// All implementations must be `Send + Sync` so they can be shared across
/// batcher tasks as `Arc<dyn Pool>`. Operations are fail-fast: any error
/// other than absence aborts the caller's current unit of work.
#[async_trait]
pub trait Pool: Send + Sync {
    /// Append `data` to the object, creating it if absent.
    async fn append(&self, label: &str, data: &[u8]) -> Result<()>;

    /// Replace the object's contents and return its resulting size.
    async fn write_full(&self, label: &str, data: &[u8]) -> Result<u64>;

    /// Size of the object, or `None` if it does not exist.
    async fn stat(&self, label: &str) -> Result<Option<u64>>;

    /// Full contents of the object, or `None` if it does not exist.
    async fn read_full(&self, label: &str) -> Result<Option<Bytes>>;

    /// All labels starting with `prefix`, in lexical order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Take the named advisory lock, waiting until it is free.
    async fn exclusive_lock(&self, label: &str) -> Result<LockGuard>;
}
