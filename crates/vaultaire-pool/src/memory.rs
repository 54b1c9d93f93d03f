//! In-Memory Pool Backend
//!
//! Objects live in a process-local map. This is the backend the test
//! suites run against; it is also enough for a single-process deployment
//! where durability is delegated elsewhere.
//!
//! Locks are per-label `tokio::sync::Mutex`es handed out as owned guards,
//! so a [`LockGuard`](crate::LockGuard) can travel across `.await`s and
//! releases when dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::{LockGuard, Pool};

/// A [`Pool`](crate::Pool) holding every object in memory.
#[derive(Default)]
pub struct MemoryPool {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    /// Number of objects currently stored (for tests and monitoring).
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl Pool for MemoryPool {
    async fn append(&self, label: &str, data: &[u8]) -> Result<()> {
        let mut objects = self.objects.lock().await;
        objects
            .entry(label.to_string())
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    async fn write_full(&self, label: &str, data: &[u8]) -> Result<u64> {
        let mut objects = self.objects.lock().await;
        objects.insert(label.to_string(), data.to_vec());
        Ok(data.len() as u64)
    }

    async fn stat(&self, label: &str) -> Result<Option<u64>> {
        let objects = self.objects.lock().await;
        Ok(objects.get(label).map(|data| data.len() as u64))
    }

    async fn read_full(&self, label: &str) -> Result<Option<Bytes>> {
        let objects = self.objects.lock().await;
        Ok(objects.get(label).map(|data| Bytes::from(data.clone())))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().await;
        let mut labels: Vec<String> = objects
            .keys()
            .filter(|label| label.starts_with(prefix))
            .cloned()
            .collect();
        labels.sort();
        Ok(labels)
    }

    async fn exclusive_lock(&self, label: &str) -> Result<LockGuard> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(label.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(LockGuard::new(guard))
    }
}
