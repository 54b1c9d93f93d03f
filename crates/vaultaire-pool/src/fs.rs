//! Filesystem Pool Backend
//!
//! One file per object under a root directory. Labels can contain bytes
//! that are unfriendly to filesystems (origins keep any printable ASCII,
//! including `/`), so names are percent-escaped on the way to disk and
//! unescaped when listing.
//!
//! Exclusive locks are lock files taken with `create_new`, which is
//! atomic on every platform tokio supports; contenders poll until the
//! holder's [`LockGuard`](crate::LockGuard) drops and removes the file.
//! A crashed process leaves its lock file behind — clearing those is an
//! operational task, the same as any stale lock object in a real pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::{LockGuard, Pool};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);
const LOCK_SUFFIX: &str = ".lock";

/// A [`Pool`](crate::Pool) storing each object as a file.
pub struct FsPool {
    root: PathBuf,
}

impl FsPool {
    /// Open a pool rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<FsPool> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "filesystem pool opened");
        Ok(FsPool { root })
    }

    fn object_path(&self, label: &str) -> PathBuf {
        self.root.join(escape(label))
    }
}

#[async_trait]
impl Pool for FsPool {
    async fn append(&self, label: &str, data: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.object_path(label))
            .await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn write_full(&self, label: &str, data: &[u8]) -> Result<u64> {
        tokio::fs::write(self.object_path(label), data).await?;
        Ok(data.len() as u64)
    }

    async fn stat(&self, label: &str) -> Result<Option<u64>> {
        match tokio::fs::metadata(self.object_path(label)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_full(&self, label: &str) -> Result<Option<Bytes>> {
        match tokio::fs::read(self.object_path(label)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(LOCK_SUFFIX) {
                continue;
            }
            let label = unescape(&name)?;
            if label.starts_with(prefix) {
                labels.push(label);
            }
        }
        labels.sort();
        Ok(labels)
    }

    async fn exclusive_lock(&self, label: &str) -> Result<LockGuard> {
        let path = self.root.join(format!("{}{}", escape(label), LOCK_SUFFIX));
        loop {
            match OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(LockGuard::new(FsLock { path })),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Removes the lock file when the guard drops.
struct FsLock {
    path: PathBuf,
}

impl Drop for FsLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

/// Escape a label into a safe file name. Alphanumerics and `_ - . :` pass
/// through; everything else becomes `%XX`.
fn escape(label: &str) -> String {
    let mut name = String::with_capacity(label.len());
    for byte in label.bytes() {
        match byte {
            b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'-' | b'.' | b':' => {
                name.push(byte as char)
            }
            _ => name.push_str(&format!("%{:02X}", byte)),
        }
    }
    name
}

fn unescape(name: &str) -> Result<String> {
    let raw = name.as_bytes();
    let mut label = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            if i + 3 > raw.len() {
                return Err(Error::BadLabel(name.to_string()));
            }
            let hex = std::str::from_utf8(&raw[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::BadLabel(name.to_string()))?;
            label.push(hex as char);
            i += 3;
        } else {
            label.push(raw[i] as char);
            i += 1;
        }
    }
    Ok(label)
}
