// src/storage/lock.rs

//! Sibling lock file guarding a log file.
//!
//! `<name>.lock` is created exclusively; whoever creates it owns the log until
//! the guard is dropped. Lock files older than [`STALE_AFTER`] are assumed to
//! belong to a crashed process and are removed.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::StoreError;

/// Default bound on waiting for the lock.
pub const LOCK_WAIT: Duration = Duration::from_secs(30);

/// Age after which an abandoned lock file is broken.
pub const STALE_AFTER: Duration = Duration::from_secs(60);

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Holds the lock for as long as it lives.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Lock `target`, waiting at most `wait`.
    pub async fn acquire(target: &Path, wait: Duration) -> Result<Self, StoreError> {
        let path = lock_path(target);
        let started = Instant::now();

        loop {
            let attempt = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match attempt {
                Ok(file) => return claim(path, file).await,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(&path).await {
                        log::warn!("Removing stale lock file {}", path.display());
                        match tokio::fs::remove_file(&path).await {
                            Ok(()) => continue,
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(StoreError::Io(e)),
                        }
                    }
                    if started.elapsed() >= wait {
                        return Err(StoreError::LockTimeout {
                            path,
                            waited_secs: wait.as_secs(),
                        });
                    }
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// Stamp a freshly created lock file with its owner. The guard exists before
/// the write, so a failed stamp still removes the file.
async fn claim<W>(path: PathBuf, mut file: W) -> Result<LockGuard, StoreError>
where
    W: AsyncWrite + Unpin,
{
    let guard = LockGuard { path };
    let owner = format!("{}\n{}\n", std::process::id(), Utc::now().to_rfc3339());
    file.write_all(owner.as_bytes()).await?;
    file.flush().await?;
    Ok(guard)
}

/// `<target>.lock` next to `target`.
pub fn lock_path(target: &Path) -> PathBuf {
    super::sibling(target, ".lock")
}

async fn is_stale(path: &Path) -> bool {
    let Ok(meta) = tokio::fs::metadata(path).await else {
        return false;
    };
    meta.modified()
        .ok()
        .and_then(|m| m.elapsed().ok())
        .is_some_and(|age| age > STALE_AFTER)
}
