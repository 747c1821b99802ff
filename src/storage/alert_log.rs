// src/storage/alert_log.rs

//! Warning log: posted warning ids, one per line, newest first.
//!
//! The seen-check reads without taking the lock. A concurrent writer can make
//! it miss an id that is being recorded at that moment; writes themselves are
//! serialized by the lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::storage::lock::{LOCK_WAIT, LockGuard};
use crate::storage::{read_text, write_bytes};

/// Newline-delimited list of warning ids.
#[derive(Debug, Clone)]
pub struct AlertLog {
    path: PathBuf,
    lock_wait: Duration,
}

impl AlertLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_wait: LOCK_WAIT,
        }
    }

    pub fn with_lock_wait(self, lock_wait: Duration) -> Self {
        Self { lock_wait, ..self }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlocked membership test.
    pub async fn has_seen_id(&self, id: &str) -> Result<bool> {
        let text = read_text(&self.path).await?.unwrap_or_default();
        Ok(text.lines().any(|line| line.trim() == id))
    }

    /// All ids, newest first.
    pub async fn ids(&self) -> Result<Vec<String>> {
        let text = read_text(&self.path).await?.unwrap_or_default();
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Prepend `id` unless it is already listed.
    pub async fn record_id(&self, id: &str) -> Result<()> {
        let _guard = LockGuard::acquire(&self.path, self.lock_wait).await?;
        let existing = read_text(&self.path).await?.unwrap_or_default();
        if existing.lines().any(|line| line.trim() == id) {
            return Ok(());
        }
        let mut content = String::with_capacity(id.len() + 1 + existing.len());
        content.push_str(id);
        content.push('\n');
        content.push_str(&existing);
        write_bytes(&self.path, content.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_prepends() {
        let dir = TempDir::new().unwrap();
        let log = AlertLog::new(dir.path().join("eqalert.log"));
        assert!(!log.has_seen_id("a").await.unwrap());

        log.record_id("a").await.unwrap();
        log.record_id("b").await.unwrap();
        log.record_id("a").await.unwrap();

        assert!(log.has_seen_id("a").await.unwrap());
        assert!(log.has_seen_id("b").await.unwrap());
        assert_eq!(log.ids().await.unwrap(), vec!["b", "a"]);
        assert!(!dir.path().join("eqalert.log.lock").exists());
    }

    #[tokio::test]
    async fn test_seen_check_ignores_lock() {
        let dir = TempDir::new().unwrap();
        let log = AlertLog::new(dir.path().join("eqalert.log"))
            .with_lock_wait(Duration::from_millis(50));
        tokio::fs::write(log.path(), "x\n").await.unwrap();

        let _held = LockGuard::acquire(log.path(), LOCK_WAIT).await.unwrap();
        assert!(log.has_seen_id("x").await.unwrap());
        assert!(log.record_id("y").await.is_err());
    }
}
