// src/storage/info_log.rs

//! Occurrence log: one JSON record per thread.
//!
//! ```json
//! [
//!   {
//!     "id": ["20240101161022"],
//!     "hypocentre": "石川県能登地方",
//!     "prefs": "石川県",
//!     "title": "【地震】石川県能登地方 震度7 M7.6",
//!     "url": "https://bbs.example/test/read.cgi/eq/1704093000/",
//!     "thread": "1704093000",
//!     "date": "2024/01/01 16:10:00",
//!     "reportdatetime": "2024-01-01T16:14:00+09:00"
//!   }
//! ]
//! ```
//!
//! Every operation holds the sibling lock for its whole read-modify-write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::models::{DedupRecord, SiteKey};
use crate::storage::lock::{LOCK_WAIT, LockGuard};
use crate::storage::{read_text, write_bytes};

/// Lock-protected JSON array of [`DedupRecord`]s.
#[derive(Debug, Clone)]
pub struct InfoLog {
    path: PathBuf,
    lock_wait: Duration,
}

impl InfoLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_wait: LOCK_WAIT,
        }
    }

    /// Use a different bound on waiting for the lock.
    pub fn with_lock_wait(self, lock_wait: Duration) -> Self {
        Self { lock_wait, ..self }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in file order.
    pub async fn records(&self) -> Result<Vec<DedupRecord>> {
        let _guard = self.lock().await?;
        Ok(self.load().await?)
    }

    /// Any record lists `id`.
    pub async fn has_seen_id(&self, id: &str) -> Result<bool> {
        let records = self.records().await?;
        Ok(records.iter().any(|r| r.has_id(id)))
    }

    /// A record lists `id` and was last written for the same report timestamp.
    pub async fn has_seen_report(&self, id: &str, report_time: &str) -> Result<bool> {
        let records = self.records().await?;
        Ok(records
            .iter()
            .any(|r| r.has_id(id) && r.report_time == report_time))
    }

    /// First record discussing the same site.
    pub async fn find_by_site_key(&self, key: &SiteKey) -> Result<Option<DedupRecord>> {
        if key.is_empty() {
            return Ok(None);
        }
        let records = self.records().await?;
        Ok(records.into_iter().find(|r| key.matches(r)))
    }

    pub async fn append_record(&self, record: DedupRecord) -> Result<()> {
        let _guard = self.lock().await?;
        let mut records = self.load().await?;
        records.push(record);
        self.save(&records).await?;
        Ok(())
    }

    /// Apply `mutate` to every record matching `pred`; returns how many changed.
    pub async fn update_records<P, M>(&self, pred: P, mut mutate: M) -> Result<usize>
    where
        P: Fn(&DedupRecord) -> bool,
        M: FnMut(&mut DedupRecord),
    {
        let _guard = self.lock().await?;
        let mut records = self.load().await?;
        let mut count = 0;
        for record in records.iter_mut().filter(|r| pred(r)) {
            mutate(record);
            count += 1;
        }
        if count > 0 {
            self.save(&records).await?;
        }
        Ok(count)
    }

    /// Drop every record matching `pred`; returns how many were removed.
    pub async fn remove_records<P>(&self, pred: P) -> Result<usize>
    where
        P: Fn(&DedupRecord) -> bool,
    {
        let _guard = self.lock().await?;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| !pred(r));
        let removed = before - records.len();
        if removed > 0 {
            self.save(&records).await?;
        }
        Ok(removed)
    }

    async fn lock(&self) -> std::result::Result<LockGuard, StoreError> {
        LockGuard::acquire(&self.path, self.lock_wait).await
    }

    async fn load(&self) -> std::result::Result<Vec<DedupRecord>, StoreError> {
        let Some(text) = read_text(&self.path).await? else {
            return Ok(Vec::new());
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    async fn save(&self, records: &[DedupRecord]) -> std::result::Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|e| StoreError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_bytes(&self.path, &bytes).await
    }
}
