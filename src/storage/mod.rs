// src/storage/mod.rs

//! File-backed deduplication state.
//!
//! One log file per feed kind, so warning and occurrence cycles never contend:
//!
//! ```text
//! /tmp/
//! ├── eqalert.log        # newline-delimited warning ids, newest first
//! ├── eqinfo.log         # JSON array of thread records
//! └── eqinfo.log.lock    # present only while a cycle holds the log
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place.

pub mod alert_log;
pub mod info_log;
pub mod lock;

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

pub use alert_log::AlertLog;
pub use info_log::InfoLog;
pub use lock::LockGuard;

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = sibling(path, ".tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// `<file_name><suffix>` next to `target`. Appending keeps logs that share a
/// stem (`eq.info`, `eq.alert`) from sharing a sibling.
pub(crate) fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    target.with_file_name(name)
}

/// Read a file as text, returning None if it doesn't exist.
async fn read_text(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StoreError::Format {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DedupRecord;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    #[test]
    fn test_sibling_keeps_extension() {
        assert_eq!(
            sibling(Path::new("/tmp/eq.info"), ".tmp"),
            PathBuf::from("/tmp/eq.info.tmp")
        );
        assert_ne!(
            sibling(Path::new("/tmp/eq.info"), ".tmp"),
            sibling(Path::new("/tmp/eq.alert"), ".tmp")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_logs_sharing_a_stem_stay_separate() {
        let dir = TempDir::new().unwrap();
        let info = InfoLog::new(dir.path().join("eq.info"));
        let alerts = AlertLog::new(dir.path().join("eq.alert"));

        let mut tasks = Vec::new();
        for n in 0..50 {
            let info = info.clone();
            let alerts = alerts.clone();
            tasks.push(tokio::spawn(async move {
                let record = DedupRecord {
                    ids: vec![format!("info-{n}")],
                    hypocentre: String::new(),
                    prefs: BTreeSet::from([format!("pref-{n}")]),
                    title: format!("thread {n}"),
                    url: format!("https://bbs.example/test/read.cgi/eq/{n}/"),
                    thread: n.to_string(),
                    date: "2024/01/01 16:10:00".into(),
                    report_time: "2024/01/01 16:10:00".into(),
                };
                info.append_record(record).await.unwrap();
                alerts.record_id(&format!("alert-{n}")).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(info.records().await.unwrap().len(), 50);
        let ids = alerts.ids().await.unwrap();
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| id.starts_with("alert-")));
    }
}
