//! Daily JSON-lines archive of every emitted record.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::CrawlError;
use crate::task::Record;

/// Appends records to `{dir}/{YYYYMMDD}.jsonl`.
pub struct RecordArchive {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl RecordArchive {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub async fn write(&self, record: &Record) -> Result<(), CrawlError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let path = self.dir.join(format!("{}.jsonl", Utc::now().format("%Y%m%d")));
        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
