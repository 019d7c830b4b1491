//! First-seen-wins dedup set.

use std::path::{Path, PathBuf};

use crawlq_queue::store;
use rusqlite::params;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::GateError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS seen (key TEXT PRIMARY KEY);";

const DEDUP_FILE: &str = "dedup.db";

/// Persistent set of task fingerprints.
pub struct DedupStore {
    path: PathBuf,
    conn: Connection,
}

impl DedupStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = dir.as_ref().join(DEDUP_FILE);
        let conn = store::open_exclusive(&path).await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        debug!("Dedup store opened at {:?}", path);
        Ok(Self { path, conn })
    }

    /// Record `key` and report whether this call was the first to see it.
    ///
    /// Check and insert are one statement, so two racing callers can never
    /// both get `true`.
    pub async fn should_enqueue(&self, key: &str) -> Result<bool, GateError> {
        let key = key.to_string();
        let inserted = self
            .conn
            .call(move |conn| {
                let inserted =
                    conn.execute("INSERT OR IGNORE INTO seen (key) VALUES (?1)", params![key])?;
                Ok(inserted)
            })
            .await?;

        Ok(inserted == 1)
    }

    /// True if `key` has been recorded.
    pub async fn contains(&self, key: &str) -> Result<bool, GateError> {
        let key = key.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM seen WHERE key = ?1)",
                    params![key],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await?;

        Ok(found)
    }

    pub async fn len(&self) -> Result<u64, GateError> {
        let len = self
            .conn
            .call(|conn| {
                let len: i64 = conn.query_row("SELECT COUNT(*) FROM seen", [], |row| row.get(0))?;
                Ok(len)
            })
            .await?;

        Ok(len as u64)
    }

    pub async fn close(&self) -> Result<(), GateError> {
        store::close_quietly(&self.conn).await?;
        debug!("Dedup store closed at {:?}", self.path);
        Ok(())
    }
}
