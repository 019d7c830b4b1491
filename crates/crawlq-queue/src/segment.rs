//! Durable FIFO segment.
//!
//! A segment is an append-only sequence of opaque payloads with a persisted
//! read cursor. Appends and takes are single transactions, so after a crash
//! every committed append is still readable and every committed take stays
//! consumed.

use std::path::{Path, PathBuf};

use rusqlite::{Transaction, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::QueueError;
use crate::store;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    seq INTEGER PRIMARY KEY,
    payload BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS cursor (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO cursor (name, value) VALUES ('head', 0);
INSERT OR IGNORE INTO cursor (name, value) VALUES ('tail', 0);
"#;

/// File name of a segment inside its directory.
pub const SEGMENT_FILE: &str = "segment.db";

/// Durable FIFO of opaque payloads.
pub struct Segment {
    path: PathBuf,
    conn: Connection,
}

impl Segment {
    /// Open (or create) a segment stored in `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = dir.as_ref().join(SEGMENT_FILE);
        let conn = store::open_exclusive(&path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        debug!("Segment opened at {:?}", path);
        Ok(Self { path, conn })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a payload at the tail. Returns its sequence number.
    pub async fn append(&self, payload: Vec<u8>) -> Result<u64, QueueError> {
        let seq = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let (_, tail) = read_cursor(&tx)?;
                tx.execute(
                    "INSERT INTO items (seq, payload) VALUES (?1, ?2)",
                    params![tail, payload],
                )?;
                tx.execute(
                    "UPDATE cursor SET value = ?1 WHERE name = 'tail'",
                    params![tail + 1],
                )?;
                tx.commit()?;
                Ok(tail)
            })
            .await?;

        Ok(seq as u64)
    }

    /// Remove and return the payload at the head, if any.
    pub async fn take(&self) -> Result<Option<Vec<u8>>, QueueError> {
        let payload = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let (head, tail) = read_cursor(&tx)?;
                if head >= tail {
                    return Ok(None);
                }

                let payload: Vec<u8> = tx.query_row(
                    "SELECT payload FROM items WHERE seq = ?1",
                    params![head],
                    |row| row.get(0),
                )?;
                tx.execute("DELETE FROM items WHERE seq = ?1", params![head])?;
                tx.execute(
                    "UPDATE cursor SET value = ?1 WHERE name = 'head'",
                    params![head + 1],
                )?;
                tx.commit()?;
                Ok(Some(payload))
            })
            .await?;

        Ok(payload)
    }

    /// Return the payload at the head without consuming it.
    pub async fn peek(&self) -> Result<Option<Vec<u8>>, QueueError> {
        let payload = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let (head, tail) = read_cursor(&tx)?;
                if head >= tail {
                    return Ok(None);
                }
                let payload: Vec<u8> = tx.query_row(
                    "SELECT payload FROM items WHERE seq = ?1",
                    params![head],
                    |row| row.get(0),
                )?;
                Ok(Some(payload))
            })
            .await?;

        Ok(payload)
    }

    /// Number of unconsumed payloads.
    pub async fn len(&self) -> Result<u64, QueueError> {
        let len = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                let (head, tail) = read_cursor(&tx)?;
                Ok((tail - head).max(0))
            })
            .await?;

        Ok(len as u64)
    }

    /// True when nothing is left to take.
    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.len().await? == 0)
    }

    /// Flush and release the segment. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), QueueError> {
        store::close_quietly(&self.conn).await?;
        debug!("Segment closed at {:?}", self.path);
        Ok(())
    }
}

fn read_cursor(tx: &Transaction<'_>) -> rusqlite::Result<(i64, i64)> {
    tx.query_row(
        "SELECT (SELECT value FROM cursor WHERE name = 'head'), \
                (SELECT value FROM cursor WHERE name = 'tail')",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
