//! In-flight lease store.
//!
//! Every leased payload is kept under a key that starts with its deadline,
//! formatted so that lexical order equals chronological order. Finding the
//! expired leases is then a single range scan from the start of the table.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::QueueError;
use crate::segment::Segment;
use crate::store;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS leases (
    key TEXT PRIMARY KEY,
    payload BLOB NOT NULL
);
"#;

/// File name of the lease store inside its directory.
pub const LEASE_FILE: &str = "leases.db";

/// Deadline format: fixed width, 24-hour, millisecond resolution, UTC.
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Expired leases moved per sweep batch.
const SWEEP_BATCH: usize = 256;

/// Opaque handle identifying one in-flight lease.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseKey(String);

impl LeaseKey {
    /// Build a key for a payload held until `deadline`.
    pub fn for_payload(deadline: DateTime<Utc>, payload: &[u8]) -> Self {
        Self(format!("{}:{}", stamp(deadline), content_hash(payload)))
    }

    /// The key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deadline encoded in the key, if it is well formed.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        let (prefix, _) = self.0.split_once(':')?;
        NaiveDateTime::parse_from_str(prefix, STAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}#{}", self.0, n))
    }
}

impl From<String> for LeaseKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for LeaseKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// The lease existed and has been released.
    Confirmed,
    /// No such lease: already confirmed, or expired and redelivered.
    NotFound,
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Confirmation::Confirmed)
    }
}

/// Persistent mapping from lease key to payload.
pub struct LeaseStore {
    path: PathBuf,
    conn: Connection,
}

impl LeaseStore {
    /// Open (or create) the lease store in `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = dir.as_ref().join(LEASE_FILE);
        let conn = store::open_exclusive(&path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        debug!("Lease store opened at {:?}", path);
        Ok(Self { path, conn })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `payload` as in flight until `deadline`.
    ///
    /// Identical payloads leased at the same instant get a `#n` suffix so
    /// neither overwrites the other.
    pub async fn hold(
        &self,
        deadline: DateTime<Utc>,
        payload: Vec<u8>,
    ) -> Result<LeaseKey, QueueError> {
        if payload.is_empty() {
            return Err(QueueError::EmptyPayload);
        }

        let base = LeaseKey::for_payload(deadline, &payload);
        let key = self
            .conn
            .call(move |conn| {
                let mut n = 0u32;
                loop {
                    let key = if n == 0 {
                        base.clone()
                    } else {
                        base.with_suffix(n)
                    };
                    let inserted = conn.execute(
                        "INSERT OR IGNORE INTO leases (key, payload) VALUES (?1, ?2)",
                        params![key.as_str(), payload],
                    )?;
                    if inserted == 1 {
                        return Ok(key);
                    }
                    n += 1;
                }
            })
            .await?;

        Ok(key)
    }

    /// Drop a lease. Releasing an unknown key reports `NotFound`.
    pub async fn release(&self, key: &LeaseKey) -> Result<Confirmation, QueueError> {
        let key = key.as_str().to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let removed = conn.execute("DELETE FROM leases WHERE key = ?1", params![key])?;
                Ok(removed)
            })
            .await?;

        Ok(if removed > 0 {
            Confirmation::Confirmed
        } else {
            Confirmation::NotFound
        })
    }

    /// Payload held under `key`, if the lease is still live.
    pub async fn get(&self, key: &LeaseKey) -> Result<Option<Vec<u8>>, QueueError> {
        let key = key.as_str().to_string();
        let payload = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT payload FROM leases WHERE key = ?1")?;
                let mut rows = stmt.query(params![key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await?;

        Ok(payload)
    }

    /// Up to `limit` leases whose deadline is at or before `now`, oldest first.
    pub async fn due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(LeaseKey, Vec<u8>)>, QueueError> {
        // ';' sorts right after ':', so this bound admits every key stamped <= now.
        let upper = format!("{};", stamp(now));
        let limit = limit as i64;

        let due = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key, payload FROM leases WHERE key < ?1 ORDER BY key LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![upper, limit], |row| {
                        Ok((LeaseKey(row.get(0)?), row.get::<_, Vec<u8>>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(due)
    }

    /// Move every lease expired at `now` into `retry`.
    ///
    /// Each payload is appended to `retry` before its lease is deleted, so a
    /// crash in between yields a duplicate rather than a loss.
    pub async fn sweep_due(&self, now: DateTime<Utc>, retry: &Segment) -> Result<usize, QueueError> {
        let mut swept = 0;

        loop {
            let batch = self.due(now, SWEEP_BATCH).await?;
            let batch_len = batch.len();

            for (key, payload) in batch {
                retry.append(payload).await?;
                if self.release(&key).await?.is_confirmed() {
                    debug!(lease = %key, "Lease expired, moved to retry");
                } else {
                    // Confirmed between the scan and the delete; the retry
                    // copy runs once more.
                    debug!(lease = %key, "Lease confirmed during sweep, retry copy is a duplicate");
                }
                swept += 1;
            }

            if batch_len < SWEEP_BATCH {
                break;
            }
        }

        Ok(swept)
    }

    /// Number of live leases.
    pub async fn len(&self) -> Result<u64, QueueError> {
        let len = self
            .conn
            .call(|conn| {
                let len: i64 = conn.query_row("SELECT COUNT(*) FROM leases", [], |row| row.get(0))?;
                Ok(len)
            })
            .await?;

        Ok(len as u64)
    }

    /// Flush and release the store. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), QueueError> {
        store::close_quietly(&self.conn).await?;
        debug!("Lease store closed at {:?}", self.path);
        Ok(())
    }
}

/// Fixed-width deadline stamp.
pub fn stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

fn content_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
