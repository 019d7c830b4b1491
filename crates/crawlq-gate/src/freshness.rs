//! Per-URL freshness ledger.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crawlq_queue::store;
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::GateError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS freshness (
    url TEXT PRIMARY KEY,
    ts_nanos INTEGER NOT NULL
);
"#;

const FRESHNESS_FILE: &str = "freshness.db";

/// Latest content time observed per URL.
pub struct FreshnessStore {
    path: PathBuf,
    conn: Connection,
}

impl FreshnessStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = dir.as_ref().join(FRESHNESS_FILE);
        let conn = store::open_exclusive(&path).await?;
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        debug!("Freshness store opened at {:?}", path);
        Ok(Self { path, conn })
    }

    /// Last observed time for `url`, if any.
    pub async fn last_seen(&self, url: &str) -> Result<Option<DateTime<Utc>>, GateError> {
        let url = url.to_string();
        let nanos = self
            .conn
            .call(move |conn| {
                let nanos: Option<i64> = conn
                    .query_row(
                        "SELECT ts_nanos FROM freshness WHERE url = ?1",
                        params![url],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(nanos)
            })
            .await?;

        Ok(nanos.map(DateTime::from_timestamp_nanos))
    }

    /// Record `at` for `url` if it is newer than what is stored.
    ///
    /// Returns true when the ledger moved forward. Older observations never
    /// overwrite newer ones. Times are compared at nanosecond resolution,
    /// which limits them to the years 1677 through 2262.
    pub async fn observe(&self, url: &str, at: DateTime<Utc>) -> Result<bool, GateError> {
        let url = url.to_string();
        let nanos = at
            .timestamp_nanos_opt()
            .ok_or(GateError::TimestampOutOfRange(at))?;
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO freshness (url, ts_nanos) VALUES (?1, ?2) \
                     ON CONFLICT(url) DO UPDATE SET ts_nanos = excluded.ts_nanos \
                     WHERE excluded.ts_nanos > freshness.ts_nanos",
                    params![url, nanos],
                )?;
                Ok(changed)
            })
            .await?;

        Ok(changed > 0)
    }

    pub async fn close(&self) -> Result<(), GateError> {
        store::close_quietly(&self.conn).await?;
        debug!("Freshness store closed at {:?}", self.path);
        Ok(())
    }
}
