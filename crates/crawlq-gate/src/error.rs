//! Gate errors.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Gate store is closed")]
    Closed,

    #[error("Timestamp outside the storable range: {0}")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<tokio_rusqlite::Error> for GateError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::ConnectionClosed => GateError::Closed,
            other => GateError::Database(other.to_string()),
        }
    }
}
