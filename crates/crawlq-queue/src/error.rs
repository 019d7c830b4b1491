//! Queue errors.

use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Payload was empty; the queue only carries non-empty items.
    #[error("Empty payload")]
    EmptyPayload,

    /// The queue (or one of its stores) has been closed.
    #[error("Queue is closed")]
    Closed,

    /// Persistent store failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem failure while preparing or dropping a queue directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error> for QueueError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::ConnectionClosed => QueueError::Closed,
            other => QueueError::Database(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        QueueError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_closed_maps_to_closed() {
        let err: QueueError = tokio_rusqlite::Error::ConnectionClosed.into();
        assert!(matches!(err, QueueError::Closed));
    }

    #[test]
    fn test_database_error_display() {
        let err = QueueError::Database("database is locked".to_string());
        assert_eq!(err.to_string(), "Database error: database is locked");
    }
}
