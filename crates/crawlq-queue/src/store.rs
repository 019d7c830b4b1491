//! SQLite connection helpers shared by every on-disk store.

use std::path::Path;
use std::time::Duration;

use tokio_rusqlite::Connection;

/// Durability pragmas applied to every store.
///
/// `locking_mode = EXCLUSIVE` keeps the file lock for the lifetime of the
/// connection so a second opener of the same store fails fast.
const PRAGMAS: &str = r#"
PRAGMA locking_mode = EXCLUSIVE;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;
"#;

/// Open a SQLite file exclusively, creating parent directories as needed.
///
/// The write lock is acquired before returning, so the store cannot be
/// shared with another open handle in this or another process.
pub async fn open_exclusive(path: &Path) -> Result<Connection, tokio_rusqlite::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
    }

    let conn = Connection::open(path.to_path_buf()).await?;
    conn.call(|conn| {
        conn.busy_timeout(Duration::ZERO)?;
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;")?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

/// Close a connection, treating an already-closed one as success.
pub async fn close_quietly(conn: &Connection) -> Result<(), tokio_rusqlite::Error> {
    match conn.clone().close().await {
        Ok(()) | Err(tokio_rusqlite::Error::ConnectionClosed) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("store.db");

        let conn = open_exclusive(&path).await.unwrap();
        assert!(path.exists());
        close_quietly(&conn).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_open_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        let conn = open_exclusive(&path).await.unwrap();
        assert!(open_exclusive(&path).await.is_err());

        close_quietly(&conn).await.unwrap();
        let reopened = open_exclusive(&path).await.unwrap();
        close_quietly(&reopened).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_twice() {
        let dir = TempDir::new().unwrap();
        let conn = open_exclusive(&dir.path().join("store.db")).await.unwrap();
        close_quietly(&conn).await.unwrap();
        close_quietly(&conn).await.unwrap();
    }
}
