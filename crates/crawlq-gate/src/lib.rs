//! # crawlq Gate
//!
//! Admission checks applied before a derived task reaches the crawl queue:
//! a first-seen-wins dedup set and a per-URL freshness ledger.

pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod freshness;

use std::path::Path;

pub use dedup::DedupStore;
pub use error::GateError;
pub use fingerprint::{fingerprint, time_bucket};
pub use freshness::FreshnessStore;

const DEDUP_DIR: &str = "dedup";
const URL_DIR: &str = "url";

/// Dedup set and freshness ledger of one data directory.
pub struct Gate {
    pub dedup: DedupStore,
    pub freshness: FreshnessStore,
}

impl Gate {
    /// Open both stores under `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, GateError> {
        let data_dir = data_dir.as_ref();
        Ok(Self {
            dedup: DedupStore::open(data_dir.join(DEDUP_DIR)).await?,
            freshness: FreshnessStore::open(data_dir.join(URL_DIR)).await?,
        })
    }

    pub async fn close(&self) -> Result<(), GateError> {
        self.dedup.close().await?;
        self.freshness.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_gate_layout() {
        let dir = TempDir::new().unwrap();
        let gate = Gate::open(dir.path()).await.unwrap();

        assert!(dir.path().join("dedup").is_dir());
        assert!(dir.path().join("url").is_dir());
        gate.close().await.unwrap();
        gate.close().await.unwrap();
    }
}
