//! Seed tasks.
//!
//! Seeds live in `{conf_dir}/seeds.json` as an array of tasks. They are
//! enqueued once per data directory (guarded by `first.lock`) and, when a
//! reseed period is configured, again at every period under a fresh crawl
//! round name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use crawlq_gate::time_bucket;
use crawlq_queue::DurableQueue;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::CrawlError;
use crate::task::UrlTask;

const SEEDS_FILE: &str = "seeds.json";
const FIRST_LOCK: &str = "first.lock";

/// Loads seeds and pushes them to the crawl queue.
pub struct SeedLoader {
    seeds_file: PathBuf,
    lock_file: PathBuf,
}

impl SeedLoader {
    pub fn new(conf_dir: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Self {
        Self {
            seeds_file: conf_dir.as_ref().join(SEEDS_FILE),
            lock_file: data_dir.as_ref().join(FIRST_LOCK),
        }
    }

    /// Read and decode the seed file.
    pub async fn load(&self) -> Result<Vec<UrlTask>, CrawlError> {
        let content = tokio::fs::read(&self.seeds_file).await?;
        let seeds: Vec<UrlTask> = serde_json::from_slice(&content)?;
        Ok(seeds)
    }

    /// Enqueue every seed under the current crawl round. Returns the count.
    pub async fn seed(&self, queue: &DurableQueue) -> Result<usize, CrawlError> {
        let round = time_bucket(Utc::now());
        let seeds = self.load().await?;

        for mut seed in seeds.iter().cloned() {
            seed.task_name = round.clone();
            queue.enqueue(seed.to_payload()?).await?;
        }

        info!("Seeded {} task(s) for round {}", seeds.len(), round);
        Ok(seeds.len())
    }

    /// Seed only if this data directory has never been seeded.
    ///
    /// Returns `None` when the directory was already seeded.
    pub async fn seed_first_run(&self, queue: &DurableQueue) -> Result<Option<usize>, CrawlError> {
        if tokio::fs::try_exists(&self.lock_file).await? {
            return Ok(None);
        }

        let count = self.seed(queue).await?;
        if let Some(parent) = self.lock_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.lock_file, Utc::now().to_rfc3339()).await?;
        Ok(Some(count))
    }

    /// Reseed every `period` until cancelled.
    pub async fn run_periodic(&self, queue: &DurableQueue, period: Duration, token: CancellationToken) {
        info!("Reseeding every {:?}", period);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            if let Err(e) = self.seed(queue).await {
                error!("Periodic reseed failed: {}", e);
            }
        }
        info!("Reseed loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlq_queue::QueueConfig;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SeedLoader, DurableQueue) {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("conf");
        tokio::fs::create_dir_all(&conf).await.unwrap();
        tokio::fs::write(
            conf.join("seeds.json"),
            r#"[{"url":"https://a.test/","parser_name":"link_"},
                {"url":"https://b.test/feed","parser_name":"rss_","ext":{"lang":"en"}}]"#,
        )
        .await
        .unwrap();

        let data = dir.path().join("data");
        let queue = DurableQueue::open("crawl", &data, QueueConfig::default())
            .await
            .unwrap();
        (dir, SeedLoader::new(&conf, &data), queue)
    }

    #[tokio::test]
    async fn test_seed_stamps_round() {
        let (_dir, loader, queue) = setup().await;
        assert_eq!(loader.seed(&queue).await.unwrap(), 2);

        let first = queue.dequeue(0).await.unwrap().unwrap();
        let task = UrlTask::from_payload(&first.payload).unwrap();
        assert_eq!(task.url, "https://a.test/");
        assert_eq!(task.task_name.len(), 12);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_first_run_is_guarded() {
        let (_dir, loader, queue) = setup().await;
        assert_eq!(loader.seed_first_run(&queue).await.unwrap(), Some(2));
        assert_eq!(loader.seed_first_run(&queue).await.unwrap(), None);
        assert_eq!(queue.status().await.unwrap().queued, 2);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_seed_file_leaves_no_lock() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let queue = DurableQueue::open("crawl", &data, QueueConfig::default())
            .await
            .unwrap();
        let loader = SeedLoader::new(dir.path().join("missing"), &data);

        assert!(loader.seed_first_run(&queue).await.is_err());
        assert!(!data.join("first.lock").exists());
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_reseed_stops_on_cancel() {
        let (_dir, loader, queue) = setup().await;
        let token = CancellationToken::new();

        let stopper = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            stopper.cancel();
        });
        loader
            .run_periodic(&queue, Duration::from_millis(100), token)
            .await;

        let queued = queue.status().await.unwrap().queued;
        assert!(queued >= 2 && queued % 2 == 0);
        queue.close().await.unwrap();
    }
}
