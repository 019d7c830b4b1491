//! Node assembly: opens every store once and wires workers, reseeding and the API.

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crawlq_api::{ApiServer, ApiState};
use crawlq_config::Config;
use crawlq_crawler::{HttpFetcher, ParserRegistry, Pipeline, RecordArchive, SeedLoader, WorkerPool};
use crawlq_gate::Gate;
use crawlq_queue::{DurableQueue, Segment};

const DEAD_LETTER_DIR: &str = "dead_letter";
const ARCHIVE_DIR: &str = "fs";

pub(crate) struct Node {
    config: Config,
    crawl: Arc<DurableQueue>,
    store: Arc<DurableQueue>,
    gate: Arc<Gate>,
    dead_letter: Arc<Segment>,
}

impl Node {
    /// Open the crawl and store queues, the gate and the dead-letter segment.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let data_dir = &config.storage.data_dir;
        info!("Opening data directory {}", data_dir.display());

        let crawl = DurableQueue::open(&config.storage.crawl_queue, data_dir, config.queue.clone())
            .await
            .with_context(|| format!("opening queue '{}'", config.storage.crawl_queue))?;
        let store = DurableQueue::open(&config.storage.store_queue, data_dir, config.queue.clone())
            .await
            .with_context(|| format!("opening queue '{}'", config.storage.store_queue))?;
        let gate = Gate::open(data_dir).await.context("opening dedup and freshness stores")?;
        let dead_letter = Segment::open(data_dir.join(DEAD_LETTER_DIR))
            .await
            .context("opening dead-letter segment")?;

        Ok(Self {
            config,
            crawl: Arc::new(crawl),
            store: Arc::new(store),
            gate: Arc::new(gate),
            dead_letter: Arc::new(dead_letter),
        })
    }

    /// Counts for both queues and the dead-letter segment.
    pub async fn status(&self) -> anyhow::Result<serde_json::Value> {
        Ok(json!({
            "crawl": self.crawl.status().await?,
            "store": self.store.status().await?,
            "dead_letter": self.dead_letter.len().await?,
            "seen": self.gate.dedup.len().await?,
        }))
    }

    /// `status` rendered for the terminal.
    pub async fn status_report(&self) -> anyhow::Result<String> {
        let status = self.status().await?;
        Ok(serde_json::to_string_pretty(&status)?)
    }

    /// Seed the crawl queue once, regardless of the first-run marker.
    pub async fn seed(&self) -> anyhow::Result<usize> {
        let seeds = SeedLoader::new(&self.config.crawler.conf_dir, &self.config.storage.data_dir);
        Ok(seeds.seed(&self.crawl).await?)
    }

    /// Run until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        let config = &self.config;
        let seeds = SeedLoader::new(&config.crawler.conf_dir, &config.storage.data_dir);
        match seeds.seed_first_run(&self.crawl).await {
            Ok(Some(count)) => info!("Seeded {} tasks on first run", count),
            Ok(None) => debug!("Data directory already seeded"),
            Err(e) => warn!("Seeding failed: {}", e),
        }

        let fetcher = Arc::new(HttpFetcher::new(&config.crawler.fetch)?);
        let parsers = Arc::new(ParserRegistry::new(&config.crawler.conf_dir));
        let mut pipeline = Pipeline::new(
            Arc::clone(&self.crawl),
            Arc::clone(&self.store),
            Arc::clone(&self.gate),
            fetcher,
            parsers,
            Arc::clone(&self.dead_letter),
        );
        if config.crawler.archive {
            let archive = RecordArchive::open(config.storage.data_dir.join(ARCHIVE_DIR)).await?;
            pipeline = pipeline.with_archive(Arc::new(archive));
        }

        let pool = WorkerPool::spawn(
            Arc::new(pipeline),
            &config.crawler,
            config.queue.lease_timeout_secs,
            token.clone(),
        );

        let reseed: Option<JoinHandle<()>> = config.crawler.reseed_period().map(|period| {
            let crawl = Arc::clone(&self.crawl);
            let token = token.clone();
            tokio::spawn(async move { seeds.run_periodic(&crawl, period, token).await })
        });

        let api: Option<JoinHandle<()>> = config.api.enabled.then(|| {
            let state = Arc::new(ApiState::new(
                Arc::clone(&self.crawl),
                Arc::clone(&self.store),
                Arc::clone(&self.gate),
            ));
            let server = ApiServer::new(config.api.clone(), state);
            let token = token.clone();
            tokio::spawn(async move {
                if let Err(e) = server.run(token.clone()).await {
                    error!("API server failed: {}", e);
                    token.cancel();
                }
            })
        });

        info!("crawlq node running");
        token.cancelled().await;
        info!("Shutting down");

        pool.join().await;
        for handle in [reseed, api].into_iter().flatten() {
            if let Err(e) = handle.await {
                error!("Background task panicked: {}", e);
            }
        }
        Ok(())
    }

    /// Close every store; errors are logged, not returned.
    pub async fn close(&self) {
        if let Err(e) = self.crawl.close().await {
            warn!("Failed to close crawl queue: {}", e);
        }
        if let Err(e) = self.store.close().await {
            warn!("Failed to close store queue: {}", e);
        }
        if let Err(e) = self.gate.close().await {
            warn!("Failed to close gate: {}", e);
        }
        if let Err(e) = self.dead_letter.close().await {
            warn!("Failed to close dead-letter segment: {}", e);
        }
    }
}
