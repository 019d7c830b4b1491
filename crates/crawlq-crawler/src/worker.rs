//! Crawl workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crawlq_queue::{Delivery, QueueError};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CrawlerConfig;
use crate::pipeline::{Outcome, Pipeline};

/// What one iteration of the worker loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The crawl queue was empty.
    Idle,
    Processed(Outcome),
    /// Processing failed; the lease was left to expire.
    Failed,
    /// Leasing failed.
    QueueError,
    /// The crawl queue has been closed.
    Closed,
}

/// A single crawl worker.
pub struct Worker {
    id: usize,
    pipeline: Arc<Pipeline>,
    lease_secs: i64,
    idle_min: u64,
    idle_max: u64,
    error_backoff: Duration,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl Worker {
    pub fn new(id: usize, pipeline: Arc<Pipeline>, config: &CrawlerConfig, lease_secs: i64) -> Self {
        Self {
            id,
            pipeline,
            lease_secs,
            idle_min: config.idle_min_secs.min(config.idle_max_secs),
            idle_max: config.idle_max_secs.max(config.idle_min_secs),
            error_backoff: config.error_backoff(),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Tasks fully processed (confirmed, unproductive or dead-lettered).
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Tasks whose processing failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Lease and process at most one task.
    pub async fn step(&self) -> Step {
        match self.lease().await {
            Ok(delivery) => self.handle(delivery).await,
            Err(step) => step,
        }
    }

    async fn lease(&self) -> Result<Delivery, Step> {
        match self.pipeline.crawl_queue().dequeue(self.lease_secs).await {
            Ok(Some(delivery)) => Ok(delivery),
            Ok(None) => Err(Step::Idle),
            Err(QueueError::Closed) => Err(Step::Closed),
            Err(e) => {
                warn!("Worker {} failed to lease a task: {}", self.id, e);
                Err(Step::QueueError)
            }
        }
    }

    async fn handle(&self, delivery: Delivery) -> Step {
        match self.pipeline.process(delivery).await {
            Ok(outcome) => {
                self.processed.fetch_add(1, Ordering::SeqCst);
                Step::Processed(outcome)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                error!("Worker {} failed task: {}", self.id, e);
                Step::Failed
            }
        }
    }

    /// Run until `token` is cancelled or the crawl queue closes.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        info!("Worker {} started", self.id);

        while !token.is_cancelled() {
            // Leasing is never raced against cancellation: a take that
            // commits after its future is dropped would lose the payload.
            // Processing may be abandoned since the lease is already stored.
            let step = match self.lease().await {
                Ok(delivery) => tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Worker {} abandoning in-flight task", self.id);
                        break;
                    }
                    step = self.handle(delivery) => step,
                },
                Err(step) => step,
            };

            let pause = match step {
                Step::Idle => {
                    let secs = rand::thread_rng().gen_range(self.idle_min..=self.idle_max);
                    debug!("Crawl queue empty, worker {} sleeps {}s", self.id, secs);
                    Duration::from_secs(secs)
                }
                Step::QueueError => self.error_backoff,
                Step::Closed => break,
                Step::Processed(_) | Step::Failed => continue,
            };

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(
            "Worker {} stopped ({} processed, {} failed)",
            self.id,
            self.processed(),
            self.failed()
        );
    }
}

/// A fixed set of workers sharing one pipeline.
pub struct WorkerPool {
    workers: Vec<Arc<Worker>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.workers` workers.
    pub fn spawn(
        pipeline: Arc<Pipeline>,
        config: &CrawlerConfig,
        lease_secs: i64,
        token: CancellationToken,
    ) -> Self {
        let workers: Vec<Arc<Worker>> = (0..config.workers)
            .map(|id| Arc::new(Worker::new(id, Arc::clone(&pipeline), config, lease_secs)))
            .collect();

        let handles = workers
            .iter()
            .map(|worker| tokio::spawn(Arc::clone(worker).run(token.clone())))
            .collect();

        info!("Worker pool started with {} workers", workers.len());
        Self { workers, handles }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn total_processed(&self) -> u64 {
        self.workers.iter().map(|w| w.processed()).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.workers.iter().map(|w| w.failed()).sum()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task panicked: {}", e);
            }
        }
        info!(
            "Worker pool stopped ({} processed, {} failed)",
            self.workers.iter().map(|w| w.processed()).sum::<u64>(),
            self.workers.iter().map(|w| w.failed()).sum::<u64>()
        );
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
