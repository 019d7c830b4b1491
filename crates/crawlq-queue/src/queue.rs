//! Durable queue engine.
//!
//! A queue owns a primary segment, a retry segment and a lease store.
//! `dequeue` with a positive timeout moves the payload into the lease store;
//! the payload is then either confirmed by its consumer or swept back into
//! the retry segment once the deadline passes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::lease::{Confirmation, LeaseKey, LeaseStore};
use crate::segment::Segment;
use crate::sweep::Sweeper;

const PRIMARY_DIR: &str = "queue";
const RETRY_DIR: &str = "retry_queue";
const RUNNING_DIR: &str = "running";

/// Upper bound on a lease, keeps deadline arithmetic in range.
const MAX_LEASE_SECS: i64 = 10 * 365 * 24 * 3600;

/// A payload handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Lease handle; `None` when dequeued without a lease.
    pub lease: Option<LeaseKey>,
    /// True when the payload came from the retry segment.
    pub redelivered: bool,
}

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub name: String,
    pub queued: u64,
    pub retrying: u64,
    pub leased: u64,
}

impl QueueStatus {
    /// Total payloads held by the queue, leased or not.
    pub fn total(&self) -> u64 {
        self.queued + self.retrying + self.leased
    }
}

/// Named, durable, lease-based FIFO queue.
pub struct DurableQueue {
    name: String,
    root: PathBuf,
    config: QueueConfig,
    primary: Arc<Segment>,
    retry: Arc<Segment>,
    running: Arc<LeaseStore>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl DurableQueue {
    /// Open (or create) the queue `name` under `dir` and start its sweeper.
    ///
    /// Opening a queue that is already open elsewhere fails.
    pub async fn open(
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        config: QueueConfig,
    ) -> Result<Self, QueueError> {
        let name = name.into();
        let root = dir.as_ref().join(&name);

        let primary = Arc::new(Segment::open(root.join(PRIMARY_DIR)).await?);
        let retry = Arc::new(Segment::open(root.join(RETRY_DIR)).await?);
        let running = Arc::new(LeaseStore::open(root.join(RUNNING_DIR)).await?);

        let shutdown = CancellationToken::new();
        let sweeper = Sweeper {
            queue: name.clone(),
            running: Arc::clone(&running),
            retry: Arc::clone(&retry),
            interval: config.sweep_interval(),
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(sweeper.run());

        info!(queue = %name, "Queue opened at {:?}", root);

        Ok(Self {
            name,
            root,
            config,
            primary,
            retry,
            running,
            shutdown,
            sweeper: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
        })
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding this queue's stores.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Append a payload to the primary segment.
    pub async fn enqueue(&self, payload: impl Into<Vec<u8>>) -> Result<(), QueueError> {
        self.ensure_open()?;
        let payload = payload.into();
        if payload.is_empty() {
            return Err(QueueError::EmptyPayload);
        }

        self.primary.append(payload).await?;
        Ok(())
    }

    /// Take the next payload.
    ///
    /// With `lease_secs > 0` the payload stays in flight until confirmed or
    /// until the deadline passes; otherwise it is handed out with no lease.
    /// Returns `None` when both segments are empty.
    pub async fn dequeue(&self, lease_secs: i64) -> Result<Option<Delivery>, QueueError> {
        self.ensure_open()?;

        let Some((payload, redelivered)) = self.take_next().await? else {
            return Ok(None);
        };

        if lease_secs <= 0 {
            return Ok(Some(Delivery {
                payload,
                lease: None,
                redelivered,
            }));
        }

        let deadline = Utc::now() + Duration::seconds(lease_secs.min(MAX_LEASE_SECS));
        match self.running.hold(deadline, payload.clone()).await {
            Ok(key) => {
                debug!(queue = %self.name, lease = %key, "Leased payload");
                Ok(Some(Delivery {
                    payload,
                    lease: Some(key),
                    redelivered,
                }))
            }
            Err(e) => {
                // The payload already left its segment; park it for redelivery.
                warn!(queue = %self.name, "Failed to record lease: {}", e);
                self.retry.append(payload).await?;
                Err(e)
            }
        }
    }

    /// Release a lease. Unknown or already released keys report `NotFound`.
    pub async fn confirm(&self, key: &LeaseKey) -> Result<Confirmation, QueueError> {
        self.ensure_open()?;
        let outcome = self.running.release(key).await?;
        if !outcome.is_confirmed() {
            debug!(queue = %self.name, lease = %key, "Confirm for unknown lease");
        }
        Ok(outcome)
    }

    /// Next payload that `dequeue` would return, without consuming it.
    pub async fn peek(&self) -> Result<Option<Vec<u8>>, QueueError> {
        self.ensure_open()?;
        let (first, second) = self.segments();
        if let Some(payload) = first.peek().await? {
            return Ok(Some(payload));
        }
        second.peek().await
    }

    /// Counters for this queue.
    pub async fn status(&self) -> Result<QueueStatus, QueueError> {
        self.ensure_open()?;
        Ok(QueueStatus {
            name: self.name.clone(),
            queued: self.primary.len().await?,
            retrying: self.retry.len().await?,
            leased: self.running.len().await?,
        })
    }

    /// Run one expiry sweep immediately. Returns the number of redelivered leases.
    pub async fn sweep_now(&self) -> Result<usize, QueueError> {
        self.ensure_open()?;
        self.running.sweep_due(Utc::now(), &self.retry).await
    }

    /// Stop the sweeper and flush all stores. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), QueueError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shutdown.cancel();
        if let Some(handle) = self.sweeper.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(queue = %self.name, "Sweeper task failed: {}", e);
            }
        }

        self.primary.close().await?;
        self.retry.close().await?;
        self.running.close().await?;

        info!(queue = %self.name, "Queue closed");
        Ok(())
    }

    /// Close the queue and delete everything it stored.
    pub async fn destroy(self) -> Result<(), QueueError> {
        self.close().await?;
        tokio::fs::remove_dir_all(&self.root).await?;
        info!(queue = %self.name, "Queue destroyed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }

    fn segments(&self) -> (&Segment, &Segment) {
        if self.config.retry_first {
            (&*self.retry, &*self.primary)
        } else {
            (&*self.primary, &*self.retry)
        }
    }

    async fn take_next(&self) -> Result<Option<(Vec<u8>, bool)>, QueueError> {
        let retry_first = self.config.retry_first;
        let (first, second) = self.segments();

        if let Some(payload) = first.take().await? {
            return Ok(Some((payload, retry_first)));
        }
        Ok(second.take().await?.map(|payload| (payload, !retry_first)))
    }
}

impl Drop for DurableQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
