//! Background expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::QueueError;
use crate::lease::LeaseStore;
use crate::segment::Segment;

/// Periodically moves expired leases into the retry segment.
pub(crate) struct Sweeper {
    pub(crate) queue: String,
    pub(crate) running: Arc<LeaseStore>,
    pub(crate) retry: Arc<Segment>,
    pub(crate) interval: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Sweeper {
    /// Run until the shutdown token fires. A sweep in progress always
    /// finishes before the loop exits.
    pub(crate) async fn run(self) {
        debug!(queue = %self.queue, "Sweeper started, interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            self.tick().await;
        }

        debug!(queue = %self.queue, "Sweeper stopped");
    }

    async fn tick(&self) {
        match self.running.sweep_due(Utc::now(), &self.retry).await {
            Ok(0) => {}
            Ok(n) => info!(queue = %self.queue, "Redelivering {} expired lease(s)", n),
            Err(QueueError::Closed) => {}
            Err(e) => warn!(queue = %self.queue, "Sweep failed: {}", e),
        }
    }
}
