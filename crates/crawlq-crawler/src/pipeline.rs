//! Processing of one leased crawl task.
//!
//! A task is confirmed only after its records reached the store queue and
//! its derived tasks reached the crawl queue. Any failure before that point
//! leaves the lease in place, so the task is redelivered once it expires.

use std::sync::Arc;

use chrono::Utc;
use crawlq_gate::Gate;
use crawlq_queue::{Delivery, DurableQueue, Segment};
use tracing::{debug, info, warn};

use crate::archive::RecordArchive;
use crate::error::CrawlError;
use crate::fetch::Fetcher;
use crate::parse::ParserRegistry;
use crate::task::{UrlTask, record_time};

/// What happened to a delivered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output was handed on and the lease confirmed.
    Completed {
        records: usize,
        enqueued: usize,
        skipped: usize,
    },
    /// The page produced nothing; the lease is left to expire.
    Unproductive,
    /// The payload was not a task; it was kept aside and confirmed.
    DeadLettered,
}

/// Everything a worker needs to process a crawl task.
pub struct Pipeline {
    crawl: Arc<DurableQueue>,
    store: Arc<DurableQueue>,
    gate: Arc<Gate>,
    fetcher: Arc<dyn Fetcher>,
    parsers: Arc<ParserRegistry>,
    dead_letter: Arc<Segment>,
    archive: Option<Arc<RecordArchive>>,
}

impl Pipeline {
    pub fn new(
        crawl: Arc<DurableQueue>,
        store: Arc<DurableQueue>,
        gate: Arc<Gate>,
        fetcher: Arc<dyn Fetcher>,
        parsers: Arc<ParserRegistry>,
        dead_letter: Arc<Segment>,
    ) -> Self {
        Self {
            crawl,
            store,
            gate,
            fetcher,
            parsers,
            dead_letter,
            archive: None,
        }
    }

    /// Also append every record to `archive`.
    pub fn with_archive(mut self, archive: Arc<RecordArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// The queue tasks are leased from.
    pub fn crawl_queue(&self) -> &DurableQueue {
        &self.crawl
    }

    /// Process one delivery from the crawl queue.
    pub async fn process(&self, delivery: Delivery) -> Result<Outcome, CrawlError> {
        let task = match UrlTask::from_payload(&delivery.payload) {
            Ok(task) => task,
            Err(e) => {
                warn!("Dead-lettering malformed task: {}", e);
                self.dead_letter.append(delivery.payload).await?;
                if let Some(lease) = &delivery.lease {
                    self.crawl.confirm(lease).await?;
                }
                return Ok(Outcome::DeadLettered);
            }
        };

        debug!(url = %task.url, parser = %task.parser_name, "Processing task");

        let last_seen = self.gate.freshness.last_seen(&task.url).await?;
        let page = self.fetcher.fetch(&task.url).await?;
        let output = self.parsers.parse(&task, &page).await?;

        if output.is_empty() {
            debug!(url = %task.url, "Page produced nothing");
            return Ok(Outcome::Unproductive);
        }

        let mut freshest = None;
        for record in &output.records {
            if let Some(archive) = &self.archive {
                if let Err(e) = archive.write(record).await {
                    warn!("Failed to archive record: {}", e);
                }
            }
            self.store.enqueue(serde_json::to_vec(record)?).await?;
            freshest = freshest.max(record_time(record));
        }

        let content_time = freshest.unwrap_or_else(Utc::now);
        let is_newer = last_seen.is_none_or(|last| content_time > last);

        let mut enqueued = 0;
        let mut skipped = 0;
        if is_newer {
            for mut child in output.tasks {
                if !task.task_name.is_empty() {
                    child.task_name = task.task_name.clone();
                }
                // Marked only once queued: a failed or abandoned enqueue
                // must leave the child admissible when the parent is retried.
                let fp = child.fingerprint();
                if self.gate.dedup.contains(&fp).await? {
                    skipped += 1;
                    continue;
                }
                self.crawl.enqueue(child.to_payload()?).await?;
                if !self.gate.dedup.should_enqueue(&fp).await? {
                    debug!(url = %child.url, "Child queued concurrently by another worker");
                }
                enqueued += 1;
            }
        } else {
            skipped = output.tasks.len();
            debug!(url = %task.url, "Content not newer than {:?}, skipping derived tasks", last_seen);
        }

        if let Some(lease) = &delivery.lease {
            if !self.crawl.confirm(lease).await?.is_confirmed() {
                info!(url = %task.url, lease = %lease, "Lease expired before confirm");
            }
        }
        if let Some(at) = freshest {
            self.gate.freshness.observe(&task.url, at).await?;
        }

        let records = output.records.len();
        info!(url = %task.url, records, enqueued, skipped, "Task completed");
        Ok(Outcome::Completed {
            records,
            enqueued,
            skipped,
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
