//! Application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crawlq_gate::Gate;
use crawlq_queue::DurableQueue;

/// State shared across handlers.
pub struct ApiState {
    pub crawl: Arc<DurableQueue>,
    pub store: Arc<DurableQueue>,
    pub gate: Arc<Gate>,
    start_time: Instant,
    request_count: AtomicU64,
}

impl ApiState {
    pub fn new(crawl: Arc<DurableQueue>, store: Arc<DurableQueue>, gate: Arc<Gate>) -> Self {
        Self {
            crawl,
            store,
            gate,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Get uptime.
    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get request count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Increment request count.
    pub fn increment_requests(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }
}
