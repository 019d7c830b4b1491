//! # crawlq Queue
//!
//! Durable, lease-based FIFO used by every stage of the crawl pipeline.
//!
//! ## Features
//!
//! - Crash-recoverable segments with a persisted read cursor (SQLite)
//! - In-flight lease store keyed by deadline for cheap expiry scans
//! - Background sweep that redelivers expired leases through a retry segment
//! - At-least-once delivery with idempotent confirmation
//!
//! ## Layout on disk
//!
//! ```text
//! {dir}/{name}/
//! ├── queue/segment.db        primary segment
//! ├── retry_queue/segment.db  retry segment
//! └── running/leases.db       in-flight leases
//! ```

pub mod config;
pub mod error;
pub mod lease;
pub mod queue;
pub mod segment;
pub mod store;
mod sweep;

pub use config::QueueConfig;
pub use error::QueueError;
pub use lease::{Confirmation, LeaseKey, LeaseStore};
pub use queue::{Delivery, DurableQueue, QueueStatus};
pub use segment::Segment;
