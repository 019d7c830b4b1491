//! Crawler errors.

use crawlq_gate::GateError;
use crawlq_queue::QueueError;
use thiserror::Error;

/// Crawler error types.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("Parser not found: {0}")]
    ParserNotFound(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
