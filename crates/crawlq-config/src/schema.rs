//! Configuration schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crawlq_api::ApiConfig;
pub use crawlq_crawler::{CrawlerConfig, FetchConfig};
pub use crawlq_queue::QueueConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the node keeps its state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of every queue and store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Name of the queue holding crawl tasks.
    #[serde(default = "default_crawl_queue")]
    pub crawl_queue: String,

    /// Name of the queue holding result records.
    #[serde(default = "default_store_queue")]
    pub store_queue: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_crawl_queue() -> String {
    "crawl".to_string()
}

fn default_store_queue() -> String {
    "store".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            crawl_queue: default_crawl_queue(),
            store_queue: default_store_queue(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rotated log files; console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Write file logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
            max_files: default_max_files(),
            json: false,
        }
    }
}
