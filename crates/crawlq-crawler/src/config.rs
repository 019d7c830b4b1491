//! Crawler configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Crawler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory holding `seeds.json` and `parsers/`.
    #[serde(default = "default_conf_dir")]
    pub conf_dir: PathBuf,

    /// Minimum idle sleep when the crawl queue is empty, in seconds.
    #[serde(default = "default_idle_min")]
    pub idle_min_secs: u64,

    /// Maximum idle sleep when the crawl queue is empty, in seconds.
    #[serde(default = "default_idle_max")]
    pub idle_max_secs: u64,

    /// Pause after a queue or store failure, in milliseconds.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    /// Re-enqueue the seeds every this many seconds; 0 disables reseeding.
    #[serde(default)]
    pub reseed_period_secs: u64,

    /// Append every record to a daily JSON-lines archive.
    #[serde(default = "default_archive")]
    pub archive: bool,

    /// HTTP fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

fn default_workers() -> usize {
    1
}

fn default_conf_dir() -> PathBuf {
    PathBuf::from("conf")
}

fn default_idle_min() -> u64 {
    5
}

fn default_idle_max() -> u64 {
    25
}

fn default_error_backoff() -> u64 {
    1_000
}

fn default_archive() -> bool {
    true
}

impl CrawlerConfig {
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Seeding period, if reseeding is enabled.
    pub fn reseed_period(&self) -> Option<Duration> {
        (self.reseed_period_secs > 0).then(|| Duration::from_secs(self.reseed_period_secs))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            conf_dir: default_conf_dir(),
            idle_min_secs: default_idle_min(),
            idle_max_secs: default_idle_max(),
            error_backoff_ms: default_error_backoff(),
            reseed_period_secs: 0,
            archive: default_archive(),
            fetch: FetchConfig::default(),
        }
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy URL applied to every request, e.g. `http://127.0.0.1:8118`.
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("crawlq/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.workers, 1);
        assert_eq!(config.idle_min_secs, 5);
        assert_eq!(config.idle_max_secs, 25);
        assert!(config.reseed_period().is_none());
        assert!(config.fetch.proxy.is_none());
        assert!(config.fetch.user_agent.starts_with("crawlq/"));
    }

    #[test]
    fn test_reseed_period() {
        let config = CrawlerConfig {
            reseed_period_secs: 600,
            ..Default::default()
        };
        assert_eq!(config.reseed_period(), Some(Duration::from_secs(600)));
    }
}
