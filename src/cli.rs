//! CLI definitions for crawlq.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crawlq_config::Config;

/// crawlq CLI.
#[derive(Parser)]
#[command(name = "crawlq")]
#[command(about = "Durable lease-based crawl queue node")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CRAWLQ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings that take precedence over the configuration file.
#[derive(Args, Default)]
pub(crate) struct Overrides {
    /// Data directory holding queues and stores
    #[arg(long, env = "CRAWLQ_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding seeds.json and parser definitions
    #[arg(long, env = "CRAWLQ_CONF_DIR", global = true)]
    pub conf_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "CRAWLQ_LOG", global = true)]
    pub log_level: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = dir.clone();
        }
        if let Some(dir) = &self.conf_dir {
            config.crawler.conf_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the crawl node in foreground (default)
    Run {
        /// Number of crawl workers
        #[arg(long)]
        workers: Option<usize>,

        /// Serve the HTTP API
        #[arg(long)]
        api: bool,

        /// API host
        #[arg(long)]
        host: Option<String>,

        /// API port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print queue and store counts as JSON
    Status,

    /// Enqueue the seed tasks once, ignoring the first-run marker
    Seed,
}
