//! # crawlq Crawler
//!
//! Crawl workers built on the durable queue.
//!
//! Each worker leases a [`UrlTask`] from the crawl queue, fetches the page,
//! runs the task's parser, pushes result records to the store queue, feeds
//! newly discovered tasks back through the dedup gate, and confirms the
//! lease only once that work has been handed on.

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod seeds;
pub mod task;
pub mod worker;

pub use archive::RecordArchive;
pub use config::{CrawlerConfig, FetchConfig};
pub use error::CrawlError;
pub use fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use parse::{ParseOutput, Parser, ParserRegistry};
pub use pipeline::{Outcome, Pipeline};
pub use seeds::SeedLoader;
pub use task::{Record, UrlTask};
pub use worker::{Step, Worker, WorkerPool};
