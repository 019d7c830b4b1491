//! # crawlq Config
//!
//! TOML configuration for a crawl node.
//!
//! ```toml
//! [storage]
//! data_dir = "~/crawlq/data"
//!
//! [queue]
//! lease_timeout_secs = 300
//!
//! [crawler]
//! workers = 4
//! conf_dir = "conf"
//!
//! [crawler.fetch]
//! proxy = "${CRAWLQ_PROXY}"
//!
//! [api]
//! enabled = true
//! port = 2001
//!
//! [logging]
//! level = "info"
//! ```

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
