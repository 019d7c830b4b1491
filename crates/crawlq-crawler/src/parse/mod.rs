//! Parser registry.
//!
//! Built-in parsers are addressed by reserved names ending in `_`. Any
//! other name is looked up as `{conf_dir}/parsers/{name}.json`, compiled
//! into a [`RuleParser`] and cached.

mod content;
mod html;
mod link;
mod rss;
mod rule;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::CrawlError;
use crate::fetch::FetchedPage;
use crate::task::{Record, UrlTask};

pub use content::ContentParser;
pub use link::LinkParser;
pub use rss::RssParser;
pub use rule::RuleParser;

pub const LINK_PARSER: &str = "link_";
pub const CONTENT_PARSER: &str = "content_";
pub const RSS_PARSER: &str = "rss_";

/// Tasks and records extracted from one page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseOutput {
    pub tasks: Vec<UrlTask>,
    pub records: Vec<Record>,
}

impl ParseOutput {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.records.is_empty()
    }
}

/// Parse collaborator.
pub trait Parser: Send + Sync {
    fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError>;
}

/// Resolves parser names to parsers.
pub struct ParserRegistry {
    parsers_dir: PathBuf,
    builtins: HashMap<String, Arc<dyn Parser>>,
    loaded: RwLock<HashMap<String, Arc<dyn Parser>>>,
}

impl ParserRegistry {
    /// Registry with the built-in parsers, loading others from `conf_dir/parsers`.
    pub fn new(conf_dir: impl AsRef<Path>) -> Self {
        let mut builtins: HashMap<String, Arc<dyn Parser>> = HashMap::new();
        builtins.insert(LINK_PARSER.to_string(), Arc::new(LinkParser));
        builtins.insert(CONTENT_PARSER.to_string(), Arc::new(ContentParser));
        builtins.insert(RSS_PARSER.to_string(), Arc::new(RssParser));

        Self {
            parsers_dir: conf_dir.as_ref().join("parsers"),
            builtins,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a built-in parser.
    pub fn register(&mut self, name: impl Into<String>, parser: Arc<dyn Parser>) {
        self.builtins.insert(name.into().to_lowercase(), parser);
    }

    /// Parser for `name`, loading its definition on first use.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Parser>, CrawlError> {
        if let Some(parser) = self.builtins.get(&name.to_lowercase()) {
            return Ok(Arc::clone(parser));
        }
        if let Some(parser) = self.loaded.read().await.get(name) {
            return Ok(Arc::clone(parser));
        }
        self.reload(name).await
    }

    /// Re-read `name` from disk, replacing any cached definition.
    pub async fn reload(&self, name: &str) -> Result<Arc<dyn Parser>, CrawlError> {
        let path = self.definition_path(name)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            debug!("Parser definition {:?} unreadable: {}", path, e);
            CrawlError::ParserNotFound(name.to_string())
        })?;

        let parser: Arc<dyn Parser> = Arc::new(RuleParser::from_json(&content)?);
        self.loaded
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&parser));

        info!("Loaded parser {} from {:?}", name, path);
        Ok(parser)
    }

    /// Run the parser named by `task`.
    pub async fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError> {
        let parser = self.get(&task.parser_name).await?;
        parser.parse(task, page)
    }

    fn definition_path(&self, name: &str) -> Result<PathBuf, CrawlError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !name.contains("..");
        if !valid {
            return Err(CrawlError::ParserNotFound(name.to_string()));
        }
        Ok(self.parsers_dir.join(format!("{}.json", name)))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
