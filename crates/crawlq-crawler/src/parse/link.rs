//! `link_`: discovers article links on a listing page.

use url::Url;

use super::{CONTENT_PARSER, ParseOutput, Parser, html};
use crate::error::CrawlError;
use crate::fetch::FetchedPage;
use crate::task::UrlTask;

/// Emits one `content_` task per same-host link on the page.
pub struct LinkParser;

impl Parser for LinkParser {
    fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError> {
        let base = Url::parse(&page.url)
            .or_else(|_| Url::parse(&task.url))
            .map_err(|e| CrawlError::Parse(format!("invalid page URL {}: {}", task.url, e)))?;

        let tasks = html::links(&page.text, &base)
            .into_iter()
            .filter(|link| link.host_str() == base.host_str() && link.as_str() != base.as_str())
            .map(|link| UrlTask {
                task_name: String::new(),
                url: link.into(),
                parser_name: CONTENT_PARSER.to_string(),
                ext: task.ext.clone(),
            })
            .collect();

        Ok(ParseOutput {
            tasks,
            records: Vec::new(),
        })
    }
}
