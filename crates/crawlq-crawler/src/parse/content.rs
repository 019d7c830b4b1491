//! `content_`: turns a page into a single document record.

use serde_json::json;

use super::{ParseOutput, Parser, html};
use crate::error::CrawlError;
use crate::fetch::FetchedPage;
use crate::task::{Record, UrlTask};

pub struct ContentParser;

impl Parser for ContentParser {
    fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError> {
        let doc = json!({
            "url": task.url,
            "title": html::title(&page.text),
            "text": html::to_text(&page.text),
            "ip": page.ip(),
        });

        let mut record = Record::new();
        record.insert("doc".to_string(), doc);
        record.insert("ext".to_string(), task.ext.clone());

        Ok(ParseOutput {
            tasks: Vec::new(),
            records: vec![record],
        })
    }
}
