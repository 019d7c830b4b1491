//! Configuration-driven parser loaded from `parsers/<name>.json`.
//!
//! ```json
//! {
//!   "links": [{ "pattern": "<a href=\"(/article/\\d+)\"", "parser": "content_" }],
//!   "item": "<div class=\"post\">(.*?)</div>",
//!   "fields": { "title": "<h2>(.*?)</h2>", "time_": "datetime=\"([^\"]+)\"" }
//! }
//! ```
//!
//! Each pattern uses its first capture group, or the whole match when it has
//! none. With `item`, fields are extracted per item block; otherwise once per
//! page. A record is emitted only if at least one field matched.

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{ParseOutput, Parser, html};
use crate::error::CrawlError;
use crate::fetch::FetchedPage;
use crate::task::{Record, UrlTask};

#[derive(Debug, Deserialize)]
struct RuleSpec {
    #[serde(default)]
    links: Vec<LinkRuleSpec>,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LinkRuleSpec {
    pattern: String,
    parser: String,
}

struct LinkRule {
    pattern: Regex,
    parser: String,
}

/// Regex rules for links and record fields.
pub struct RuleParser {
    links: Vec<LinkRule>,
    item: Option<Regex>,
    fields: Vec<(String, Regex)>,
}

impl RuleParser {
    /// Compile a parser definition.
    pub fn from_json(content: &str) -> Result<Self, CrawlError> {
        let spec: RuleSpec = serde_json::from_str(content)
            .map_err(|e| CrawlError::Parse(format!("invalid parser definition: {}", e)))?;

        let links = spec
            .links
            .into_iter()
            .map(|rule| {
                Ok(LinkRule {
                    pattern: compile(&rule.pattern)?,
                    parser: rule.parser,
                })
            })
            .collect::<Result<Vec<_>, CrawlError>>()?;

        let item = spec.item.as_deref().map(compile).transpose()?;

        let fields = spec
            .fields
            .into_iter()
            .map(|(name, pattern)| Ok((name, compile(&pattern)?)))
            .collect::<Result<Vec<_>, CrawlError>>()?;

        Ok(Self {
            links,
            item,
            fields,
        })
    }

    fn record(&self, fragment: &str, task: &UrlTask) -> Option<Record> {
        let mut record = Record::new();
        for (name, pattern) in &self.fields {
            if let Some(cap) = pattern.captures(fragment) {
                record.insert(name.clone(), Value::String(html::to_text(first_group(&cap))));
            }
        }
        if record.is_empty() {
            return None;
        }
        record.insert("url".to_string(), Value::String(task.url.clone()));
        record.insert("ext".to_string(), task.ext.clone());
        Some(record)
    }
}

impl Parser for RuleParser {
    fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError> {
        let base = Url::parse(&page.url)
            .or_else(|_| Url::parse(&task.url))
            .map_err(|e| CrawlError::Parse(format!("invalid page URL {}: {}", task.url, e)))?;

        let mut tasks = Vec::new();
        for rule in &self.links {
            for cap in rule.pattern.captures_iter(&page.text) {
                if let Some(url) = html::resolve(&base, first_group(&cap)) {
                    tasks.push(UrlTask {
                        task_name: String::new(),
                        url: url.into(),
                        parser_name: rule.parser.clone(),
                        ext: task.ext.clone(),
                    });
                }
            }
        }

        let records = match &self.item {
            Some(item) => item
                .captures_iter(&page.text)
                .filter_map(|cap| self.record(first_group(&cap), task))
                .collect(),
            None => self.record(&page.text, task).into_iter().collect(),
        };

        Ok(ParseOutput { tasks, records })
    }
}

fn compile(pattern: &str) -> Result<Regex, CrawlError> {
    Regex::new(&format!("(?is){}", pattern))
        .map_err(|e| CrawlError::Parse(format!("invalid pattern {:?}: {}", pattern, e)))
}

fn first_group<'h>(cap: &Captures<'h>) -> &'h str {
    cap.get(1)
        .or_else(|| cap.get(0))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::record_time;
    use serde_json::json;

    const LISTING: &str = r#"{
        "links": [{ "pattern": "<a class=\"more\" href=\"([^\"]+)\"", "parser": "listing" }],
        "item": "<div class=\"post\">(.*?)</div>",
        "fields": {
            "title": "<h2>(.*?)</h2>",
            "time_": "datetime=\"([^\"]+)\""
        }
    }"#;

    fn page() -> FetchedPage {
        FetchedPage {
            url: "https://blog.test/page/1".to_string(),
            text: r#"
                <div class="post"><h2>One</h2><time datetime="2024-03-09T08:00:00Z"></time></div>
                <div class="post"><h2>Two</h2></div>
                <div class="post"><p>no fields here</p></div>
                <a class="more" href="/page/2">next</a>
            "#
            .to_string(),
            remote_addr: None,
        }
    }

    #[test]
    fn test_items_and_links() {
        let parser = RuleParser::from_json(LISTING).unwrap();
        let mut task = UrlTask::new("https://blog.test/page/1", "listing");
        task.ext = json!(7);

        let output = parser.parse(&task, &page()).unwrap();

        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].url, "https://blog.test/page/2");
        assert_eq!(output.tasks[0].parser_name, "listing");
        assert_eq!(output.tasks[0].ext, json!(7));

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0]["title"], "One");
        assert!(record_time(&output.records[0]).is_some());
        assert_eq!(output.records[1]["title"], "Two");
        assert!(record_time(&output.records[1]).is_none());
        assert_eq!(output.records[1]["url"], "https://blog.test/page/1");
    }

    #[test]
    fn test_whole_page_fields() {
        let parser = RuleParser::from_json(r#"{"fields": {"headline": "<h1>(.*?)</h1>"}}"#).unwrap();
        let task = UrlTask::new("https://blog.test/a", "article");
        let mut page = page();
        page.text = "<h1>Hello <em>there</em></h1>".to_string();

        let output = parser.parse(&task, &page).unwrap();
        assert!(output.tasks.is_empty());
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0]["headline"], "Hello there");
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(RuleParser::from_json("not json").is_err());
        assert!(RuleParser::from_json(r#"{"fields": {"x": "("}}"#).is_err());
    }
}
