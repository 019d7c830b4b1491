//! `rss_`: one record per RSS item or Atom entry.
//!
//! Each record is dated through `time_` from `pubDate`, `updated`,
//! `published` or `dc:date`, so feed pages feed the freshness ledger.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use super::{ParseOutput, Parser, html};
use crate::error::CrawlError;
use crate::fetch::FetchedPage;
use crate::task::{RECORD_TIME_FIELD, Record, UrlTask};

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)>").expect("item pattern")
});
static FEED_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:rss|feed|rdf:RDF)\b").expect("feed root pattern"));
static ATOM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("atom link pattern")
});

const DATE_TAGS: &[&str] = &["pubDate", "updated", "published", "dc:date"];

pub struct RssParser;

impl Parser for RssParser {
    fn parse(&self, task: &UrlTask, page: &FetchedPage) -> Result<ParseOutput, CrawlError> {
        if !FEED_ROOT.is_match(&page.text) {
            return Err(CrawlError::Parse(format!("{} is not an RSS or Atom feed", task.url)));
        }

        let records = ITEM
            .captures_iter(&page.text)
            .map(|cap| item_record(&cap[1], task))
            .collect();

        Ok(ParseOutput {
            tasks: Vec::new(),
            records,
        })
    }
}

fn item_record(item: &str, task: &UrlTask) -> Record {
    let mut feed = Map::new();
    feed.insert("title".into(), Value::String(element_text(item, "title")));
    feed.insert("link".into(), Value::String(item_link(item)));
    let description = match element_text(item, "description") {
        text if text.is_empty() => element_text(item, "summary"),
        text => text,
    };
    feed.insert("description".into(), Value::String(description));

    let published = DATE_TAGS
        .iter()
        .map(|tag| element_text(item, tag))
        .find_map(|raw| parse_date(&raw));

    let mut record = Record::new();
    record.insert("feed".into(), Value::Object(feed));
    record.insert("ext".into(), task.ext.clone());
    if let Some(published) = published {
        record.insert(RECORD_TIME_FIELD.into(), Value::String(published.to_rfc3339()));
    }
    record
}

fn element_text(fragment: &str, tag: &str) -> String {
    let pattern = format!(r"(?is)<{0}\b[^>]*>(.*?)</{0}>", regex::escape(tag));
    match Regex::new(&pattern) {
        Ok(re) => re
            .captures(fragment)
            .map(|cap| html::to_text(&cap[1]))
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

fn item_link(item: &str) -> String {
    match element_text(item, "link") {
        link if !link.is_empty() => link,
        _ => ATOM_LINK
            .captures(item)
            .map(|cap| cap[1].trim().to_string())
            .unwrap_or_default(),
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
