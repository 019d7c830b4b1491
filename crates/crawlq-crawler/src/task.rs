//! Crawl task and record model.

use chrono::{DateTime, Utc};
use crawlq_gate::fingerprint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CrawlError;

/// Field that dates a record, RFC 3339.
pub const RECORD_TIME_FIELD: &str = "time_";

/// One page to crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlTask {
    /// Crawl round this task belongs to (minute bucket).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub task_name: String,

    pub url: String,

    /// Parser that turns the fetched page into tasks and records.
    pub parser_name: String,

    /// Opaque data carried from a seed to everything derived from it.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub ext: Value,
}

impl UrlTask {
    pub fn new(url: impl Into<String>, parser_name: impl Into<String>) -> Self {
        Self {
            task_name: String::new(),
            url: url.into(),
            parser_name: parser_name.into(),
            ext: Value::Null,
        }
    }

    /// Decode a queue payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CrawlError> {
        let task: UrlTask = serde_json::from_slice(payload)
            .map_err(|e| CrawlError::InvalidTask(e.to_string()))?;
        if task.url.is_empty() {
            return Err(CrawlError::InvalidTask("missing url".to_string()));
        }
        if task.parser_name.is_empty() {
            return Err(CrawlError::InvalidTask("missing parser_name".to_string()));
        }
        Ok(task)
    }

    /// Encode as a queue payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, CrawlError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Dedup identity: crawl round, URL and parser.
    pub fn fingerprint(&self) -> String {
        fingerprint(&[&self.task_name, &self.url, &self.parser_name])
    }
}

/// A result record: an arbitrary JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Content time of a record, if it carries a valid `time_` field.
pub fn record_time(record: &Record) -> Option<DateTime<Utc>> {
    let raw = record.get(RECORD_TIME_FIELD)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_payload_round_trip_keeps_ext() {
        let mut task = UrlTask::new("https://a.test/", "link_");
        task.task_name = "202403091530".to_string();
        task.ext = json!({"site": "a"});

        let decoded = UrlTask::from_payload(&task.to_payload().unwrap()).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let task = UrlTask::new("https://a.test/", "content_");
        let json = String::from_utf8(task.to_payload().unwrap()).unwrap();
        assert!(!json.contains("task_name"));
        assert!(!json.contains("ext"));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(UrlTask::from_payload(b"not json").is_err());
        assert!(UrlTask::from_payload(br#"{"url":"","parser_name":"link_"}"#).is_err());
        assert!(UrlTask::from_payload(br#"{"url":"https://a.test/"}"#).is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_round() {
        let mut a = UrlTask::new("https://a.test/", "link_");
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.task_name = "202403091530".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_record_time() {
        let mut record = Record::new();
        assert_eq!(record_time(&record), None);

        record.insert(RECORD_TIME_FIELD.into(), json!("2024-03-09T15:30:00+01:00"));
        assert_eq!(
            record_time(&record),
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap())
        );

        record.insert(RECORD_TIME_FIELD.into(), json!("yesterday"));
        assert_eq!(record_time(&record), None);
    }
}
