//! Request handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use crawlq_crawler::UrlTask;
use crawlq_gate::time_bucket;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::ApiState;

/// Uniform JSON reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestMessage {
    /// `OK`, `DUP` or `ERROR`.
    pub status: String,
    pub message: Value,
}

impl RestMessage {
    pub fn ok(message: impl Into<Value>) -> Self {
        Self {
            status: "OK".to_string(),
            message: message.into(),
        }
    }

    pub fn dup(message: impl Into<Value>) -> Self {
        Self {
            status: "DUP".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<Value>) -> Self {
        Self {
            status: "ERROR".to_string(),
            message: message.into(),
        }
    }
}

/// Submit a crawl task under the current crawl round.
///
/// Replies `OK` with the task fingerprint, or `DUP` with the same
/// fingerprint when the task was already accepted this round. Two
/// concurrent identical submissions may both be accepted.
pub async fn add_task(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<RestMessage>, ApiError> {
    state.increment_requests();

    let mut task: UrlTask =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    if task.url.is_empty() || task.parser_name.is_empty() {
        return Err(ApiError::InvalidRequest(
            "url and parser_name are required".to_string(),
        ));
    }

    task.task_name = time_bucket(Utc::now());
    let key = task.fingerprint();

    if state.gate.dedup.contains(&key).await? {
        debug!(url = %task.url, "Duplicate task submitted");
        return Ok(Json(RestMessage::dup(key)));
    }

    // Queue before marking, so a failed enqueue can be resubmitted.
    state.crawl.enqueue(task.to_payload()?).await?;
    state.gate.dedup.should_enqueue(&key).await?;
    info!(url = %task.url, parser = %task.parser_name, "Task accepted");
    Ok(Json(RestMessage::ok(key)))
}

/// Counters of the crawl and store queues.
pub async fn status(State(state): State<Arc<ApiState>>) -> Result<Json<RestMessage>, ApiError> {
    state.increment_requests();

    let crawl = state.crawl.status().await?;
    let store = state.store.status().await?;
    Ok(Json(RestMessage::ok(json!({
        "crawl": crawl,
        "store": store,
    }))))
}

/// Query parameters of `/api/data`.
#[derive(Debug, Default, Deserialize)]
pub struct DataParams {
    #[serde(default)]
    pub peek: Option<String>,
}

impl DataParams {
    fn is_peek(&self) -> bool {
        self.peek
            .as_deref()
            .is_some_and(|p| p.trim().eq_ignore_ascii_case("true"))
    }
}

/// Next stored record, raw. Taken without a lease unless `peek=true`.
pub async fn data(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<DataParams>,
) -> Result<Response, ApiError> {
    state.increment_requests();

    let payload = if params.is_peek() {
        state.store.peek().await?
    } else {
        state.store.dequeue(0).await?.map(|delivery| delivery.payload)
    };

    let payload = payload.ok_or(ApiError::Empty)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
