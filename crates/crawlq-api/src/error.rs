//! API errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crawlq_crawler::CrawlError;
use crawlq_gate::GateError;
use crawlq_queue::QueueError;
use thiserror::Error;
use tracing::error;

use crate::handlers::RestMessage;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters are unusable.
    #[error("{0}")]
    InvalidRequest(String),

    /// Nothing to hand out.
    #[error("Queue is empty")]
    Empty,

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Empty => StatusCode::NOT_FOUND,
            ApiError::Queue(QueueError::Closed) | ApiError::Gate(GateError::Closed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("API request failed: {}", self);
        }
        (status, Json(RestMessage::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Empty.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Queue(QueueError::Closed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Queue(QueueError::Database("disk".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(ApiError::Empty.to_string(), "Queue is empty");
    }
}
