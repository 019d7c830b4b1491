//! HTTP route definitions.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{add_task, data, status};
use crate::state::ApiState;

/// Create the API router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/addtask", post(add_task))
        .route("/api/status", get(status))
        .route("/api/data", get(data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
