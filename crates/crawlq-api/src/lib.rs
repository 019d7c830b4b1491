//! # crawlq API
//!
//! Administrative HTTP surface of a crawl node.
//!
//! ```text
//! POST /api/addtask          submit a UrlTask (OK / DUP / ERROR)
//! GET  /api/status           crawl and store queue counters
//! GET  /api/data[?peek=true] take (or peek at) the next stored record
//! ```
//!
//! Every JSON reply is a [`RestMessage`]: `{"status": ..., "message": ...}`.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use handlers::RestMessage;
pub use routes::create_router;
pub use server::{ApiConfig, ApiServer};
pub use state::ApiState;
