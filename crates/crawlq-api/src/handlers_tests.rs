use super::*;
use crate::routes::create_router;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use crawlq_gate::Gate;
use crawlq_queue::{DurableQueue, QueueConfig};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    _dir: TempDir,
    state: Arc<ApiState>,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let crawl = DurableQueue::open("crawl", dir.path(), QueueConfig::default())
            .await
            .unwrap();
        let store = DurableQueue::open("store", dir.path(), QueueConfig::default())
            .await
            .unwrap();
        let gate = Gate::open(dir.path()).await.unwrap();
        let state = Arc::new(ApiState::new(Arc::new(crawl), Arc::new(store), Arc::new(gate)));
        Self { _dir: dir, state }
    }

    fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn add_task_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/addtask")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn message(body: &[u8]) -> RestMessage {
    serde_json::from_slice(body).unwrap()
}

const TASK: &str = r#"{"url": "https://news.test/", "parser_name": "link_"}"#;

#[tokio::test]
async fn test_add_task_then_dup() {
    let app = TestApp::new().await;

    let (status, body) = send(app.router(), add_task_request(TASK)).await;
    assert_eq!(status, StatusCode::OK);
    let first = message(&body);
    assert_eq!(first.status, "OK");

    let (status, body) = send(app.router(), add_task_request(TASK)).await;
    assert_eq!(status, StatusCode::OK);
    let second = message(&body);
    assert_eq!(second.status, "DUP");
    assert_eq!(second.message, first.message);

    assert_eq!(app.state.crawl.status().await.unwrap().queued, 1);
    let queued = app.state.crawl.dequeue(0).await.unwrap().unwrap();
    let task = UrlTask::from_payload(&queued.payload).unwrap();
    assert_eq!(task.task_name.len(), 12);
    assert_eq!(task.fingerprint(), first.message.as_str().unwrap());
}

#[tokio::test]
async fn test_failed_add_task_can_be_resubmitted() {
    let app = TestApp::new().await;
    app.state.crawl.close().await.unwrap();

    let (status, body) = send(app.router(), add_task_request(TASK)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(message(&body).status, "ERROR");

    let crawl = DurableQueue::open("crawl", app._dir.path(), QueueConfig::default())
        .await
        .unwrap();
    let state = Arc::new(ApiState::new(
        Arc::new(crawl),
        Arc::clone(&app.state.store),
        Arc::clone(&app.state.gate),
    ));

    let (status, body) = send(create_router(Arc::clone(&state)), add_task_request(TASK)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message(&body).status, "OK");
    assert_eq!(state.crawl.status().await.unwrap().queued, 1);
}

#[tokio::test]
async fn test_add_task_rejects_bad_body() {
    let app = TestApp::new().await;

    let (status, body) = send(app.router(), add_task_request("{oops")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body).status, "ERROR");

    let (status, _) = send(app.router(), add_task_request(r#"{"url": "", "parser_name": "x"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.crawl.status().await.unwrap().queued, 0);
}

#[tokio::test]
async fn test_status_reports_both_queues() {
    let app = TestApp::new().await;
    app.state.store.enqueue(r#"{"n":1}"#).await.unwrap();
    send(app.router(), add_task_request(TASK)).await;

    let (status, body) = send(app.router(), get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);

    let reply = message(&body);
    assert_eq!(reply.status, "OK");
    assert_eq!(reply.message["crawl"]["name"], "crawl");
    assert_eq!(reply.message["crawl"]["queued"], 1);
    assert_eq!(reply.message["store"]["queued"], 1);
    assert_eq!(reply.message["store"]["leased"], 0);
}

#[tokio::test]
async fn test_data_peek_then_take() {
    let app = TestApp::new().await;
    app.state.store.enqueue(r#"{"n":1}"#).await.unwrap();

    let (status, body) = send(app.router(), get("/api/data?peek=TRUE")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"n":1}"#);
    assert_eq!(app.state.store.status().await.unwrap().queued, 1);

    let (status, body) = send(app.router(), get("/api/data")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"n":1}"#);

    let status = app.state.store.status().await.unwrap();
    assert_eq!(status.total(), 0);
}

#[tokio::test]
async fn test_data_empty_is_error() {
    let app = TestApp::new().await;

    let (status, body) = send(app.router(), get("/api/data")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let reply = message(&body);
    assert_eq!(reply.status, "ERROR");
    assert_eq!(reply.message, "Queue is empty");
}

#[tokio::test]
async fn test_closed_queue_is_unavailable() {
    let app = TestApp::new().await;
    app.state.store.close().await.unwrap();

    let (status, body) = send(app.router(), get("/api/status")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(message(&body).status, "ERROR");
}

#[tokio::test]
async fn test_request_count() {
    let app = TestApp::new().await;
    send(app.router(), get("/api/status")).await;
    send(app.router(), get("/api/data")).await;
    assert_eq!(app.state.request_count(), 2);
}

#[test]
fn test_peek_param() {
    let params = |p: Option<&str>| DataParams {
        peek: p.map(String::from),
    };
    assert!(params(Some("true")).is_peek());
    assert!(params(Some(" True ")).is_peek());
    assert!(!params(Some("1")).is_peek());
    assert!(!params(None).is_peek());
}
