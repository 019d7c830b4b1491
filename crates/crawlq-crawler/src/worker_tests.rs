use super::*;
use std::time::Instant;

use async_trait::async_trait;
use crawlq_gate::Gate;
use crawlq_queue::{DurableQueue, QueueConfig, Segment};
use tempfile::TempDir;

use crate::error::CrawlError;
use crate::fetch::{FetchedPage, Fetcher};
use crate::parse::ParserRegistry;
use crate::task::UrlTask;

/// Every URL is a content page titled after itself.
struct EchoFetcher;

#[async_trait]
impl Fetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        if url.contains("broken") {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(FetchedPage {
            url: url.to_string(),
            text: format!("<title>{}</title>", url),
            remote_addr: None,
        })
    }
}

async fn pipeline(dir: &TempDir) -> (Arc<Pipeline>, Arc<DurableQueue>, Arc<DurableQueue>) {
    let data = dir.path().join("data");
    let crawl = Arc::new(DurableQueue::open("crawl", &data, QueueConfig::default()).await.unwrap());
    let store = Arc::new(DurableQueue::open("store", &data, QueueConfig::default()).await.unwrap());
    let pipeline = Pipeline::new(
        Arc::clone(&crawl),
        Arc::clone(&store),
        Arc::new(Gate::open(&data).await.unwrap()),
        Arc::new(EchoFetcher),
        Arc::new(ParserRegistry::new(dir.path().join("conf"))),
        Arc::new(Segment::open(data.join("dead_letter")).await.unwrap()),
    );
    (Arc::new(pipeline), crawl, store)
}

fn quick_config(workers: usize) -> CrawlerConfig {
    CrawlerConfig {
        workers,
        idle_min_secs: 1,
        idle_max_secs: 1,
        ..Default::default()
    }
}

async fn enqueue(queue: &DurableQueue, url: &str) {
    let task = UrlTask::new(url, "content_");
    queue.enqueue(task.to_payload().unwrap()).await.unwrap();
}

#[tokio::test]
async fn test_step_outcomes() {
    let dir = TempDir::new().unwrap();
    let (pipeline, crawl, store) = pipeline(&dir).await;
    let worker = Worker::new(0, pipeline, &quick_config(1), 300);

    assert_eq!(worker.step().await, Step::Idle);

    enqueue(&crawl, "https://site.test/ok").await;
    assert!(matches!(worker.step().await, Step::Processed(Outcome::Completed { .. })));
    assert_eq!(store.status().await.unwrap().queued, 1);

    enqueue(&crawl, "https://site.test/broken").await;
    assert_eq!(worker.step().await, Step::Failed);
    assert_eq!(crawl.status().await.unwrap().leased, 1);

    assert_eq!(worker.processed(), 1);
    assert_eq!(worker.failed(), 1);

    crawl.close().await.unwrap();
    assert_eq!(worker.step().await, Step::Closed);
}

#[tokio::test]
async fn test_pool_drains_queue_and_stops_on_cancel() {
    let dir = TempDir::new().unwrap();
    let (pipeline, crawl, store) = pipeline(&dir).await;
    for i in 0..10 {
        enqueue(&crawl, &format!("https://site.test/{}", i)).await;
    }

    let token = CancellationToken::new();
    let pool = WorkerPool::spawn(pipeline, &quick_config(3), 300, token.clone());
    assert_eq!(pool.size(), 3);

    let deadline = Instant::now() + Duration::from_secs(10);
    while pool.total_processed() < 10 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    token.cancel();
    let started = Instant::now();
    assert_eq!(pool.total_processed(), 10);
    assert_eq!(pool.total_failed(), 0);
    assert_eq!(store.status().await.unwrap().queued, 10);
    pool.join().await;

    // Idle sleeps are cancellable.
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(crawl.status().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_worker_exits_when_queue_closes() {
    let dir = TempDir::new().unwrap();
    let (pipeline, crawl, _store) = pipeline(&dir).await;
    let config = CrawlerConfig {
        idle_min_secs: 0,
        idle_max_secs: 0,
        ..Default::default()
    };
    let worker = Arc::new(Worker::new(0, pipeline, &config, 300));
    let handle = tokio::spawn(Arc::clone(&worker).run(CancellationToken::new()));

    crawl.close().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
