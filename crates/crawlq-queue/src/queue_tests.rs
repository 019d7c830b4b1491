    use super::*;
    use tempfile::TempDir;

    fn fast_config() -> QueueConfig {
        QueueConfig {
            sweep_interval_ms: 50,
            ..Default::default()
        }
    }

    async fn open_temp(config: QueueConfig) -> (TempDir, DurableQueue) {
        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open("crawl", dir.path(), config).await.unwrap();
        (dir, queue)
    }

    #[tokio::test]
    async fn test_open_creates_layout() {
        let (dir, queue) = open_temp(QueueConfig::default()).await;
        let root = dir.path().join("crawl");

        assert_eq!(queue.root(), root.as_path());
        assert!(root.join("queue").join("segment.db").exists());
        assert!(root.join("retry_queue").join("segment.db").exists());
        assert!(root.join("running").join("leases.db").exists());
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_rejects_empty() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        let err = queue.enqueue(Vec::new()).await.unwrap_err();
        assert!(matches!(err, QueueError::EmptyPayload));
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dequeue_empty_returns_none() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        assert!(queue.dequeue(30).await.unwrap().is_none());
        assert!(queue.dequeue(0).await.unwrap().is_none());
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dequeue_without_lease() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        queue.enqueue("a").await.unwrap();

        let delivery = queue.dequeue(0).await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"a");
        assert!(delivery.lease.is_none());
        assert!(!delivery.redelivered);

        let status = queue.status().await.unwrap();
        assert_eq!(status.total(), 0);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_lease_and_confirm() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        queue.enqueue("a").await.unwrap();

        let delivery = queue.dequeue(60).await.unwrap().unwrap();
        let key = delivery.lease.unwrap();
        assert_eq!(queue.status().await.unwrap().leased, 1);

        assert_eq!(queue.confirm(&key).await.unwrap(), Confirmation::Confirmed);
        assert_eq!(queue.confirm(&key).await.unwrap(), Confirmation::NotFound);
        assert_eq!(queue.status().await.unwrap().leased, 0);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_segment_is_drained_first() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        queue.enqueue("fresh").await.unwrap();
        queue.retry.append(b"retried".to_vec()).await.unwrap();

        assert_eq!(queue.peek().await.unwrap().unwrap(), b"retried");
        let first = queue.dequeue(0).await.unwrap().unwrap();
        assert_eq!(first.payload, b"retried");
        assert!(first.redelivered);
        assert_eq!(queue.dequeue(0).await.unwrap().unwrap().payload, b"fresh");
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_primary_first_when_configured() {
        let config = QueueConfig {
            retry_first: false,
            ..Default::default()
        };
        let (_dir, queue) = open_temp(config).await;
        queue.enqueue("fresh").await.unwrap();
        queue.retry.append(b"retried".to_vec()).await.unwrap();

        assert_eq!(queue.dequeue(0).await.unwrap().unwrap().payload, b"fresh");
        let second = queue.dequeue(0).await.unwrap().unwrap();
        assert_eq!(second.payload, b"retried");
        assert!(second.redelivered);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_redelivers_expired_lease() {
        let (_dir, queue) = open_temp(fast_config()).await;
        queue.enqueue("x").await.unwrap();

        let first = queue.dequeue(1).await.unwrap().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1300)).await;

        let status = queue.status().await.unwrap();
        assert_eq!(status.leased, 0);
        assert_eq!(status.retrying, 1);

        let second = queue.dequeue(0).await.unwrap().unwrap();
        assert_eq!(second.payload, b"x");
        assert!(second.redelivered);
        assert_eq!(
            queue.confirm(&first.lease.unwrap()).await.unwrap(),
            Confirmation::NotFound
        );
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_now_leaves_live_leases() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        queue.enqueue("x").await.unwrap();
        queue.dequeue(600).await.unwrap().unwrap();

        assert_eq!(queue.sweep_now().await.unwrap(), 0);
        assert_eq!(queue.status().await.unwrap().leased, 1);
        queue.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_dir, queue) = open_temp(QueueConfig::default()).await;
        queue.close().await.unwrap();
        queue.close().await.unwrap();

        assert!(matches!(queue.enqueue("a").await, Err(QueueError::Closed)));
        assert!(matches!(queue.dequeue(1).await, Err(QueueError::Closed)));
        assert!(matches!(queue.status().await, Err(QueueError::Closed)));
    }

    #[tokio::test]
    async fn test_destroy_removes_directory() {
        let (dir, queue) = open_temp(QueueConfig::default()).await;
        queue.enqueue("a").await.unwrap();
        queue.destroy().await.unwrap();

        assert!(!dir.path().join("crawl").exists());
        let reopened = DurableQueue::open("crawl", dir.path(), QueueConfig::default())
            .await
            .unwrap();
        assert_eq!(reopened.status().await.unwrap().total(), 0);
        reopened.close().await.unwrap();
    }
