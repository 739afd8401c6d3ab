//! End-to-end pipeline tests against the mock pool, including
//! concurrent jobs sharing one controller.

use std::collections::HashSet;
use std::sync::Arc;

use url::Url;

use strix_core::error::{CrawlError, WorkerError};
use strix_core::testutil::{
    CollectorSink, MockPool, MockWorker, RecordingDomConsumer, make_test_traffic,
};
use strix_core::traits::{NullDomConsumer, WorkerPool};
use strix_crawler::{CrawlController, CrawlerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn target(path: &str) -> Url {
    Url::parse(&format!("http://example.test{path}")).unwrap()
}

#[tokio::test]
async fn concurrent_jobs_share_the_pool_and_keep_tags_apart() {
    init_tracing();

    let workers: Vec<MockWorker> = (0..4)
        .map(|i| {
            MockWorker::healthy()
                .with_traffic(make_test_traffic(&format!("http://example.test/w{i}"), 3))
        })
        .collect();
    let pool = MockPool::with_workers(workers);
    let sink = CollectorSink::new();
    let crawler: Arc<CrawlController<MockPool, NullDomConsumer>> = Arc::new(
        CrawlController::new(pool.clone(), None, CrawlerConfig::default()),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let crawler = crawler.clone();
            let sink = Arc::new(sink.clone());
            tokio::spawn(async move {
                let url = target(&format!("/page-{i}"));
                crawler.crawl(&url, sink).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every worker came back; nothing was evicted.
    assert_eq!(pool.idle_count().await, 4);
    assert!(pool.removed().is_empty());

    // Twelve exchanges, partitioned into four distinct tags of three.
    let tags = sink.tags();
    assert_eq!(tags.len(), 12);
    let distinct: HashSet<String> = tags.iter().map(|t| t.clone().unwrap()).collect();
    assert_eq!(distinct.len(), 4);
    for tag in &distinct {
        assert_eq!(tags.iter().filter(|t| t.as_deref() == Some(tag)).count(), 3);
    }

    let stats = crawler.stats();
    assert_eq!(stats.jobs_succeeded, 4);
    assert_eq!(stats.exchanges_forwarded, 12);
}

#[tokio::test]
async fn partial_dom_still_reaches_the_spidering_layer() {
    init_tracing();

    // The page never settles, but the DOM rendered so far is handed to
    // the consumer anyway.
    let worker = MockWorker::healthy()
        .with_wait_results(vec![Ok(false)])
        .with_dom("<html><body><a href=\"/deep-link\"></a>")
        .with_traffic(make_test_traffic("http://example.test", 1));
    let pool = MockPool::with_workers(vec![worker]);
    let consumer = RecordingDomConsumer::new();
    let crawler = CrawlController::new(
        pool.clone(),
        Some(consumer.clone()),
        CrawlerConfig::default(),
    );

    crawler
        .crawl(&target("/spa"), Arc::new(CollectorSink::new()))
        .await
        .unwrap();

    let snapshots = consumer.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].1.contains("/deep-link"));
    assert_eq!(pool.idle_count().await, 1);
}

#[tokio::test]
async fn eviction_shrinks_the_pool_until_exhaustion() {
    init_tracing();

    let workers: Vec<MockWorker> = (0..2)
        .map(|_| {
            MockWorker::healthy()
                .fail_load(WorkerError::Interface("renderer gone".into()))
        })
        .collect();
    let pool = MockPool::with_workers(workers);
    let crawler: CrawlController<MockPool, NullDomConsumer> =
        CrawlController::new(pool.clone(), None, CrawlerConfig::default());
    let sink = Arc::new(CollectorSink::new());

    for _ in 0..2 {
        let err = crawler.crawl(&target("/"), sink.clone()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Load { .. }));
    }
    assert_eq!(pool.idle_count().await, 0);
    assert_eq!(pool.removed().len(), 2);

    // With every worker poisoned, acquisition itself now fails.
    let err = crawler.crawl(&target("/"), sink).await.unwrap_err();
    assert!(matches!(err, CrawlError::Pool(_)));
    assert_eq!(crawler.stats().workers_evicted, 2);
}
