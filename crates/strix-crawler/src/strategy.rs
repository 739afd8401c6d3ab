use url::Url;

use strix_core::error::StrategyError;
use strix_core::traits::{DomConsumer, Worker};

/// An extraction strategy run against a loaded worker.
///
/// The set of strategies is fixed at controller construction:
/// triggered-requests always runs first, and the DOM snapshot is only
/// appended when a [`DomConsumer`] was configured. Strategies operate
/// on the worker handle alone and never touch the pool.
pub enum Strategy<D: DomConsumer> {
    /// Synthesize DOM events so the page issues the requests it would
    /// make under user interaction. The exchanges this triggers reach
    /// the caller's sink passively through the worker's traffic hook.
    TriggeredRequests,

    /// Snapshot the rendered DOM and hand it to the spidering layer.
    DomSnapshot(D),
}

impl<D: DomConsumer> Strategy<D> {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::TriggeredRequests => "triggered-requests",
            Strategy::DomSnapshot(_) => "dom-snapshot",
        }
    }

    pub async fn crawl<W: Worker>(
        &self,
        worker: &W,
        url: &Url,
        correlation_id: &str,
    ) -> Result<(), StrategyError> {
        match self {
            Strategy::TriggeredRequests => {
                let dispatched = worker.dispatch_dom_events().await?;
                tracing::debug!(
                    correlation_id,
                    %url,
                    dispatched,
                    "dispatched DOM events"
                );
                Ok(())
            }
            Strategy::DomSnapshot(consumer) => {
                let dom = worker.dom().await?;
                tracing::debug!(
                    correlation_id,
                    %url,
                    dom_bytes = dom.len(),
                    "captured DOM snapshot"
                );
                consumer
                    .consume(url, &dom)
                    .map_err(|e| StrategyError::Consumer(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_core::error::WorkerError;
    use strix_core::testutil::{MockWorker, RecordingDomConsumer, RejectingDomConsumer};
    use strix_core::traits::NullDomConsumer;

    fn target() -> Url {
        Url::parse("http://example.test/").unwrap()
    }

    #[tokio::test]
    async fn triggered_requests_drives_event_dispatch() {
        let worker = MockWorker::healthy().with_dispatched_events(12);
        let strategy: Strategy<NullDomConsumer> = Strategy::TriggeredRequests;

        strategy.crawl(&worker, &target(), "s7r4t000").await.unwrap();

        assert_eq!(worker.calls(), vec!["dispatch_dom_events"]);
        assert_eq!(strategy.name(), "triggered-requests");
    }

    #[tokio::test]
    async fn triggered_requests_propagates_worker_failure() {
        let worker = MockWorker::healthy()
            .fail_dispatch(WorkerError::Interface("execution context destroyed".into()));
        let strategy: Strategy<NullDomConsumer> = Strategy::TriggeredRequests;

        let err = strategy
            .crawl(&worker, &target(), "s7r4t001")
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Worker(_)));
    }

    #[tokio::test]
    async fn dom_snapshot_feeds_the_consumer() {
        let consumer = RecordingDomConsumer::new();
        let worker = MockWorker::healthy().with_dom("<html><body><a href=\"/x\"></a></body></html>");
        let strategy = Strategy::DomSnapshot(consumer.clone());

        strategy.crawl(&worker, &target(), "s7r4t002").await.unwrap();

        let snapshots = consumer.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].0, "http://example.test/");
        assert!(snapshots[0].1.contains("href=\"/x\""));
        assert_eq!(strategy.name(), "dom-snapshot");
    }

    #[tokio::test]
    async fn dom_snapshot_maps_consumer_rejection() {
        let strategy = Strategy::DomSnapshot(RejectingDomConsumer::new("malformed document"));
        let worker = MockWorker::healthy();

        let err = strategy
            .crawl(&worker, &target(), "s7r4t003")
            .await
            .unwrap_err();
        match err {
            StrategyError::Consumer(message) => assert_eq!(message, "malformed document"),
            other => panic!("expected consumer rejection, got {other}"),
        }
    }
}
