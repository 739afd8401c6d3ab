use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use url::Url;

use strix_core::error::{CrawlError, StrategyError, WorkerError};
use strix_core::models::JsError;
use strix_core::traits::{DomConsumer, TrafficSink, Worker, WorkerPool};
use strix_core::util::correlation_id;

use crate::sink::TaggedTrafficSink;
use crate::strategy::Strategy;
use crate::timing::PhaseTimer;

/// Construction-time configuration for [`CrawlController`].
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Cap on worker processes; `None` lets the pool pick its default.
    pub max_instances: Option<usize>,
    /// How long to wait for a page load to settle before proceeding
    /// with whatever DOM is present.
    pub wait_for_load_timeout: Duration,
    /// Outer bound on every worker-interface call. An elapsed bound is
    /// handled exactly like a hard interface error.
    pub call_timeout: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_instances: None,
            wait_for_load_timeout: Duration::from_secs(20),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Counters over the controller's lifetime, for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    pub jobs_started: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub workers_evicted: u64,
    pub exchanges_forwarded: u64,
}

#[derive(Default)]
struct StatCounters {
    jobs_started: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
    workers_evicted: AtomicU64,
    exchanges_forwarded: AtomicU64,
}

impl StatCounters {
    fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            workers_evicted: self.workers_evicted.load(Ordering::Relaxed),
            exchanges_forwarded: self.exchanges_forwarded.load(Ordering::Relaxed),
        }
    }
}

/// Orchestrates crawl jobs over a bounded pool of browser workers.
///
/// Each [`crawl`](CrawlController::crawl) call borrows one worker,
/// drives it through load → extract → cleanup, and guarantees the
/// worker ends up either back in the idle set or permanently evicted —
/// never orphaned. Any worker-interface error or timeout poisons the
/// worker: the pool removes it and the job fails. Workers are never
/// returned after an interface-level failure, even a plausibly
/// transient one, so corrupted session state cannot leak into the next
/// job.
///
/// Generic over the pool and the optional DOM consumer, enabling
/// dependency injection and testability without real browser
/// processes.
pub struct CrawlController<P, D>
where
    P: WorkerPool,
    D: DomConsumer,
{
    pool: P,
    strategies: Vec<Strategy<D>>,
    config: CrawlerConfig,
    stats: StatCounters,
}

impl<P, D> CrawlController<P, D>
where
    P: WorkerPool,
    D: DomConsumer,
{
    /// Build the worker pool from `opener` and `config.max_instances`,
    /// then assemble the controller around it.
    ///
    /// `opener` is the collaborator the pool's workers use to issue
    /// HTTP requests via the interception proxy.
    pub async fn launch(
        opener: P::Opener,
        dom_consumer: Option<D>,
        config: CrawlerConfig,
    ) -> Result<Self, CrawlError> {
        let pool = P::launch(opener, config.max_instances).await?;
        Ok(Self::new(pool, dom_consumer, config))
    }

    /// Assemble the controller around an existing pool.
    ///
    /// The strategy list is fixed here: triggered-requests always
    /// first, DOM snapshot appended only when a consumer is supplied.
    pub fn new(pool: P, dom_consumer: Option<D>, config: CrawlerConfig) -> Self {
        let mut strategies = vec![Strategy::TriggeredRequests];
        if let Some(consumer) = dom_consumer {
            strategies.push(Strategy::DomSnapshot(consumer));
        }

        Self {
            pool,
            strategies,
            config,
            stats: StatCounters::default(),
        }
    }

    /// Crawl `url`, forwarding every captured HTTP exchange to `sink`
    /// tagged with a fresh correlation id.
    ///
    /// Runs on the caller's task and blocks until completion or
    /// failure; concurrency comes from concurrent `crawl` calls
    /// sharing the pool. On failure the borrowed worker has already
    /// been evicted before the error propagates.
    pub async fn crawl(
        &self,
        url: &Url,
        sink: Arc<dyn TrafficSink>,
    ) -> Result<(), CrawlError> {
        self.stats.jobs_started.fetch_add(1, Ordering::Relaxed);

        let cid = correlation_id();
        let tagged = Arc::new(TaggedTrafficSink::new(sink, &cid));

        let result = self.run_pipeline(url, tagged.clone(), &cid).await;

        self.stats
            .exchanges_forwarded
            .fetch_add(tagged.forwarded(), Ordering::Relaxed);

        match &result {
            Ok(()) => {
                self.stats.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    correlation_id = %cid,
                    %url,
                    forwarded = tagged.forwarded(),
                    "crawl complete"
                );
            }
            Err(e) => {
                self.stats.jobs_failed.fetch_add(1, Ordering::Relaxed);
                if e.evicted_worker() {
                    self.stats.workers_evicted.fetch_add(1, Ordering::Relaxed);
                }
                tracing::warn!(
                    correlation_id = %cid,
                    %url,
                    phase = e.phase(),
                    error = %e,
                    "crawl failed"
                );
            }
        }

        result
    }

    /// Shut down the worker pool. Safe to call more than once.
    pub async fn terminate(&self) {
        tracing::info!("terminating crawler worker pool");
        self.pool.terminate().await;
    }

    /// Console messages of the pool's single idle worker.
    ///
    /// Test-only diagnostic; fails with a precondition error unless the
    /// pool holds exactly one idle worker.
    pub async fn list_console_messages(&self) -> Result<Vec<String>, CrawlError> {
        Ok(self.pool.console_messages().await?)
    }

    /// JavaScript errors of the pool's single idle worker. Same
    /// precondition as [`list_console_messages`](Self::list_console_messages).
    pub async fn list_js_errors(&self) -> Result<Vec<JsError>, CrawlError> {
        Ok(self.pool.js_errors().await?)
    }

    /// Snapshot of the lifetime counters.
    pub fn stats(&self) -> CrawlStats {
        self.stats.snapshot()
    }

    async fn run_pipeline(
        &self,
        url: &Url,
        tagged: Arc<TaggedTrafficSink>,
        cid: &str,
    ) -> Result<(), CrawlError> {
        let worker = self.initial_page_load(url, tagged.clone(), cid).await?;

        for strategy in &self.strategies {
            let _timer = PhaseTimer::start(strategy.name(), cid);

            let outcome = match timeout(
                self.config.call_timeout,
                strategy.crawl(&worker, url, cid),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(StrategyError::Worker(WorkerError::Timeout(
                    self.config.call_timeout,
                ))),
            };

            if let Err(source) = outcome {
                tracing::debug!(
                    correlation_id = %cid,
                    %url,
                    worker_id = %worker.id(),
                    strategy = strategy.name(),
                    error = %source,
                    "strategy failed, evicting worker"
                );
                self.pool.remove(worker).await;
                return Err(CrawlError::Strategy {
                    strategy: strategy.name(),
                    source,
                });
            }
        }

        self.cleanup(url, worker, &tagged, cid).await
    }

    /// Acquire a worker with the tagged sink bound, load the target
    /// URL, and stop further page activity. On success the returned
    /// worker is loaded and quiescent, ready for extraction.
    async fn initial_page_load(
        &self,
        url: &Url,
        tagged: Arc<TaggedTrafficSink>,
        cid: &str,
    ) -> Result<P::Worker, CrawlError> {
        let worker = {
            let _timer = PhaseTimer::start("acquire", cid);
            tracing::debug!(correlation_id = %cid, %url, "acquiring worker from pool");
            self.pool.get(tagged).await.map_err(|e| {
                tracing::debug!(correlation_id = %cid, %url, error = %e, "failed to acquire worker");
                CrawlError::Pool(e)
            })?
        };

        tracing::debug!(
            correlation_id = %cid,
            %url,
            worker_id = %worker.id(),
            "loading url in worker"
        );
        worker.set_correlation_id(cid);

        {
            let _timer = PhaseTimer::start("load", cid);
            if let Err(source) = self.bounded(worker.load(url)).await {
                tracing::debug!(
                    correlation_id = %cid,
                    %url,
                    worker_id = %worker.id(),
                    error = %source,
                    "load failed, evicting worker"
                );
                self.pool.remove(worker).await;
                return Err(CrawlError::Load {
                    url: url.to_string(),
                    source,
                });
            }
        }

        {
            let _timer = PhaseTimer::start("wait", cid);
            // The in-protocol timeout fires first; the outer bound only
            // catches a hung interface.
            let wait_bound = self.config.wait_for_load_timeout + self.config.call_timeout;
            let waited = match timeout(
                wait_bound,
                worker.wait_for_load(self.config.wait_for_load_timeout),
            )
            .await
            {
                Ok(waited) => waited,
                Err(_) => Err(WorkerError::Timeout(wait_bound)),
            };

            match waited {
                Ok(true) => {}
                Ok(false) => {
                    // Best effort: the strategies tolerate partial DOMs,
                    // and whatever the page requested so far has already
                    // reached the sink.
                    tracing::debug!(
                        correlation_id = %cid,
                        %url,
                        "page did not finish loading, continuing with partial DOM"
                    );
                }
                Err(source) => {
                    tracing::debug!(
                        correlation_id = %cid,
                        %url,
                        worker_id = %worker.id(),
                        error = %source,
                        "wait for load failed, evicting worker"
                    );
                    self.pool.remove(worker).await;
                    return Err(CrawlError::WaitForLoad {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }

        {
            // Stop even after a successful load to prevent any further
            // requests or DOM changes during extraction.
            let _timer = PhaseTimer::start("stop", cid);
            if let Err(source) = self.bounded(worker.stop()).await {
                tracing::debug!(
                    correlation_id = %cid,
                    %url,
                    worker_id = %worker.id(),
                    error = %source,
                    "stop failed, evicting worker"
                );
                self.pool.remove(worker).await;
                return Err(CrawlError::Stop(source));
            }
        }

        Ok(worker)
    }

    /// Load a blank page to release the DOM, then return the worker to
    /// the pool. A cleanup failure evicts the worker even though every
    /// strategy succeeded.
    async fn cleanup(
        &self,
        url: &Url,
        worker: P::Worker,
        tagged: &TaggedTrafficSink,
        cid: &str,
    ) -> Result<(), CrawlError> {
        let _timer = PhaseTimer::start("cleanup", cid);

        if let Err(source) = self.bounded(worker.load_blank()).await {
            tracing::debug!(
                correlation_id = %cid,
                worker_id = %worker.id(),
                error = %source,
                "cleanup failed, evicting worker"
            );
            self.pool.remove(worker).await;
            return Err(CrawlError::Cleanup(source));
        }

        tracing::debug!(
            correlation_id = %cid,
            %url,
            worker_id = %worker.id(),
            forwarded = tagged.forwarded(),
            "extracted HTTP exchanges, returning worker to pool"
        );
        self.pool.free(worker).await;
        Ok(())
    }

    /// Bound a worker call by `call_timeout`, mapping an elapsed bound
    /// to the same error path as a hard interface failure.
    async fn bounded<T, F>(&self, call: F) -> Result<T, WorkerError>
    where
        F: Future<Output = Result<T, WorkerError>>,
    {
        match timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(self.config.call_timeout)),
        }
    }
}
