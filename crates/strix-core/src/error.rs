use std::time::Duration;

use thiserror::Error;

/// Transport-level failures of a single browser worker session.
///
/// A timeout is handled exactly like a hard interface error: the worker
/// is assumed corrupted and must not be reused.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The remote-debugging interface returned an error.
    #[error("worker interface error: {0}")]
    Interface(String),

    /// A worker call did not complete within its bound.
    #[error("worker call timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures of the worker pool itself.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No worker could be provisioned within the pool's wait policy.
    #[error("no worker available: {0}")]
    Exhausted(String),

    /// The pool backend failed (process spawn, bookkeeping, shutdown).
    #[error("worker pool failure: {0}")]
    Backend(String),

    /// Diagnostic accessors require exactly one idle worker.
    #[error("pool diagnostics require exactly one idle worker, found {0}")]
    DiagnosticsPrecondition(usize),
}

/// Failures raised by an extraction strategy.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// The worker failed while the strategy was driving it.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The DOM consumer rejected the snapshot handed to it.
    #[error("DOM consumer rejected snapshot: {0}")]
    Consumer(String),
}

/// The single failure type surfaced by `CrawlController::crawl`.
///
/// One variant per pipeline phase. For every variant except `Pool` the
/// borrowed worker has already been evicted by the time the error
/// propagates; for `Pool` there was never a worker to evict.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("failed to acquire a worker from the pool: {0}")]
    Pool(#[from] PoolError),

    #[error("failed to load {url}: {source}")]
    Load { url: String, source: WorkerError },

    #[error("error while waiting for {url} to load: {source}")]
    WaitForLoad { url: String, source: WorkerError },

    #[error("failed to stop page loading: {0}")]
    Stop(WorkerError),

    #[error("extraction strategy {strategy} failed: {source}")]
    Strategy {
        strategy: &'static str,
        source: StrategyError,
    },

    #[error("failed to load blank page during cleanup: {0}")]
    Cleanup(WorkerError),
}

impl CrawlError {
    /// The pipeline phase this error was raised in, for log lines.
    pub fn phase(&self) -> &'static str {
        match self {
            CrawlError::Pool(_) => "acquire",
            CrawlError::Load { .. } => "load",
            CrawlError::WaitForLoad { .. } => "wait",
            CrawlError::Stop(_) => "stop",
            CrawlError::Strategy { .. } => "extract",
            CrawlError::Cleanup(_) => "cleanup",
        }
    }

    /// Whether a worker was evicted on this failure path.
    pub fn evicted_worker(&self) -> bool {
        !matches!(self, CrawlError::Pool(_))
    }
}
