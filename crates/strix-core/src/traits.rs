use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{PoolError, WorkerError};
use crate::models::{HttpExchange, JsError, WorkerState};

/// Receives HTTP exchanges captured while a worker renders a page.
///
/// The worker's network-event hook is the sole writer during a job, so
/// implementations only need to be safe under single-producer use.
pub trait TrafficSink: Send + Sync {
    fn forward(&self, exchange: HttpExchange);
}

/// One headless-browser automation session.
///
/// Implementations own the remote-debugging connection; the crawler only
/// drives the session through these calls and never touches the wire
/// protocol. Any `Err` from an operation means the session state can no
/// longer be trusted.
pub trait Worker: Send + Sync {
    /// Stable identity assigned by the pool at spawn time.
    fn id(&self) -> Uuid;

    /// Current lifecycle state, reported by the session itself.
    fn state(&self) -> WorkerState;

    /// Bind the job's correlation id so the session tags its own logs.
    fn set_correlation_id(&self, correlation_id: &str);

    /// Navigate to `url`. Returns as soon as navigation is accepted;
    /// captured traffic starts flowing to the bound sink immediately.
    fn load(&self, url: &Url) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Wait up to `timeout` for the page load to settle.
    ///
    /// `Ok(false)` means the page was still loading when the timeout
    /// expired — that is a best-effort signal, not a failure.
    fn wait_for_load(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, WorkerError>> + Send;

    /// Halt any further network activity and DOM changes.
    fn stop(&self) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Load a blank page, releasing the DOM and associated memory.
    fn load_blank(&self) -> impl Future<Output = Result<(), WorkerError>> + Send;

    /// Synthesize DOM events (clicks, mouseovers, form interactions) on
    /// the loaded page to trigger the requests the page would make under
    /// user interaction. Returns the number of events dispatched.
    fn dispatch_dom_events(&self) -> impl Future<Output = Result<u32, WorkerError>> + Send;

    /// Snapshot of the current DOM as rendered.
    fn dom(&self) -> impl Future<Output = Result<String, WorkerError>> + Send;

    /// Console messages captured so far, in order. Diagnostics only.
    fn console_messages(&self) -> Vec<String>;

    /// JavaScript errors captured so far, in order. Diagnostics only.
    fn js_errors(&self) -> Vec<JsError>;
}

/// A bounded set of workers with acquire/release/evict/terminate
/// operations.
///
/// The pool is the only shared mutable resource between concurrent
/// crawl jobs and must serialize `get`/`free`/`remove` internally.
/// Blocking or bounded-wait policy on `get` is the pool's decision.
pub trait WorkerPool: Send + Sync {
    type Worker: Worker;

    /// Collaborator the pool's workers use to issue HTTP requests via
    /// the interception proxy.
    type Opener: Send + Sync;

    /// Build the pool. `max_instances` caps the number of worker
    /// processes; `None` lets the pool pick its default.
    fn launch(
        opener: Self::Opener,
        max_instances: Option<usize>,
    ) -> impl Future<Output = Result<Self, PoolError>> + Send
    where
        Self: Sized;

    /// Acquire a worker, binding `sink` as the destination for every
    /// HTTP exchange the worker captures until it is returned.
    ///
    /// Ownership transfers to the caller: the worker must come back
    /// through exactly one of `free` or `remove`.
    fn get(
        &self,
        sink: Arc<dyn TrafficSink>,
    ) -> impl Future<Output = Result<Self::Worker, PoolError>> + Send;

    /// Return a healthy worker to the idle set.
    fn free(&self, worker: Self::Worker) -> impl Future<Output = ()> + Send;

    /// Permanently evict a worker; the pool terminates or replaces the
    /// underlying process.
    fn remove(&self, worker: Self::Worker) -> impl Future<Output = ()> + Send;

    /// Shut down all workers. Implementations must tolerate repeated
    /// calls.
    fn terminate(&self) -> impl Future<Output = ()> + Send;

    /// Number of idle workers currently available.
    fn idle_count(&self) -> impl Future<Output = usize> + Send;

    /// Console messages of the single idle worker.
    ///
    /// Test-only diagnostic: fails with
    /// [`PoolError::DiagnosticsPrecondition`] unless the idle set holds
    /// exactly one worker.
    fn console_messages(&self) -> impl Future<Output = Result<Vec<String>, PoolError>> + Send;

    /// JavaScript errors of the single idle worker. Same precondition
    /// as [`WorkerPool::console_messages`].
    fn js_errors(&self) -> impl Future<Output = Result<Vec<JsError>, PoolError>> + Send;
}

/// Consumes DOM snapshots taken after rendering, typically to extract
/// links for the spidering layer.
///
/// Consumers must tolerate partial DOMs: the crawler hands over
/// whatever was rendered even when the page never finished loading.
pub trait DomConsumer: Send + Sync + Clone {
    fn consume(&self, url: &Url, dom: &str) -> anyhow::Result<()>;
}

/// A no-op DomConsumer for configurations without a spidering layer.
#[derive(Debug, Clone)]
pub struct NullDomConsumer;

impl DomConsumer for NullDomConsumer {
    fn consume(&self, _url: &Url, _dom: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
