//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{PoolError, WorkerError};
use crate::models::{HttpExchange, JsError, WorkerState};
use crate::traits::{DomConsumer, TrafficSink, Worker, WorkerPool};

// ---------------------------------------------------------------------------
// CollectorSink
// ---------------------------------------------------------------------------

/// Sink that records every forwarded exchange.
#[derive(Clone, Default)]
pub struct CollectorSink {
    exchanges: Arc<Mutex<Vec<HttpExchange>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchanges(&self) -> Vec<HttpExchange> {
        self.exchanges.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.exchanges.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Correlation ids of all recorded exchanges, in arrival order.
    pub fn tags(&self) -> Vec<Option<String>> {
        self.exchanges
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.correlation_id.clone())
            .collect()
    }
}

impl TrafficSink for CollectorSink {
    fn forward(&self, exchange: HttpExchange) {
        self.exchanges.lock().unwrap().push(exchange);
    }
}

// ---------------------------------------------------------------------------
// MockWorker
// ---------------------------------------------------------------------------

/// Mock worker with scriptable per-call results.
///
/// Every failure slot holds `Option<WorkerError>`; `None` means the call
/// succeeds. A configured error is consumed by the first call that hits
/// it.
#[derive(Clone)]
pub struct MockWorker {
    id: Uuid,
    state: Arc<Mutex<WorkerState>>,
    correlation_id: Arc<Mutex<Option<String>>>,
    sink: Arc<Mutex<Option<Arc<dyn TrafficSink>>>>,
    traffic_on_load: Arc<Mutex<Vec<HttpExchange>>>,
    load_error: Arc<Mutex<Option<WorkerError>>>,
    load_delay: Arc<Mutex<Option<Duration>>>,
    wait_results: Arc<Mutex<Vec<Result<bool, WorkerError>>>>,
    stop_error: Arc<Mutex<Option<WorkerError>>>,
    blank_error: Arc<Mutex<Option<WorkerError>>>,
    dispatch_error: Arc<Mutex<Option<WorkerError>>>,
    dom_error: Arc<Mutex<Option<WorkerError>>>,
    dom: Arc<Mutex<String>>,
    dispatched_events: Arc<Mutex<u32>>,
    console: Arc<Mutex<Vec<String>>>,
    js: Arc<Mutex<Vec<JsError>>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl MockWorker {
    /// A worker where every call succeeds and the page loads in time.
    pub fn healthy() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(Mutex::new(WorkerState::Idle)),
            correlation_id: Arc::new(Mutex::new(None)),
            sink: Arc::new(Mutex::new(None)),
            traffic_on_load: Arc::new(Mutex::new(Vec::new())),
            load_error: Arc::new(Mutex::new(None)),
            load_delay: Arc::new(Mutex::new(None)),
            wait_results: Arc::new(Mutex::new(Vec::new())),
            stop_error: Arc::new(Mutex::new(None)),
            blank_error: Arc::new(Mutex::new(None)),
            dispatch_error: Arc::new(Mutex::new(None)),
            dom_error: Arc::new(Mutex::new(None)),
            dom: Arc::new(Mutex::new("<html><body></body></html>".to_string())),
            dispatched_events: Arc::new(Mutex::new(0)),
            console: Arc::new(Mutex::new(Vec::new())),
            js: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Exchanges the worker emits to its bound sink during `load`.
    pub fn with_traffic(self, traffic: Vec<HttpExchange>) -> Self {
        *self.traffic_on_load.lock().unwrap() = traffic;
        self
    }

    pub fn fail_load(self, error: WorkerError) -> Self {
        *self.load_error.lock().unwrap() = Some(error);
        self
    }

    /// Make `load` hang for `delay` before succeeding, to exercise the
    /// controller's outer call bound.
    pub fn with_load_delay(self, delay: Duration) -> Self {
        *self.load_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Queue of `wait_for_load` results. Each call pops the first
    /// element; an empty queue yields `Ok(true)`.
    pub fn with_wait_results(self, results: Vec<Result<bool, WorkerError>>) -> Self {
        *self.wait_results.lock().unwrap() = results;
        self
    }

    pub fn fail_stop(self, error: WorkerError) -> Self {
        *self.stop_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_cleanup(self, error: WorkerError) -> Self {
        *self.blank_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_dispatch(self, error: WorkerError) -> Self {
        *self.dispatch_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_dom(self, error: WorkerError) -> Self {
        *self.dom_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_dom(self, dom: &str) -> Self {
        *self.dom.lock().unwrap() = dom.to_string();
        self
    }

    pub fn with_dispatched_events(self, count: u32) -> Self {
        *self.dispatched_events.lock().unwrap() = count;
        self
    }

    pub fn with_console(self, messages: Vec<String>) -> Self {
        *self.console.lock().unwrap() = messages;
        self
    }

    pub fn with_js_errors(self, errors: Vec<JsError>) -> Self {
        *self.js.lock().unwrap() = errors;
        self
    }

    /// Names of worker calls in invocation order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// The correlation id bound by the last job, if any.
    pub fn bound_correlation_id(&self) -> Option<String> {
        self.correlation_id.lock().unwrap().clone()
    }

    fn attach_sink(&self, sink: Arc<dyn TrafficSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.lock().unwrap() = state;
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn take_error(slot: &Arc<Mutex<Option<WorkerError>>>) -> Option<WorkerError> {
        slot.lock().unwrap().take()
    }
}

impl Worker for MockWorker {
    fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> WorkerState {
        *self.state.lock().unwrap()
    }

    fn set_correlation_id(&self, correlation_id: &str) {
        *self.correlation_id.lock().unwrap() = Some(correlation_id.to_string());
    }

    async fn load(&self, _url: &Url) -> Result<(), WorkerError> {
        self.record("load");
        self.set_state(WorkerState::Loading);

        let delay = *self.load_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(e) = Self::take_error(&self.load_error) {
            return Err(e);
        }

        // Traffic starts flowing to the bound sink as soon as navigation
        // is accepted.
        let sink = self.sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            for exchange in self.traffic_on_load.lock().unwrap().iter() {
                sink.forward(exchange.clone());
            }
        }
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<bool, WorkerError> {
        self.record("wait_for_load");
        let mut results = self.wait_results.lock().unwrap();
        if results.is_empty() {
            Ok(true)
        } else {
            results.remove(0)
        }
    }

    async fn stop(&self) -> Result<(), WorkerError> {
        self.record("stop");
        match Self::take_error(&self.stop_error) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn load_blank(&self) -> Result<(), WorkerError> {
        self.record("load_blank");
        self.set_state(WorkerState::Cleaning);
        match Self::take_error(&self.blank_error) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn dispatch_dom_events(&self) -> Result<u32, WorkerError> {
        self.record("dispatch_dom_events");
        self.set_state(WorkerState::Extracting);
        match Self::take_error(&self.dispatch_error) {
            Some(e) => Err(e),
            None => Ok(*self.dispatched_events.lock().unwrap()),
        }
    }

    async fn dom(&self) -> Result<String, WorkerError> {
        self.record("dom");
        self.set_state(WorkerState::Extracting);
        match Self::take_error(&self.dom_error) {
            Some(e) => Err(e),
            None => Ok(self.dom.lock().unwrap().clone()),
        }
    }

    fn console_messages(&self) -> Vec<String> {
        self.console.lock().unwrap().clone()
    }

    fn js_errors(&self) -> Vec<JsError> {
        self.js.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// MockPool
// ---------------------------------------------------------------------------

/// Opener handed to [`MockPool::launch`]; stands in for the platform's
/// interception-proxy HTTP opener.
#[derive(Debug, Clone, Copy)]
pub struct MockOpener;

/// Mock pool backed by an in-memory idle list.
///
/// Records every `free`/`remove` so tests can assert the
/// returned-or-evicted postcondition.
#[derive(Clone)]
pub struct MockPool {
    idle: Arc<Mutex<Vec<MockWorker>>>,
    freed: Arc<Mutex<Vec<Uuid>>>,
    removed: Arc<Mutex<Vec<Uuid>>>,
    get_error: Arc<Mutex<Option<PoolError>>>,
    terminate_calls: Arc<Mutex<u32>>,
}

impl MockPool {
    pub fn with_workers(workers: Vec<MockWorker>) -> Self {
        Self {
            idle: Arc::new(Mutex::new(workers)),
            freed: Arc::new(Mutex::new(Vec::new())),
            removed: Arc::new(Mutex::new(Vec::new())),
            get_error: Arc::new(Mutex::new(None)),
            terminate_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Pool whose next `get` fails with `error`.
    pub fn with_get_error(error: PoolError) -> Self {
        let pool = Self::with_workers(Vec::new());
        *pool.get_error.lock().unwrap() = Some(error);
        pool
    }

    pub fn freed(&self) -> Vec<Uuid> {
        self.freed.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<Uuid> {
        self.removed.lock().unwrap().clone()
    }

    pub fn terminate_calls(&self) -> u32 {
        *self.terminate_calls.lock().unwrap()
    }

    fn sole_idle(&self) -> Result<MockWorker, PoolError> {
        let idle = self.idle.lock().unwrap();
        if idle.len() != 1 {
            return Err(PoolError::DiagnosticsPrecondition(idle.len()));
        }
        Ok(idle[0].clone())
    }
}

impl WorkerPool for MockPool {
    type Worker = MockWorker;
    type Opener = MockOpener;

    async fn launch(
        _opener: MockOpener,
        max_instances: Option<usize>,
    ) -> Result<Self, PoolError> {
        let workers = (0..max_instances.unwrap_or(1))
            .map(|_| MockWorker::healthy())
            .collect();
        Ok(Self::with_workers(workers))
    }

    async fn get(&self, sink: Arc<dyn TrafficSink>) -> Result<MockWorker, PoolError> {
        if let Some(e) = self.get_error.lock().unwrap().take() {
            return Err(e);
        }

        let mut idle = self.idle.lock().unwrap();
        let worker = idle
            .pop()
            .ok_or_else(|| PoolError::Exhausted("no idle worker".into()))?;
        worker.attach_sink(sink);
        Ok(worker)
    }

    async fn free(&self, worker: MockWorker) {
        worker.set_state(WorkerState::Idle);
        self.freed.lock().unwrap().push(worker.id());
        self.idle.lock().unwrap().push(worker);
    }

    async fn remove(&self, worker: MockWorker) {
        worker.set_state(WorkerState::Poisoned);
        self.removed.lock().unwrap().push(worker.id());
    }

    async fn terminate(&self) {
        *self.terminate_calls.lock().unwrap() += 1;
        self.idle.lock().unwrap().clear();
    }

    async fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    async fn console_messages(&self) -> Result<Vec<String>, PoolError> {
        Ok(self.sole_idle()?.console_messages())
    }

    async fn js_errors(&self) -> Result<Vec<JsError>, PoolError> {
        Ok(self.sole_idle()?.js_errors())
    }
}

// ---------------------------------------------------------------------------
// DomConsumer mocks
// ---------------------------------------------------------------------------

/// Consumer that records every snapshot it receives.
#[derive(Clone, Default)]
pub struct RecordingDomConsumer {
    snapshots: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingDomConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(url, dom)` pairs in arrival order.
    pub fn snapshots(&self) -> Vec<(String, String)> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl DomConsumer for RecordingDomConsumer {
    fn consume(&self, url: &Url, dom: &str) -> anyhow::Result<()> {
        self.snapshots
            .lock()
            .unwrap()
            .push((url.to_string(), dom.to_string()));
        Ok(())
    }
}

/// Consumer that rejects every snapshot.
#[derive(Clone)]
pub struct RejectingDomConsumer {
    message: String,
}

impl RejectingDomConsumer {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl DomConsumer for RejectingDomConsumer {
    fn consume(&self, _url: &Url, _dom: &str) -> anyhow::Result<()> {
        anyhow::bail!("{}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A small batch of captured exchanges for seeding mock workers.
pub fn make_test_traffic(base: &str, count: usize) -> Vec<HttpExchange> {
    (0..count)
        .map(|i| HttpExchange::request_only("GET", &format!("{base}/resource-{i}")))
        .collect()
}
