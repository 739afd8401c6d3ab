use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use strix_core::models::HttpExchange;
use strix_core::traits::TrafficSink;

/// Adapter between a worker and the caller's sink.
///
/// Stamps every exchange with the job's correlation id before
/// forwarding and counts what went through. One instance exists per
/// crawl job, so the counter starts at zero for every acquisition.
///
/// The worker's network-event hook is the sole writer during a job;
/// the controller reads the counter only after the writing phase has
/// completed, so `Relaxed` ordering is sufficient.
pub struct TaggedTrafficSink {
    inner: Arc<dyn TrafficSink>,
    correlation_id: String,
    forwarded: AtomicU64,
}

impl TaggedTrafficSink {
    pub fn new(inner: Arc<dyn TrafficSink>, correlation_id: &str) -> Self {
        Self {
            inner,
            correlation_id: correlation_id.to_string(),
            forwarded: AtomicU64::new(0),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Number of exchanges forwarded so far during this job.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}

impl TrafficSink for TaggedTrafficSink {
    fn forward(&self, mut exchange: HttpExchange) {
        exchange.correlation_id = Some(self.correlation_id.clone());
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        self.inner.forward(exchange);
    }
}
