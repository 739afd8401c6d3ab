use std::time::{Duration, Instant};

/// RAII probe that reports how long a pipeline phase took.
///
/// Logs `phase`, the job's correlation id, and the elapsed time when
/// dropped, whichever way the phase exits. Timing has no effect on
/// control flow.
pub struct PhaseTimer {
    phase: &'static str,
    correlation_id: String,
    started: Instant,
}

impl PhaseTimer {
    pub fn start(phase: &'static str, correlation_id: &str) -> Self {
        Self {
            phase,
            correlation_id: correlation_id.to_string(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        tracing::debug!(
            phase = self.phase,
            correlation_id = %self.correlation_id,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "phase finished"
        );
    }
}
