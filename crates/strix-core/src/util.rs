use rand::distr::{Alphanumeric, SampleString};

/// Length of a job correlation id.
pub const CORRELATION_ID_LEN: usize = 8;

/// Generate a random alphanumeric correlation id.
///
/// Binds all log lines and forwarded exchanges of one crawl job.
/// Example: `"x3Fa9bQ1"`
pub fn correlation_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), CORRELATION_ID_LEN)
}
