use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An HTTP request observed while a worker rendered a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The response paired with a captured request, when one arrived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A captured request/response pair observed during page load.
///
/// The crawler forwards exchanges unchanged except for stamping
/// `correlation_id`; their contents are produced and consumed by the
/// interception-proxy layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpExchange {
    pub request: HttpRequest,
    pub response: Option<HttpResponse>,
    pub captured_at: DateTime<Utc>,
    /// Set by the crawler before forwarding; binds the exchange to one job.
    pub correlation_id: Option<String>,
}

impl HttpExchange {
    /// An exchange for a request whose response has not been seen yet.
    pub fn request_only(method: &str, url: &str) -> Self {
        Self {
            request: HttpRequest {
                method: method.to_string(),
                url: url.to_string(),
                headers: Vec::new(),
                body: None,
            },
            response: None,
            captured_at: Utc::now(),
            correlation_id: None,
        }
    }
}

/// A JavaScript error captured from a worker's console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsError {
    pub message: String,
    pub url: Option<String>,
    pub line: Option<u32>,
}

/// Lifecycle state of a worker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Loading,
    Extracting,
    Cleaning,
    Poisoned,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Loading => "loading",
            WorkerState::Extracting => "extracting",
            WorkerState::Cleaning => "cleaning",
            WorkerState::Poisoned => "poisoned",
        }
    }

    /// A poisoned worker must never be handed to another job.
    pub fn is_poisoned(&self) -> bool {
        matches!(self, WorkerState::Poisoned)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_state_display_matches_as_str() {
        assert_eq!(WorkerState::Idle.to_string(), "idle");
        assert_eq!(WorkerState::Poisoned.to_string(), "poisoned");
        assert!(WorkerState::Poisoned.is_poisoned());
        assert!(!WorkerState::Cleaning.is_poisoned());
    }

    #[test]
    fn exchange_starts_untagged() {
        let exchange = HttpExchange::request_only("GET", "http://example.test/app.js");
        assert!(exchange.correlation_id.is_none());
        assert!(exchange.response.is_none());
        assert_eq!(exchange.request.method, "GET");
    }

    #[test]
    fn exchange_serializes_with_tag() {
        let mut exchange = HttpExchange::request_only("POST", "http://example.test/api");
        exchange.correlation_id = Some("a1b2c3d4".into());

        let json = serde_json::to_value(&exchange).unwrap();
        assert_eq!(json["correlation_id"], "a1b2c3d4");
        assert_eq!(json["request"]["method"], "POST");
    }
}
