pub mod error;
pub mod models;
pub mod testutil;
pub mod traits;
pub mod util;

pub use error::{CrawlError, PoolError, StrategyError, WorkerError};
pub use models::{HttpExchange, HttpRequest, HttpResponse, JsError, WorkerState};
pub use traits::{DomConsumer, NullDomConsumer, TrafficSink, Worker, WorkerPool};
pub use util::correlation_id;
