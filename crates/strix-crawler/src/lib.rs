//! Crawl orchestration over a bounded pool of headless-browser
//! workers.
//!
//! [`CrawlController`] borrows one worker per job, drives it through a
//! strict load → extract → cleanup pipeline, and forwards every HTTP
//! exchange captured during rendering to the caller's sink, tagged
//! with a per-job correlation id. Any worker-interface failure evicts
//! the worker and fails the job; healthy workers go back to the pool.

pub mod crawler;
pub mod sink;
pub mod strategy;
pub mod timing;

pub use crawler::{CrawlController, CrawlStats, CrawlerConfig};
pub use sink::TaggedTrafficSink;
pub use strategy::Strategy;
pub use timing::PhaseTimer;
