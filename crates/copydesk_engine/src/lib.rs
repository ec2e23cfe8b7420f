//! Copydesk engine: the reactive analysis pipeline and its HTTP client.
mod cache;
mod client;
mod debounce;
mod dedup;
mod engine;
mod retry;
mod stats;

pub use cache::ResultCache;
pub use client::{AnalysisClient, ClientSettings, HttpAnalysisClient};
pub use debounce::Debouncer;
pub use dedup::{RequestDeduplicator, SharedOutcome};
pub use engine::AnalysisEngine;
pub use retry::run_with_retry;
pub use stats::{CacheStats, EngineStats};
