use std::time::Duration;

use serde::{Serialize, Serializer};

/// Tuning knobs for the analysis pipeline.
///
/// A run captures the config it starts with; updating the engine's config
/// affects subsequent runs only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    /// Quiet period a burst of edits must observe before one run proceeds.
    #[serde(serialize_with = "millis", rename = "debounce_ms")]
    pub debounce: Duration,
    /// Content below this many characters is dropped without analysis.
    pub min_content_length: u32,
    /// Extra attempts after the initial one, for retryable failures only.
    pub max_retries: u32,
    /// Base retry delay; the n-th retry waits n times this.
    #[serde(serialize_with = "millis", rename = "retry_delay_ms")]
    pub retry_delay: Duration,
    pub enable_deduplication: bool,
    pub enable_caching: bool,
    /// Maximum age before a cached result is considered stale.
    #[serde(serialize_with = "millis", rename = "cache_expiry_ms")]
    pub cache_expiry: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            min_content_length: 10,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            enable_deduplication: true,
            enable_caching: true,
            cache_expiry: Duration::from_millis(300_000),
        }
    }
}

impl AnalysisConfig {
    /// Returns a copy with every populated patch field applied.
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        Self {
            debounce: patch.debounce.unwrap_or(self.debounce),
            min_content_length: patch.min_content_length.unwrap_or(self.min_content_length),
            max_retries: patch.max_retries.unwrap_or(self.max_retries),
            retry_delay: patch.retry_delay.unwrap_or(self.retry_delay),
            enable_deduplication: patch
                .enable_deduplication
                .unwrap_or(self.enable_deduplication),
            enable_caching: patch.enable_caching.unwrap_or(self.enable_caching),
            cache_expiry: patch.cache_expiry.unwrap_or(self.cache_expiry),
        }
    }
}

/// Partial overlay for [`AnalysisConfig`]; `None` fields keep their current
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub debounce: Option<Duration>,
    pub min_content_length: Option<u32>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub enable_deduplication: Option<bool>,
    pub enable_caching: Option<bool>,
    pub cache_expiry: Option<Duration>,
}

fn millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(value.as_millis() as u64)
}
