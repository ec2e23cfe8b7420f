use serde::Serialize;

use copydesk_core::{AnalysisConfig, AnalysisState};

/// Point-in-time diagnostics for one engine instance.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub active_requests: usize,
    pub cache: CacheStats,
    pub config: AnalysisConfig,
    pub state: AnalysisState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}
