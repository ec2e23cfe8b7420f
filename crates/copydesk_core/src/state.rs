use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::{AnalysisError, AnalysisResult, ExtractedContent};

/// Snapshot the engine publishes after every observable transition.
///
/// Written by the pipeline only; subscribers receive clones. `result` keeps
/// the last successful analysis even when a later attempt sets `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisState {
    pub is_analyzing: bool,
    pub content: Option<ExtractedContent>,
    pub result: Option<Arc<AnalysisResult>>,
    pub error: Option<AnalysisError>,
    pub last_analyzed_at: Option<SystemTime>,
}
