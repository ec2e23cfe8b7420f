//! Wire model for the content-analysis service. Field names follow the
//! service's camelCase JSON contract.

use serde::{Deserialize, Serialize};

/// Payload sent to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Half-open character range into the analyzed plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Grammar,
    Clarity,
    Style,
    Tone,
    /// Categories the service added after this client was built.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSpan {
    pub range: TextRange,
    pub category: IssueCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// The content surface with the service's issue markup applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedContent {
    pub html: String,
    pub issues: Vec<IssueSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceReport {
    pub range: TextRange,
    pub score: f32,
    pub issue_indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub overall_score: f32,
    pub clarity_score: f32,
    pub grammar_score: f32,
    pub word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInfo {
    pub model_version: String,
    pub duration_ms: u64,
}

/// Complete analysis of one content snapshot.
///
/// Every substructure is required: a response missing one fails
/// deserialization and is treated as a protocol violation, never silently
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub annotated: AnnotatedContent,
    pub sentences: Vec<SentenceReport>,
    pub metrics: QualityMetrics,
    pub processing: ProcessingInfo,
}
