//! Copydesk core: pure content model, configuration, and error taxonomy.
mod config;
mod error;
mod extract;
mod result;
mod state;

pub use config::{AnalysisConfig, ConfigPatch};
pub use error::AnalysisError;
pub use extract::{extract_content, fingerprint, ExtractedContent};
pub use result::{
    AnalysisRequest, AnalysisResult, AnnotatedContent, IssueCategory, IssueSpan, ProcessingInfo,
    QualityMetrics, SentenceReport, TextRange,
};
pub use state::AnalysisState;
