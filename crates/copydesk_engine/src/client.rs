use std::time::Duration;

use copydesk_core::{AnalysisError, AnalysisRequest, AnalysisResult};
use copydesk_logging::desk_error;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Content larger than this is rejected before any network call.
    pub max_content_bytes: usize,
}

impl ClientSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_content_bytes: 100 * 1024,
        }
    }
}

/// Outbound seam to the content-analysis service.
#[async_trait::async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl HttpAnalysisClient {
    pub fn new(settings: ClientSettings) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| AnalysisError::Network(err.to_string()))?;
        Ok(Self { client, settings })
    }
}

#[async_trait::async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        if request.content.len() > self.settings.max_content_bytes {
            return Err(AnalysisError::Validation(format!(
                "content exceeds {} bytes (actual {})",
                self.settings.max_content_bytes,
                request.content.len()
            )));
        }

        let response = self
            .client
            .post(&self.settings.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AnalysisError::Server {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }
        if !status.is_success() {
            return Err(AnalysisError::Validation(format!(
                "service rejected request: {status}"
            )));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        match serde_json::from_str::<AnalysisResult>(&body) {
            Ok(result) => Ok(result),
            Err(err) => {
                // A well-formed transport reply with a bad payload is an
                // integrity violation, not a connectivity problem.
                desk_error!("analysis response violated the wire contract: {err}");
                Err(AnalysisError::Protocol(err.to_string()))
            }
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        return AnalysisError::Network(format!("timed out: {err}"));
    }
    AnalysisError::Network(err.to_string())
}
