use std::future::Future;
use std::time::Duration;

use copydesk_core::AnalysisError;
use copydesk_logging::desk_warn;

/// Runs `attempt` until it succeeds, fails terminally, or the retry budget
/// is spent. Only retryable errors consume the budget; the n-th retry waits
/// `n * base_delay` first. The error of the final attempt is returned.
pub async fn run_with_retry<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut attempt: F,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let mut retries_used = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retries_used < max_retries => {
                retries_used += 1;
                desk_warn!(
                    "analysis attempt failed, retry {retries_used}/{max_retries} pending: {err}"
                );
                tokio::time::sleep(base_delay * retries_used).await;
            }
            Err(err) => return Err(err),
        }
    }
}
