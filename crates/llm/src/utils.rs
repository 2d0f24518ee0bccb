use crate::{ApiError, ApiErrorContext, RateLimitHandler};
use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Check response error and extract rate limit information.
/// Returns Ok(Response) if successful, or an error with rate limit context if not.
pub async fn check_response_error<T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static>(
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limits = T::from_response(&response);
    let response_text = response
        .text()
        .await
        .map_err(|e| ApiError::NetworkError(e.to_string()))?;

    let error = match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(response_text),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ApiError::Authentication(response_text)
        }
        StatusCode::BAD_REQUEST => ApiError::InvalidRequest(response_text),
        status if status.is_server_error() => ApiError::ServiceError(response_text),
        _ => ApiError::Unknown(format!("Status {status}: {response_text}")),
    };

    Err(ApiErrorContext {
        error,
        rate_limits: Some(rate_limits),
    }
    .into())
}

/// Handle retryable errors and rate limiting.
/// Returns true if the error is retryable and we should continue the retry loop.
pub async fn handle_retryable_error<
    T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static,
>(
    error: &anyhow::Error,
    attempts: u32,
    max_retries: u32,
) -> bool {
    if let Some(ctx) = error.downcast_ref::<ApiErrorContext<T>>() {
        match &ctx.error {
            ApiError::RateLimit(_) => {
                if attempts < max_retries {
                    let delay = ctx
                        .rate_limits
                        .as_ref()
                        .map(|r| r.get_retry_delay())
                        .unwrap_or_else(|| Duration::from_secs(2u64.pow(attempts)));
                    warn!(
                        "Rate limit hit (attempt {}/{}), waiting {} seconds before retry",
                        attempts,
                        max_retries,
                        delay.as_secs()
                    );
                    sleep(delay).await;
                    return true;
                }
            }
            ApiError::ServiceError(_) | ApiError::NetworkError(_) => {
                if attempts < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempts));
                    warn!(
                        "Error: {} (attempt {}/{}), retrying in {} seconds",
                        error,
                        attempts,
                        max_retries,
                        delay.as_secs()
                    );
                    sleep(delay).await;
                    return true;
                }
            }
            _ => {
                warn!(
                    "Unhandled error (attempt {}/{}): {:?}",
                    attempts, max_retries, error
                );
            }
        }
    }
    false
}
