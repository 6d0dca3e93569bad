//! Shared HTTP client for the provider backends
//!
//! One `reqwest::Client` per process, reused by every backend so connections
//! are pooled. Responses are classified into [`LlmError`] variants here so the
//! backends only deal with successful bodies. Failed calls are not retried;
//! the caller decides whether to re-trigger the stage.

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use rfpflow_utils::error::LlmError;
use rfpflow_utils::redaction::redact_secrets;

/// Upper bound on any single HTTP call, whatever the stage asks for
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(600);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest provider error body excerpt kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Client,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_timeout,
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute a request with a bounded timeout and classify the outcome.
    ///
    /// Per-request timeout is `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the request does not complete in time
    /// - `Unavailable` for connection failures and 5xx responses
    /// - `RateLimited` for 429
    /// - `Rejected` for other 4xx responses (auth, policy, bad request)
    /// - `Misconfiguration` for 404 (wrong endpoint or model)
    pub async fn execute(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build request: {e}")))?;

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let body = response.text().await.unwrap_or_default();
                let error = map_status(status, &body, provider_name, effective_timeout);
                warn!(
                    provider = provider_name,
                    status = status.as_u16(),
                    kind = error.kind(),
                    "Provider returned error status"
                );
                Err(error)
            }
            Err(e) if e.is_timeout() => Err(LlmError::Timeout {
                duration: effective_timeout,
            }),
            Err(e) => Err(LlmError::Unavailable(format!(
                "{provider_name} request failed: {}",
                redact_secrets(&e.to_string())
            ))),
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    redact_secrets(&cut)
}

/// Map a non-success HTTP status to an [`LlmError`] variant.
pub(crate) fn map_status(
    status: StatusCode,
    body: &str,
    provider_name: &str,
    timeout: Duration,
) -> LlmError {
    let detail = excerpt(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::RateLimited(format!("{provider_name} rate limit exceeded ({status}): {detail}"))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            LlmError::Timeout { duration: timeout }
        }
        StatusCode::NOT_FOUND => LlmError::Misconfiguration(format!(
            "{provider_name} endpoint or model not found ({status}): {detail}"
        )),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Rejected(format!(
            "{provider_name} authentication failed ({status})"
        )),
        s if s.is_client_error() => {
            LlmError::Rejected(format!("{provider_name} rejected request ({status}): {detail}"))
        }
        _ => LlmError::Unavailable(format!(
            "{provider_name} returned server error ({status}): {detail}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(30);

    #[test]
    fn test_http_client_construction() {
        let client = HttpClient::with_max_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(client.max_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_map_429_to_rate_limited() {
        let err = map_status(StatusCode::TOO_MANY_REQUESTS, "slow down", "openai", T);
        assert!(matches!(err, LlmError::RateLimited(ref m) if m.contains("openai")));
    }

    #[test]
    fn test_map_auth_failures_to_rejected_without_body() {
        let err = map_status(
            StatusCode::UNAUTHORIZED,
            "invalid key sk-abcdefghijklmnopqrstuvwx",
            "openai",
            T,
        );
        match err {
            LlmError::Rejected(msg) => {
                assert!(msg.contains("401"));
                assert!(!msg.contains("sk-abcdefghijklmnop"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_map_policy_refusal_to_rejected() {
        let err = map_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"content_policy_violation"}}"#,
            "openrouter",
            T,
        );
        assert!(matches!(err, LlmError::Rejected(ref m) if m.contains("content_policy_violation")));
    }

    #[test]
    fn test_map_5xx_to_unavailable() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                map_status(status, "", "anthropic", T),
                LlmError::Unavailable(_)
            ));
        }
    }

    #[test]
    fn test_map_gateway_timeout_to_timeout() {
        assert_eq!(
            map_status(StatusCode::GATEWAY_TIMEOUT, "", "openai", T),
            LlmError::Timeout { duration: T }
        );
    }

    #[test]
    fn test_error_body_is_truncated() {
        let long = "x".repeat(2000);
        let err = map_status(StatusCode::BAD_REQUEST, &long, "openai", T);
        assert!(err.to_string().len() < 500);
    }
}
