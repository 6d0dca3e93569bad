use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors, used by the HTTP surface to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing RFP, vendor, provider, prompt, proposal or scope entry.
    NotFound,
    /// Re-entrant trigger of an in-flight stage.
    Concurrency,
    /// Required upstream artifact missing.
    Precondition,
    /// Operator-fixable misconfiguration (no provider selected, bad prompt).
    Configuration,
    /// Caller-supplied data failed validation.
    Validation,
    /// Upstream provider failed to produce a usable answer.
    UpstreamFailure,
    /// Upstream provider throttled the request.
    UpstreamThrottled,
    /// Upstream provider did not answer within the bounded timeout.
    UpstreamTimeout,
    /// Document rendering failed.
    Export,
    /// Persistence layer failure.
    Storage,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not Found"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::Precondition => write!(f, "Precondition"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::UpstreamFailure => write!(f, "Upstream Failure"),
            Self::UpstreamThrottled => write!(f, "Upstream Throttled"),
            Self::UpstreamTimeout => write!(f, "Upstream Timeout"),
            Self::Export => write!(f, "Export"),
            Self::Storage => write!(f, "Storage"),
        }
    }
}

/// Classified failure of a single generation call.
///
/// Every variant leaves persisted RFP state untouched; the stage engine only
/// writes after a successful, parsed result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider unreachable, connection reset, or 5xx outage
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider throttled the request (429)
    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    /// Provider refused the request (auth failure, content or policy rejection)
    #[error("Provider rejected request: {0}")]
    Rejected(String),

    /// Invocation exceeded the bounded gateway timeout
    #[error("Provider timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Provider row or backend settings cannot produce a working client
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Provider answered with a body that is not a chat completion
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl LlmError {
    /// Stable machine-readable kind, used in structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "provider_unavailable",
            Self::RateLimited(_) => "provider_rate_limited",
            Self::Rejected(_) => "provider_rejected",
            Self::Timeout { .. } => "provider_timeout",
            Self::Misconfiguration(_) => "misconfiguration",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Unavailable(msg) => format!("AI provider is unavailable: {msg}"),
            Self::RateLimited(msg) => format!("AI provider rate limit reached: {msg}"),
            Self::Rejected(msg) => format!("AI provider rejected the request: {msg}"),
            Self::Timeout { duration } => {
                format!("AI provider did not answer within {}s", duration.as_secs())
            }
            Self::Misconfiguration(msg) => format!("AI provider configuration error: {msg}"),
            Self::MalformedResponse(msg) => format!("AI provider sent an unusable answer: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Unavailable(_) | Self::MalformedResponse(_) => Some(
                "The provider could not be reached or returned an unexpected payload.".to_string(),
            ),
            Self::RateLimited(_) => {
                Some("Rate limits are enforced by the provider account.".to_string())
            }
            Self::Rejected(_) => Some(
                "Rejections usually mean an invalid API key or a content-policy refusal."
                    .to_string(),
            ),
            Self::Timeout { .. } => {
                Some("Every generation call has a bounded timeout.".to_string())
            }
            Self::Misconfiguration(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Unavailable(_) | Self::MalformedResponse(_) => vec![
                "Retry the stage once the provider recovers".to_string(),
                "Check the provider base URL".to_string(),
            ],
            Self::RateLimited(_) => vec!["Wait before re-triggering the stage".to_string()],
            Self::Rejected(_) => vec![
                "Verify the API key of the selected provider".to_string(),
                "Review the prompt template for policy-sensitive content".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase stage_timeout_secs in rfpflow.toml".to_string(),
                "Select a faster model".to_string(),
            ],
            Self::Misconfiguration(_) => {
                vec!["Review the provider in /admin/config/providers".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Unavailable(_) | Self::Rejected(_) | Self::MalformedResponse(_) => {
                ErrorCategory::UpstreamFailure
            }
            Self::RateLimited(_) => ErrorCategory::UpstreamThrottled,
            Self::Timeout { .. } => ErrorCategory::UpstreamTimeout,
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
        }
    }
}
