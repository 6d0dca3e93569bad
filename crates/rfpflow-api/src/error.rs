//! API error envelope
//!
//! Engine and store failures are mapped onto HTTP status codes by their
//! [`ErrorCategory`]. Message text is redacted before it leaves the process.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rfpflow_engine::EngineError;
use rfpflow_store::StoreError;
use rfpflow_utils::error::{ErrorCategory, UserFriendlyError};
use rfpflow_utils::redaction::redact_secrets;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Resource that has no engine-level identity, e.g. "the selected provider"
    #[error("{0}")]
    NotFound(String),

    /// Path or body could not be decoded into the expected shape
    #[error("{0}")]
    InvalidRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Engine(err.into())
    }
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(err) => status_for(err.category()),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// HTTP status for an error class
#[must_use]
pub const fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Concurrency => StatusCode::CONFLICT,
        ErrorCategory::Precondition | ErrorCategory::Configuration | ErrorCategory::Validation => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCategory::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorCategory::UpstreamThrottled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Export | ErrorCategory::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Items(Vec<DetailItem>),
}

#[derive(Debug, Serialize)]
struct DetailItem {
    msg: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: Detail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Engine(err) => Detail::Message(err.redacted_message()),
            Self::NotFound(msg) => Detail::Message(msg.clone()),
            Self::InvalidRequest(msg) => Detail::Items(vec![DetailItem {
                msg: redact_secrets(msg),
            }]),
        };

        if status.is_server_error() {
            let suggestions = match &self {
                Self::Engine(err) => err.suggestions(),
                _ => Vec::new(),
            };
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(status = %status, error = ?detail, "Request failed");
            } else {
                warn!(status = %status, error = ?detail, suggestions = ?suggestions, "Upstream failure");
            }
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfpflow_utils::error::LlmError;
    use rfpflow_utils::types::{RfpId, StageId};
    use std::time::Duration;

    #[test]
    fn test_engine_errors_map_to_statuses() {
        let cases = [
            (
                EngineError::StageConflict {
                    rfp_id: RfpId(1),
                    stage: StageId::Bom,
                },
                StatusCode::CONFLICT,
            ),
            (EngineError::NoProviderSelected, StatusCode::UNPROCESSABLE_ENTITY),
            (
                EngineError::Provider(LlmError::RateLimited("429".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                EngineError::Provider(LlmError::Timeout {
                    duration: Duration::from_secs(5),
                }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                EngineError::Provider(LlmError::Rejected("401".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EngineError::Export("empty".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_store_not_found_is_404() {
        let err = ApiError::from(StoreError::NotFound {
            entity: "RFP",
            id: "9".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_detail_shapes() {
        let message = serde_json::to_value(ErrorBody {
            detail: Detail::Message("RFP 9 not found".into()),
        })
        .unwrap();
        assert_eq!(message, serde_json::json!({"detail": "RFP 9 not found"}));

        let items = serde_json::to_value(ErrorBody {
            detail: Detail::Items(vec![DetailItem {
                msg: "missing field `nome`".into(),
            }]),
        })
        .unwrap();
        assert_eq!(
            items,
            serde_json::json!({"detail": [{"msg": "missing field `nome`"}]})
        );
    }
}
