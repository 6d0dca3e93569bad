use rfpflow_lock::LockError;
use rfpflow_store::StoreError;
use rfpflow_utils::error::{ErrorCategory, LlmError, UserFriendlyError};
use rfpflow_utils::redaction::redact_secrets;
use rfpflow_utils::types::{RfpId, StageId, VendorId};
use thiserror::Error;

/// Failure of an engine operation.
///
/// Any variant returned from a stage run means nothing was written for that
/// stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Stage '{stage}' is already running for RFP {rfp_id}")]
    StageConflict { rfp_id: RfpId, stage: StageId },

    #[error("Cannot run stage '{stage}': {reason}")]
    PreconditionFailed { stage: StageId, reason: String },

    #[error("No AI provider is selected")]
    NoProviderSelected,

    #[error("Prompt '{prompt}' is missing context fields: {}", missing.join(", "))]
    PromptResolution { prompt: String, missing: Vec<String> },

    #[error(transparent)]
    Provider(LlmError),

    #[error("Unusable AI output for stage '{stage}': {reason}")]
    MalformedOutput { stage: StageId, reason: String },

    #[error("Vendor {0} does not exist")]
    InvalidVendor(VendorId),

    #[error("{0}")]
    Validation(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn malformed(stage: StageId, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            stage,
            reason: reason.into(),
        }
    }

    /// Message safe to log or send to a client.
    #[must_use]
    pub fn redacted_message(&self) -> String {
        redact_secrets(&self.to_string())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::InvalidVendor(id) => Self::InvalidVendor(id),
            StoreError::Duplicate { .. } | StoreError::Validation(_) => {
                Self::Validation(err.to_string())
            }
            StoreError::Persistence(msg) => Self::Storage(msg),
        }
    }
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        Self::Provider(err)
    }
}

impl From<LockError> for EngineError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::StageConflict { rfp_id, stage, .. } => Self::StageConflict { rfp_id, stage },
        }
    }
}

impl UserFriendlyError for EngineError {
    fn user_message(&self) -> String {
        match self {
            Self::Provider(err) => redact_secrets(&err.user_message()),
            _ => self.redacted_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::StageConflict { .. } => {
                Some("Only one run per stage and RFP may be in flight.".to_string())
            }
            Self::PreconditionFailed { stage, .. } => Some(format!(
                "Stage '{stage}' requires status '{}'.",
                stage.required_status()
            )),
            Self::Provider(err) => err.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::StageConflict { .. } => {
                vec!["Retry after the running stage finishes".to_string()]
            }
            Self::PreconditionFailed { stage, .. } if *stage != StageId::Analysis => {
                vec!["Run the analysis stage first".to_string()]
            }
            Self::PreconditionFailed { .. } => {
                vec!["Upload a text-based source document".to_string()]
            }
            Self::NoProviderSelected => vec![
                "Select a provider with PATCH /admin/config/providers/{id}/select".to_string(),
            ],
            Self::PromptResolution { prompt, .. } => {
                vec![format!("Review the placeholders of prompt '{prompt}'")]
            }
            Self::Provider(err) => err.suggestions(),
            Self::MalformedOutput { .. } => vec!["Re-trigger the stage".to_string()],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::StageConflict { .. } => ErrorCategory::Concurrency,
            Self::PreconditionFailed { .. } => ErrorCategory::Precondition,
            Self::NoProviderSelected | Self::PromptResolution { .. } => {
                ErrorCategory::Configuration
            }
            Self::Provider(err) => err.category(),
            Self::MalformedOutput { .. } => ErrorCategory::UpstreamFailure,
            Self::InvalidVendor(_) | Self::Validation(_) => ErrorCategory::Validation,
            Self::Export(_) => ErrorCategory::Export,
            Self::Storage(_) => ErrorCategory::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_errors_keep_their_class() {
        let err: EngineError = StoreError::InvalidVendor(VendorId(3)).into();
        assert_eq!(err, EngineError::InvalidVendor(VendorId(3)));
        let err: EngineError = StoreError::Persistence("disk full".into()).into();
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_provider_error_categories() {
        let timeout = EngineError::Provider(LlmError::Timeout {
            duration: Duration::from_secs(5),
        });
        assert_eq!(timeout.category(), ErrorCategory::UpstreamTimeout);
        assert_eq!(
            EngineError::Provider(LlmError::Misconfiguration("no key".into())).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_messages_are_redacted() {
        let err = EngineError::Provider(LlmError::Rejected(
            "bad key sk-abcdefghijklmnopqrstuvwx".into(),
        ));
        assert!(!err.redacted_message().contains("sk-abcdefghij"));
        assert!(!err.user_message().contains("sk-abcdefghij"));
    }
}
