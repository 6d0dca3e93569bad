use rfpflow_utils::error::{ErrorCategory, UserFriendlyError};
use rfpflow_utils::types::VendorId;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} named '{name}' already exists")]
    Duplicate { entity: &'static str, name: String },

    #[error("Vendor {0} does not exist")]
    InvalidVendor(VendorId),

    #[error("Invalid value: {0}")]
    Validation(String),

    #[error("Failed to persist state: {0}")]
    Persistence(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Persistence(_) => {
                Some("The in-memory state was left unchanged.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Duplicate { .. } => vec!["Choose a different name".to_string()],
            Self::Persistence(_) => vec!["Check that storage.state_file is writable".to_string()],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Duplicate { .. } | Self::InvalidVendor(_) | Self::Validation(_) => {
                ErrorCategory::Validation
            }
            Self::Persistence(_) => ErrorCategory::Storage,
        }
    }
}
