use rfpflow_utils::error::{ErrorCategory, UserFriendlyError};

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration value for '{key}' is invalid: {value}")
            }
            Self::NotFound { path } => format!("Configuration file '{path}' does not exist"),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is read from --config, RFPFLOW_CONFIG, or ./rfpflow.toml.".to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec!["Check the TOML syntax of the file".to_string()],
            Self::InvalidValue { key, .. } => {
                vec![format!("Fix '{key}' and restart the server")]
            }
            Self::NotFound { .. } => vec![
                "Pass an existing path to --config".to_string(),
                "Unset RFPFLOW_CONFIG to fall back to ./rfpflow.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}
