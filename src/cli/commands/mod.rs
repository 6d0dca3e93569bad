//! Command implementations

pub(super) mod config;
pub(super) mod serve;

use rfpflow_config::ConfigError;
use rfpflow_store::StoreError;
use rfpflow_utils::error::UserFriendlyError;
use rfpflow_utils::redaction::redact_secrets;

/// Print an error with the context and suggestions its type carries.
pub(super) fn report_error(err: &anyhow::Error, operation: &str) {
    let friendly: Option<&dyn UserFriendlyError> = err
        .downcast_ref::<ConfigError>()
        .map(|e| e as &dyn UserFriendlyError)
        .or_else(|| {
            err.downcast_ref::<StoreError>()
                .map(|e| e as &dyn UserFriendlyError)
        });

    match friendly {
        Some(friendly) => {
            eprintln!("✗ {operation}: {}", redact_secrets(&friendly.user_message()));
            if let Some(context) = friendly.context() {
                eprintln!("  {context}");
            }
            for suggestion in friendly.suggestions() {
                eprintln!("  → {suggestion}");
            }
        }
        None => eprintln!("✗ {operation}: {}", redact_secrets(&format!("{err:#}"))),
    }
}
