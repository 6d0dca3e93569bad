//! Logging and observability infrastructure for rfpflow
//!
//! Structured logging is built on `tracing`. Every stage run is wrapped in a
//! `stage_execution` span carrying `rfp_id`, `stage` and `provider`, so log
//! lines emitted by the gateway and backends inherit that context.

use std::io::IsTerminal;
use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_secrets;

/// Check if colored output should be used.
///
/// Returns true only if stdout is a terminal and `NO_COLOR` is unset.
fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects between
/// `rfpflow=debug,info` and `rfpflow=info,warn`. With `json` set, lines are
/// emitted as JSON objects for log shippers; otherwise a compact
/// human-readable format is used.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("rfpflow=debug,tower_http=debug,info")
            } else {
                EnvFilter::try_new("rfpflow=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init()?;
    } else if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Create a span for one stage run.
#[must_use]
pub fn stage_span(rfp_id: u64, stage: &str, provider: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "stage_execution",
        rfp_id = rfp_id,
        stage = %stage,
        provider = %provider,
    )
}

pub fn log_stage_start(rfp_id: u64, stage: &str, provider: &str) {
    info!(
        rfp_id = rfp_id,
        stage = %stage,
        provider = %provider,
        "Starting stage execution"
    );
}

pub fn log_stage_complete(rfp_id: u64, stage: &str, duration_ms: u128) {
    info!(
        rfp_id = rfp_id,
        stage = %stage,
        duration_ms = %duration_ms,
        "Stage execution completed"
    );
}

/// Log a stage failure. The error text is redacted before it is written.
pub fn log_stage_error(rfp_id: u64, stage: &str, error: &str, duration_ms: u128) {
    let sanitized_error = redact_secrets(error);

    error!(
        rfp_id = rfp_id,
        stage = %stage,
        duration_ms = %duration_ms,
        error = %sanitized_error,
        "Stage execution failed"
    );
}

/// Log a rejected re-entrant trigger.
pub fn log_stage_conflict(rfp_id: u64, stage: &str) {
    warn!(
        rfp_id = rfp_id,
        stage = %stage,
        "Stage already in flight, rejecting trigger"
    );
}
