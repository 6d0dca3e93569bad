//! HTTP surface of rfpflow
//!
//! Routes follow the paths the web client already calls. Every failure is
//! answered with a `{"detail": ...}` body; the status code carries the error
//! class.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use state::AppState;

/// Crate version reported by the health endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest accepted request body, uploads included
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;
