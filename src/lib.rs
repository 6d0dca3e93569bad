//! rfpflow - staged AI pipeline for RFP responses
//!
//! An RFP is uploaded, analyzed, matched against a vendor roster, broken down
//! into a bill of materials and service scope, and finally composed into a
//! technical proposal. Each stage calls whichever AI provider an admin has
//! selected, may be re-triggered at any time, and never leaves a half-written
//! artifact behind.
//!
//! # Quick Start
//!
//! ```bash
//! # Serve the HTTP API on the configured address
//! rfpflow serve --config rfpflow.toml
//!
//! # Show the effective configuration
//! rfpflow config --sources
//! ```
//!
//! # Library use
//!
//! [`app::open_store`] and [`app::build_router`] assemble the same service
//! the binary runs, with any [`BackendFactory`](rfpflow_llm::BackendFactory);
//! tests plug in a scripted backend that never touches the network.
//!
//! # Crates
//!
//! - `rfpflow-engine`: stage engine, generation gateway, composers, export
//! - `rfpflow-store`: RFP artifacts, provider registry, prompt store, vendors
//! - `rfpflow-llm`: provider backends behind the `LlmBackend` trait
//! - `rfpflow-api`: axum routes
//! - `rfpflow-config`: `rfpflow.toml` discovery and validation

pub mod app;
pub mod cli;

pub use rfpflow_api::{AppState, create_router};
pub use rfpflow_config::{CliArgs, Config, ConfigError};
pub use rfpflow_engine::{Engine, EngineError};
pub use rfpflow_store::{Store, StoreError};
pub use rfpflow_utils::{ExitCode, RfpId, RfpStatus, StageId};
