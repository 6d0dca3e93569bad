//! Configuration for rfpflow
//!
//! Hierarchical configuration with discovery and precedence CLI > file >
//! defaults, read from `rfpflow.toml`.

mod discovery;
mod error;
mod model;
mod sources;
mod validation;

pub use error::ConfigError;
pub use model::*;
