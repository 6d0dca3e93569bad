//! Entity store for rfpflow
//!
//! Holds RFP records and their stage artifacts, uploaded-file metadata, scope
//! entries and proposals, together with the provider registry, the prompt
//! store and the read-only vendor directory.
//!
//! Per-stage artifacts (vendor-match blob, BoM snapshot) are immutable
//! [`Versioned`] values behind `Arc`, replaced as a unit on regeneration.

mod error;
mod model;
mod registry;
mod rfps;
mod store;

pub use error::{StoreError, StoreResult};
pub use model::*;
pub use store::Store;
