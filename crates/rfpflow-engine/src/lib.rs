//! Orchestration core of rfpflow
//!
//! [`Engine`] takes an RFP through its generation stages (analysis, vendor
//! matching, BoM, scope suggestion, proposal) against whichever provider is
//! selected in the registry. Every stage call goes through the [`Gateway`];
//! every write goes through the store as a whole-artifact swap.

mod engine;
mod error;
mod export;
mod extract;
mod gateway;
mod stages;

pub use engine::Engine;
pub use error::EngineError;
pub use export::{
    DocxRenderer, ExportedDocument, MarkdownRenderer, ProposalRenderer, normalize_section_key,
};
pub use extract::{extract_text, is_supported};
pub use gateway::{Gateway, GenerationRequest};
pub use stages::{
    ScopeSuggestion, parse_bom_items, parse_scope_suggestion, parse_sections,
    parse_vendor_matches, rank_matches, resolve_vendor,
};
