//! Stage definitions
//!
//! Each stage separates its concerns into four steps, run in order by the
//! engine while it holds the stage's guard:
//! - `prepare()`: check stage-specific inputs and build the prompt context
//! - the gateway call (skipped when `prepare()` already has the answer)
//! - `postprocess()`: parse the model's raw text into the stage's artifact
//! - `commit()`: swap the artifact into the store
//!
//! Nothing is written before `commit()`, so a failure in any earlier step
//! leaves the RFP exactly as it was.

mod analysis;
mod bom;
mod proposal;
mod scope;
mod vendor_match;

pub(crate) use analysis::Analysis;
pub(crate) use bom::BomGeneration;
pub(crate) use proposal::ProposalGeneration;
pub(crate) use scope::ScopeSuggestionStage;
pub(crate) use vendor_match::VendorMatching;

pub use bom::parse_bom_items;
pub use proposal::parse_sections;
pub use scope::{ScopeSuggestion, parse_scope_suggestion};
pub use vendor_match::{parse_vendor_matches, rank_matches, resolve_vendor};

use once_cell::sync::Lazy;
use regex::Regex;
use rfpflow_prompt_template::PromptContext;
use rfpflow_store::{Rfp, Store, Vendor};
use rfpflow_utils::types::{RfpId, StageId};

use crate::error::EngineError;

/// Outcome of [`Stage::prepare`]
pub(crate) enum Preparation<T> {
    /// Call the provider with this context
    Invoke(PromptContext),
    /// The artifact is known without asking the provider
    Skip(T),
}

pub(crate) trait Stage {
    /// Artifact parsed from the model output
    type Parsed: Send;
    /// What the caller gets back after commit
    type Output;

    fn id(&self) -> StageId;

    fn system_prompt(&self) -> Option<&'static str> {
        None
    }

    fn user_prompt(&self) -> &'static str;

    fn prepare(&self, rfp: &Rfp, store: &Store) -> Result<Preparation<Self::Parsed>, EngineError>;

    fn postprocess(&self, raw: &str, store: &Store) -> Result<Self::Parsed, EngineError>;

    fn commit(
        &self,
        rfp_id: RfpId,
        parsed: Self::Parsed,
        store: &Store,
    ) -> Result<Self::Output, EngineError>;
}

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[.*\]").unwrap_or_else(|e| unreachable!("array pattern is valid: {e}"))
});

/// First `[` through last `]` of `raw`: models like to wrap JSON in prose
/// or code fences.
pub(crate) fn extract_json_array(raw: &str) -> Option<&str> {
    JSON_ARRAY.find(raw).map(|m| m.as_str())
}

/// The analysis summary every downstream stage builds on.
pub(crate) fn require_summary(rfp: &Rfp, stage: StageId) -> Result<String, EngineError> {
    rfp.resumo_ia
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EngineError::PreconditionFailed {
            stage,
            reason: format!("RFP {} has no analysis summary", rfp.id),
        })
}

/// Block describing the chosen vendor for BoM and proposal prompts.
pub(crate) fn chosen_vendor_info(rfp: &Rfp, store: &Store) -> String {
    let vendor: Option<Vendor> = rfp
        .fabricante_escolhido_id
        .and_then(|id| store.get_vendor(id).ok());
    match vendor {
        Some(v) => format!(
            "Nome: {}\nTecnologias: {}\nProdutos: {}\nCertificações: {}\nRequisitos Atendidos: {}",
            v.nome, v.tecnologias, v.produtos, v.certificacoes, v.requisitos_atendidos
        ),
        None => "Nenhum fabricante selecionado".to_string(),
    }
}
