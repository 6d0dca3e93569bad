//! Records held by the store

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rfpflow_utils::types::{
    FileId, PromptId, ProposalId, ProviderId, RfpId, RfpStatus, ScopeId, StageId, VendorId,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// An immutable artifact produced by one stage run.
///
/// Regeneration builds a new `Versioned` and swaps the `Arc`; readers holding
/// the previous one keep a complete, consistent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub produced_at: DateTime<Utc>,
    pub value: T,
}

impl<T> Versioned<T> {
    #[must_use]
    pub fn first(value: T) -> Self {
        Self {
            version: 1,
            produced_at: Utc::now(),
            value,
        }
    }

    /// Successor of `previous` (or the first version when there is none).
    #[must_use]
    pub fn next_after(previous: Option<&Self>, value: T) -> Self {
        Self {
            version: previous.map_or(1, |p| p.version + 1),
            produced_at: Utc::now(),
            value,
        }
    }
}

/// One scored vendor from a matching run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorMatch {
    /// Vendor name as returned by the model
    pub vendor: String,
    /// Directory id, `None` when the name did not resolve
    pub vendor_id: Option<VendorId>,
    /// Fit score in `0..=100`
    pub score: u8,
    pub motivo: String,
}

/// One bill-of-materials line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItem {
    pub descricao: String,
    pub modelo: String,
    pub part_number: String,
    pub quantidade: u32,
}

pub type VendorMatchBlob = Arc<Versioned<Vec<VendorMatch>>>;
pub type BomSnapshot = Arc<Versioned<Vec<BomItem>>>;

/// An RFP moving through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfp {
    pub id: RfpId,
    pub nome: String,
    pub status: RfpStatus,
    /// Path of the most recently uploaded source document
    pub arquivo_url: Option<String>,
    pub resumo_ia: Option<String>,
    pub analise_vendors: Option<VendorMatchBlob>,
    pub fabricante_escolhido_id: Option<VendorId>,
    pub created_at: DateTime<Utc>,
}

impl Rfp {
    /// Whether `stage` may move this RFP forward: the status meets the
    /// stage's requirement and, past analysis, a summary exists.
    #[must_use]
    pub fn stage_ready(&self, stage: StageId) -> bool {
        let has_summary = stage == StageId::Analysis
            || self
                .resumo_ia
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
        has_summary && self.status.at_least(stage.required_status())
    }

    /// Advance to the status `stage` completes. Status stays put when the
    /// stage is not ready; returns whether it was recorded.
    pub fn record_stage(&mut self, stage: StageId) -> bool {
        if !self.stage_ready(stage) {
            return false;
        }
        self.status = self.status.advance(stage.completed_status());
        true
    }
}

/// Uploaded source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfpFile {
    pub id: FileId,
    pub rfp_id: RfpId,
    pub filename: String,
    pub stored_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub id: ScopeId,
    pub rfp_id: RfpId,
    pub titulo: String,
    pub descricao: String,
    pub created_at: DateTime<Utc>,
}

/// The single active technical proposal of an RFP.
///
/// `revision` increases on every write, AI regeneration and human save
/// alike. Concurrent writers are last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub rfp_id: RfpId,
    pub dados: IndexMap<String, String>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only vendor directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub nome: String,
    pub tecnologias: String,
    pub produtos: String,
    pub certificacoes: String,
    pub requisitos_atendidos: String,
}

/// Provider row. The credential stays inside the store and the engine; the
/// HTTP surface only ever sees [`ProviderView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub name: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Provider as exposed to admins
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderView {
    pub id: ProviderId,
    pub name: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewProvider {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub is_selected: bool,
}

/// Partial update; absent fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: PromptId,
    pub name: String,
    pub description: String,
    pub texto: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewPrompt {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub texto: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub texto: Option<String>,
}
