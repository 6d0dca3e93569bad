//! Request and response bodies
//!
//! Field names follow what the web client sends and reads.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rfpflow_store::{Proposal, Rfp, RfpFile, VendorMatch};
use rfpflow_utils::types::{FileId, ProposalId, RfpId, RfpStatus, VendorId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateRfpRequest {
    pub nome: String,
}

#[derive(Debug, Serialize)]
pub struct RfpResponse {
    pub id: RfpId,
    pub nome: String,
    pub status: RfpStatus,
    pub arquivo_url: Option<String>,
    pub resumo_ia: Option<String>,
    /// Latest vendor-match list, `null` before any matching run
    pub analise_vendors: Option<Vec<VendorMatch>>,
    pub analise_vendors_version: Option<u64>,
    pub fabricante_escolhido_id: Option<VendorId>,
    pub created_at: DateTime<Utc>,
}

impl From<Rfp> for RfpResponse {
    fn from(rfp: Rfp) -> Self {
        let (analise_vendors, analise_vendors_version) = match rfp.analise_vendors {
            Some(blob) => (Some(blob.value.clone()), Some(blob.version)),
            None => (None, None),
        };
        Self {
            id: rfp.id,
            nome: rfp.nome,
            status: rfp.status,
            arquivo_url: rfp.arquivo_url,
            resumo_ia: rfp.resumo_ia,
            analise_vendors,
            analise_vendors_version,
            fabricante_escolhido_id: rfp.fabricante_escolhido_id,
            created_at: rfp.created_at,
        }
    }
}

/// Stored file reference; the on-disk path stays server-side
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: FileId,
    pub rfp_id: RfpId,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl From<RfpFile> for FileResponse {
    fn from(file: RfpFile) -> Self {
        Self {
            id: file.id,
            rfp_id: file.rfp_id,
            filename: file.filename,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub resumo: String,
}

/// `analise` is the match list as JSON text; a JSON array is accepted too.
#[derive(Debug, Deserialize)]
pub struct SaveVendorAnalysisRequest {
    pub analise: serde_json::Value,
}

impl SaveVendorAnalysisRequest {
    #[must_use]
    pub fn as_text(&self) -> String {
        match &self.analise {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetVendorRequest {
    pub fabricante_escolhido_id: VendorId,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScopeRequest {
    pub titulo: String,
    #[serde(default)]
    pub descricao: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveProposalRequest {
    pub dados_json: IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub id: ProposalId,
    pub rfp_id: RfpId,
    pub dados_json: IndexMap<String, String>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Proposal> for ProposalResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            id: proposal.id,
            rfp_id: proposal.rfp_id,
            dados_json: proposal.dados,
            revision: proposal.revision,
            created_at: proposal.created_at,
            updated_at: proposal.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_analysis_accepts_text_or_array() {
        let text: SaveVendorAnalysisRequest =
            serde_json::from_str(r#"{"analise": "[{\"vendor\": \"A\", \"score\": 1}]"}"#).unwrap();
        assert_eq!(text.as_text(), r#"[{"vendor": "A", "score": 1}]"#);

        let array: SaveVendorAnalysisRequest =
            serde_json::from_str(r#"{"analise": [{"vendor": "A", "score": 1}]}"#).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&array.as_text()).unwrap();
        assert_eq!(reparsed, serde_json::json!([{"vendor": "A", "score": 1}]));
    }
}
