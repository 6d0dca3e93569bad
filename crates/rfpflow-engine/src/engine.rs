//! RFP stage engine
//!
//! Runs stages under the per-`(RfpId, StageId)` guard and owns every write a
//! stage makes. The control flow of one trigger:
//!
//! ```text
//! trigger ─> RFP exists? ─> acquire guard ─> status precondition
//!         ─> prepare ─> gateway ─> postprocess ─> commit ─> release guard
//! ```
//!
//! The guard is an RAII value, so it is released on every exit path
//! including errors, timeouts and panics.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rfpflow_config::{Config, StageSettings};
use rfpflow_llm::BackendFactory;
use rfpflow_lock::StageLocks;
use rfpflow_store::{BomItem, Proposal, Rfp, RfpFile, Store, VendorMatch};
use rfpflow_utils::logging::{
    log_stage_complete, log_stage_conflict, log_stage_error, log_stage_start, stage_span,
};
use rfpflow_utils::types::{ProposalId, RfpId, StageId, VendorId};
use tracing::{Instrument, debug, info, warn};

use crate::error::EngineError;
use crate::export::{DocxRenderer, ExportedDocument, ProposalRenderer};
use crate::extract;
use crate::gateway::{Gateway, GenerationRequest};
use crate::stages::{
    Analysis, BomGeneration, Preparation, ProposalGeneration, ScopeSuggestion,
    ScopeSuggestionStage, Stage, VendorMatching, parse_vendor_matches,
};

/// Orchestration core shared by every request handler
#[derive(Clone)]
pub struct Engine {
    store: Store,
    gateway: Gateway,
    locks: StageLocks,
    settings: BTreeMap<StageId, StageSettings>,
    upload_dir: PathBuf,
    renderer: Arc<dyn ProposalRenderer>,
}

impl Engine {
    pub fn new(store: Store, factory: Arc<dyn BackendFactory>, config: &Config) -> Self {
        let settings = StageId::ALL
            .iter()
            .map(|stage| (*stage, config.stage_settings(*stage)))
            .collect();
        Self {
            gateway: Gateway::new(store.clone(), factory),
            store,
            locks: StageLocks::new(),
            settings,
            upload_dir: config.storage.upload_dir.clone(),
            renderer: Arc::new(DocxRenderer),
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ProposalRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn locks(&self) -> &StageLocks {
        &self.locks
    }

    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    fn settings_for(&self, stage: StageId) -> StageSettings {
        self.settings
            .get(&stage)
            .copied()
            .unwrap_or_else(|| Config::default().stage_settings(stage))
    }

    /// Analyze every uploaded document and store the summary.
    ///
    /// # Errors
    ///
    /// `NotFound`, `StageConflict`, `PreconditionFailed` (no document, or
    /// none with extractable text), or any gateway error.
    pub async fn analyze(&self, rfp_id: RfpId) -> Result<String, EngineError> {
        self.run(rfp_id, &Analysis).await
    }

    /// Score every vendor against the analysis and store the ranked list.
    ///
    /// # Errors
    ///
    /// As [`Engine::analyze`]; unparseable output is `MalformedOutput`.
    pub async fn match_vendors(&self, rfp_id: RfpId) -> Result<Vec<VendorMatch>, EngineError> {
        self.run(rfp_id, &VendorMatching).await
    }

    /// Generate and store a new BoM, replacing the previous one.
    ///
    /// # Errors
    ///
    /// As [`Engine::analyze`]; unparseable output is `MalformedOutput`.
    pub async fn generate_bom(&self, rfp_id: RfpId) -> Result<Vec<BomItem>, EngineError> {
        self.run(rfp_id, &BomGeneration).await
    }

    /// Draft a scope entry. Nothing is stored.
    ///
    /// # Errors
    ///
    /// As [`Engine::analyze`].
    pub async fn suggest_scope(&self, rfp_id: RfpId) -> Result<ScopeSuggestion, EngineError> {
        self.run(rfp_id, &ScopeSuggestionStage).await
    }

    /// Generate the proposal and store it as the RFP's active proposal.
    ///
    /// # Errors
    ///
    /// As [`Engine::analyze`]; output without sections is `MalformedOutput`.
    pub async fn generate_proposal(&self, rfp_id: RfpId) -> Result<Proposal, EngineError> {
        self.run(rfp_id, &ProposalGeneration).await
    }

    async fn run<S>(&self, rfp_id: RfpId, stage: &S) -> Result<S::Output, EngineError>
    where
        S: Stage + Sync,
    {
        let stage_id = stage.id();
        self.store.get_rfp(rfp_id)?;

        let _guard = self.locks.try_acquire(rfp_id, stage_id).map_err(|e| {
            log_stage_conflict(rfp_id.get(), stage_id.as_str());
            EngineError::from(e)
        })?;

        let rfp = self.store.get_rfp(rfp_id)?;
        let required = stage_id.required_status();
        if !rfp.status.at_least(required) {
            return Err(EngineError::PreconditionFailed {
                stage: stage_id,
                reason: format!(
                    "RFP {rfp_id} is '{}', stage needs '{required}'",
                    rfp.status
                ),
            });
        }

        let provider = self
            .store
            .selected_provider()
            .map_or_else(|| "none".to_string(), |p| p.name);
        let span = stage_span(rfp_id.get(), stage_id.as_str(), &provider);
        let started = Instant::now();

        let result = async {
            log_stage_start(rfp_id.get(), stage_id.as_str(), &provider);
            self.execute(&rfp, stage).await
        }
        .instrument(span)
        .await;

        let elapsed = started.elapsed().as_millis();
        match &result {
            Ok(_) => log_stage_complete(rfp_id.get(), stage_id.as_str(), elapsed),
            Err(e) => log_stage_error(rfp_id.get(), stage_id.as_str(), &e.to_string(), elapsed),
        }
        result
    }

    async fn execute<S>(&self, rfp: &Rfp, stage: &S) -> Result<S::Output, EngineError>
    where
        S: Stage + Sync,
    {
        let stage_id = stage.id();
        let parsed = match stage.prepare(rfp, &self.store)? {
            Preparation::Skip(parsed) => {
                debug!(stage = %stage_id, "Stage needs no provider call");
                parsed
            }
            Preparation::Invoke(context) => {
                let result = self
                    .gateway
                    .invoke(GenerationRequest {
                        rfp_id: rfp.id,
                        stage: stage_id,
                        system_prompt: stage.system_prompt(),
                        user_prompt: stage.user_prompt(),
                        context: &context,
                        settings: self.settings_for(stage_id),
                    })
                    .await?;
                debug!(
                    stage = %stage_id,
                    model = %result.model_used,
                    tokens_input = ?result.tokens_input,
                    tokens_output = ?result.tokens_output,
                    response_chars = result.raw_response.len(),
                    "Provider answered"
                );
                stage.postprocess(&result.raw_response, &self.store)?
            }
        };
        stage.commit(rfp.id, parsed, &self.store)
    }

    /// Replace the vendor-match blob with a client-supplied JSON list.
    /// Status moves to `VendorsMatched` only once the RFP is analyzed.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown RFP, `Validation` when `analise` is not a
    /// JSON list of matches.
    pub fn save_vendor_analysis(
        &self,
        rfp_id: RfpId,
        analise: &str,
    ) -> Result<Vec<VendorMatch>, EngineError> {
        self.store.get_rfp(rfp_id)?;
        let trimmed = analise.trim();
        if !trimmed.starts_with('[') {
            return Err(EngineError::Validation(
                "analise must be a JSON list of vendor matches".to_string(),
            ));
        }
        let matches = parse_vendor_matches(trimmed, &self.store.list_vendors())
            .map_err(EngineError::Validation)?;
        let blob = self.store.commit_vendor_matches(rfp_id, matches)?;
        info!(rfp_id = %rfp_id, entries = blob.value.len(), "Saved vendor analysis");
        Ok(blob.value.clone())
    }

    /// Set the RFP's chosen vendor, with or without a prior matching run.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown RFP, `InvalidVendor` for an unknown vendor.
    pub fn select_vendor(&self, rfp_id: RfpId, vendor_id: VendorId) -> Result<Rfp, EngineError> {
        let rfp = self.store.set_chosen_vendor(rfp_id, vendor_id)?;
        info!(rfp_id = %rfp_id, vendor_id = %vendor_id, "Chosen vendor set");
        Ok(rfp)
    }

    /// Overwrite a proposal's sections verbatim.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown proposal.
    pub fn save_proposal(
        &self,
        id: ProposalId,
        dados: IndexMap<String, String>,
    ) -> Result<Proposal, EngineError> {
        Ok(self.store.save_proposal(id, dados)?)
    }

    /// Render a proposal into a document.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown proposal, `Export` when rendering fails.
    pub fn export_proposal(&self, id: ProposalId) -> Result<ExportedDocument, EngineError> {
        let proposal = self.store.get_proposal(id)?;
        self.renderer.render(&proposal)
    }

    /// Render the active proposal of an RFP.
    ///
    /// # Errors
    ///
    /// `NotFound` when the RFP or its proposal does not exist, `Export` when
    /// rendering fails.
    pub fn export_proposal_for_rfp(&self, rfp_id: RfpId) -> Result<ExportedDocument, EngineError> {
        let proposal = self
            .store
            .proposal_for_rfp(rfp_id)?
            .ok_or_else(|| EngineError::not_found("Proposal for RFP", rfp_id))?;
        self.renderer.render(&proposal)
    }

    /// Store an uploaded document under the upload directory and record it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown RFP, `Validation` for an empty file name,
    /// `Storage` when the file cannot be written.
    pub async fn upload(
        &self,
        rfp_id: RfpId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<RfpFile, EngineError> {
        self.store.get_rfp(rfp_id)?;

        let safe_name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| EngineError::Validation("file name must not be empty".to_string()))?
            .to_string();
        if !extract::is_supported(&safe_name) {
            warn!(
                rfp_id = %rfp_id,
                file = %safe_name,
                "Uploaded format is not read by the analysis stage"
            );
        }

        let unique = format!("{rfp_id}_{}_{safe_name}", uuid::Uuid::new_v4().simple());
        let path = self.upload_dir.join(unique);
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| EngineError::Storage(format!("{}: {e}", self.upload_dir.display())))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineError::Storage(format!("{}: {e}", path.display())))?;

        match self.store.record_file(rfp_id, &safe_name, path.clone()) {
            Ok(file) => {
                info!(rfp_id = %rfp_id, file = %safe_name, size = bytes.len(), "Stored upload");
                Ok(file)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %rm, "Cannot remove orphaned upload");
                }
                Err(e.into())
            }
        }
    }
}
