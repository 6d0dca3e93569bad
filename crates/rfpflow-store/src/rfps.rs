//! RFP records and the artifacts each stage produces

use chrono::Utc;
use indexmap::IndexMap;
use rfpflow_utils::types::{FileId, ProposalId, RfpId, RfpStatus, ScopeId, StageId, VendorId};
use tracing::debug;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    BomItem, BomSnapshot, Proposal, Rfp, RfpFile, ScopeEntry, VendorMatch, VendorMatchBlob,
    Versioned,
};
use crate::store::Store;

fn non_empty(field: &str, value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Artifacts are always stored; status moves only when the stage's own
/// precondition holds.
fn advance_or_hold(rfp: &mut Rfp, stage: StageId) {
    if !rfp.record_stage(stage) {
        debug!(
            rfp_id = %rfp.id,
            stage = %stage,
            status = %rfp.status,
            "Artifact stored without status change"
        );
    }
}

impl Store {
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty name.
    pub fn create_rfp(&self, nome: &str) -> StoreResult<Rfp> {
        let nome = non_empty("nome", nome)?;
        self.mutate(|state| {
            state.counters.rfp += 1;
            let rfp = Rfp {
                id: RfpId(state.counters.rfp),
                nome,
                status: RfpStatus::New,
                arquivo_url: None,
                resumo_ia: None,
                analise_vendors: None,
                fabricante_escolhido_id: None,
                created_at: Utc::now(),
            };
            state.rfps.insert(rfp.id, rfp.clone());
            Ok(rfp)
        })
    }

    #[must_use]
    pub fn list_rfps(&self) -> Vec<Rfp> {
        self.read().rfps.values().cloned().collect()
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_rfp(&self, id: RfpId) -> StoreResult<Rfp> {
        self.read().rfp(id).cloned()
    }

    /// Record an uploaded document and mark the RFP as having one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn record_file(
        &self,
        rfp_id: RfpId,
        filename: &str,
        stored_path: PathBuf,
    ) -> StoreResult<RfpFile> {
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            rfp.arquivo_url = Some(stored_path.display().to_string());
            rfp.status = rfp.status.advance(RfpStatus::DocumentReceived);

            state.counters.file += 1;
            let file = RfpFile {
                id: FileId(state.counters.file),
                rfp_id,
                filename: filename.to_string(),
                stored_path,
                created_at: Utc::now(),
            };
            state.files.insert(file.id, file.clone());
            Ok(file)
        })
    }

    /// Uploaded files of an RFP, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn list_files(&self, rfp_id: RfpId) -> StoreResult<Vec<RfpFile>> {
        let state = self.read();
        state.rfp(rfp_id)?;
        Ok(state
            .files
            .values()
            .filter(|f| f.rfp_id == rfp_id)
            .cloned()
            .collect())
    }

    /// Replace the analysis summary.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn commit_analysis(&self, rfp_id: RfpId, resumo: String) -> StoreResult<Rfp> {
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            rfp.resumo_ia = Some(resumo);
            advance_or_hold(rfp, StageId::Analysis);
            Ok(rfp.clone())
        })
    }

    /// Swap in a new vendor-match blob. `matches` must already be ranked.
    /// Status reaches `VendorsMatched` only for an analyzed RFP.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn commit_vendor_matches(
        &self,
        rfp_id: RfpId,
        matches: Vec<VendorMatch>,
    ) -> StoreResult<VendorMatchBlob> {
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            let blob = Arc::new(Versioned::next_after(
                rfp.analise_vendors.as_deref(),
                matches,
            ));
            rfp.analise_vendors = Some(Arc::clone(&blob));
            advance_or_hold(rfp, StageId::VendorMatch);
            Ok(blob)
        })
    }

    /// Set the chosen vendor. Allowed whether or not matching ran.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP and
    /// `StoreError::InvalidVendor` for an unknown vendor.
    pub fn set_chosen_vendor(&self, rfp_id: RfpId, vendor_id: VendorId) -> StoreResult<Rfp> {
        self.mutate(|state| {
            if !state.vendors.contains_key(&vendor_id) {
                state.rfp(rfp_id)?;
                return Err(StoreError::InvalidVendor(vendor_id));
            }
            let rfp = state.rfp_mut(rfp_id)?;
            rfp.fabricante_escolhido_id = Some(vendor_id);
            Ok(rfp.clone())
        })
    }

    /// Swap in a new BoM snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn commit_bom(&self, rfp_id: RfpId, items: Vec<BomItem>) -> StoreResult<BomSnapshot> {
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            advance_or_hold(rfp, StageId::Bom);
            let snapshot = Arc::new(Versioned::next_after(
                state.boms.get(&rfp_id).map(|s| &**s),
                items,
            ));
            state.boms.insert(rfp_id, Arc::clone(&snapshot));
            Ok(snapshot)
        })
    }

    /// Current BoM snapshot, `None` before the first generation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn bom(&self, rfp_id: RfpId) -> StoreResult<Option<BomSnapshot>> {
        let state = self.read();
        state.rfp(rfp_id)?;
        Ok(state.boms.get(&rfp_id).cloned())
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn list_scopes(&self, rfp_id: RfpId) -> StoreResult<Vec<ScopeEntry>> {
        let state = self.read();
        state.rfp(rfp_id)?;
        Ok(state
            .scopes
            .values()
            .filter(|s| s.rfp_id == rfp_id)
            .cloned()
            .collect())
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_scope(&self, id: ScopeId) -> StoreResult<ScopeEntry> {
        self.read()
            .scopes
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Scope entry", id))
    }

    /// Persist an accepted scope entry. Status reaches `ScopeDrafted` only
    /// for an analyzed RFP.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP and
    /// `StoreError::Validation` for an empty title.
    pub fn create_scope(
        &self,
        rfp_id: RfpId,
        titulo: &str,
        descricao: &str,
    ) -> StoreResult<ScopeEntry> {
        let titulo = non_empty("titulo", titulo)?;
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            advance_or_hold(rfp, StageId::Scope);
            state.counters.scope += 1;
            let entry = ScopeEntry {
                id: ScopeId(state.counters.scope),
                rfp_id,
                titulo,
                descricao: descricao.to_string(),
                created_at: Utc::now(),
            };
            state.scopes.insert(entry.id, entry.clone());
            Ok(entry)
        })
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::Validation` for an empty title.
    pub fn update_scope(
        &self,
        id: ScopeId,
        titulo: &str,
        descricao: &str,
    ) -> StoreResult<ScopeEntry> {
        let titulo = non_empty("titulo", titulo)?;
        self.mutate(|state| {
            let entry = state
                .scopes
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("Scope entry", id))?;
            entry.titulo = titulo;
            entry.descricao = descricao.to_string();
            Ok(entry.clone())
        })
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn delete_scope(&self, id: ScopeId) -> StoreResult<ScopeEntry> {
        self.mutate(|state| {
            state
                .scopes
                .remove(&id)
                .ok_or_else(|| StoreError::not_found("Scope entry", id))
        })
    }

    /// Write AI-generated sections as the RFP's active proposal, creating it
    /// on first generation and overwriting it afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn commit_generated_proposal(
        &self,
        rfp_id: RfpId,
        dados: IndexMap<String, String>,
    ) -> StoreResult<Proposal> {
        self.mutate(|state| {
            let rfp = state.rfp_mut(rfp_id)?;
            advance_or_hold(rfp, StageId::Proposal);

            let now = Utc::now();
            let existing = state
                .proposals
                .values_mut()
                .find(|p| p.rfp_id == rfp_id);
            if let Some(proposal) = existing {
                proposal.dados = dados;
                proposal.revision += 1;
                proposal.updated_at = now;
                return Ok(proposal.clone());
            }

            state.counters.proposal += 1;
            let proposal = Proposal {
                id: ProposalId(state.counters.proposal),
                rfp_id,
                dados,
                revision: 1,
                created_at: now,
                updated_at: now,
            };
            state.proposals.insert(proposal.id, proposal.clone());
            Ok(proposal)
        })
    }

    /// Overwrite a proposal's sections verbatim (last write wins).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn save_proposal(
        &self,
        id: ProposalId,
        dados: IndexMap<String, String>,
    ) -> StoreResult<Proposal> {
        self.mutate(|state| {
            let proposal = state
                .proposals
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("Proposal", id))?;
            proposal.dados = dados;
            proposal.revision += 1;
            proposal.updated_at = Utc::now();
            Ok(proposal.clone())
        })
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_proposal(&self, id: ProposalId) -> StoreResult<Proposal> {
        self.read()
            .proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Proposal", id))
    }

    /// The active proposal of an RFP, if one was generated.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown RFP.
    pub fn proposal_for_rfp(&self, rfp_id: RfpId) -> StoreResult<Option<Proposal>> {
        let state = self.read();
        state.rfp(rfp_id)?;
        Ok(state
            .proposals
            .values()
            .find(|p| p.rfp_id == rfp_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfpflow_config::VendorSeed;

    fn item(descricao: &str) -> BomItem {
        BomItem {
            descricao: descricao.to_string(),
            modelo: "M".to_string(),
            part_number: "PN".to_string(),
            quantidade: 1,
        }
    }

    #[test]
    fn test_status_never_moves_backward() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();
        store
            .record_file(rfp.id, "edital.txt", PathBuf::from("edital.txt"))
            .unwrap();
        store.commit_analysis(rfp.id, "resumo".into()).unwrap();
        store.commit_bom(rfp.id, vec![item("a")]).unwrap();
        store
            .record_file(rfp.id, "late.txt", PathBuf::from("late.txt"))
            .unwrap();
        assert_eq!(store.get_rfp(rfp.id).unwrap().status, RfpStatus::BomGenerated);
    }

    #[test]
    fn test_bom_replaced_wholesale() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();
        let first = store.commit_bom(rfp.id, vec![item("a"), item("b")]).unwrap();
        store.commit_bom(rfp.id, vec![item("c")]).unwrap();

        let current = store.bom(rfp.id).unwrap().unwrap();
        assert_eq!(current.version, 2);
        assert_eq!(current.value, vec![item("c")]);
        // A reader holding the old snapshot still sees it whole
        assert_eq!(first.value.len(), 2);
    }

    #[test]
    fn test_set_chosen_vendor_rejects_unknown() {
        let store = Store::in_memory();
        let seed = VendorSeed {
            nome: "Acme".into(),
            ..VendorSeed::default()
        };
        store.seed(&[seed], &[]).unwrap();
        let rfp = store.create_rfp("Rede").unwrap();

        let err = store.set_chosen_vendor(rfp.id, VendorId(99)).unwrap_err();
        assert_eq!(err, StoreError::InvalidVendor(VendorId(99)));
        assert_eq!(store.get_rfp(rfp.id).unwrap().fabricante_escolhido_id, None);

        let rfp = store.set_chosen_vendor(rfp.id, VendorId(1)).unwrap();
        assert_eq!(rfp.fabricante_escolhido_id, Some(VendorId(1)));
    }

    #[test]
    fn test_generated_proposal_reuses_record() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();
        let mut sections = IndexMap::new();
        sections.insert("Introdução".to_string(), "texto".to_string());

        let first = store
            .commit_generated_proposal(rfp.id, sections.clone())
            .unwrap();
        let saved = store.save_proposal(first.id, IndexMap::new()).unwrap();
        let regenerated = store.commit_generated_proposal(rfp.id, sections).unwrap();

        assert_eq!(first.id, regenerated.id);
        assert_eq!(saved.revision, 2);
        assert_eq!(regenerated.revision, 3);
        assert_eq!(regenerated.dados.len(), 1);
    }

    #[test]
    fn test_scope_entry_advances_status() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();
        store
            .record_file(rfp.id, "edital.txt", PathBuf::from("edital.txt"))
            .unwrap();
        store.commit_analysis(rfp.id, "r".into()).unwrap();
        let entry = store.create_scope(rfp.id, "Escopo", "desc").unwrap();
        assert_eq!(store.get_rfp(rfp.id).unwrap().status, RfpStatus::ScopeDrafted);

        store.update_scope(entry.id, "Novo", "d2").unwrap();
        assert_eq!(store.get_scope(entry.id).unwrap().titulo, "Novo");
        store.delete_scope(entry.id).unwrap();
        assert!(store.list_scopes(rfp.id).unwrap().is_empty());
        assert!(matches!(
            store.create_scope(rfp.id, "  ", "x"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_artifacts_before_analysis_keep_status() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();

        store.create_scope(rfp.id, "Escopo", "manual").unwrap();
        store
            .commit_vendor_matches(
                rfp.id,
                vec![VendorMatch {
                    vendor: "Acme".into(),
                    vendor_id: None,
                    score: 80,
                    motivo: String::new(),
                }],
            )
            .unwrap();
        store.commit_analysis(rfp.id, "sem documento".into()).unwrap();

        let current = store.get_rfp(rfp.id).unwrap();
        assert_eq!(current.status, RfpStatus::New);
        assert_eq!(current.analise_vendors.unwrap().value.len(), 1);
        assert_eq!(store.list_scopes(rfp.id).unwrap().len(), 1);
    }

    #[test]
    fn test_stage_needs_summary_to_advance() {
        let store = Store::in_memory();
        let rfp = store.create_rfp("Rede").unwrap();
        store
            .record_file(rfp.id, "edital.txt", PathBuf::from("edital.txt"))
            .unwrap();
        store.commit_bom(rfp.id, vec![item("a")]).unwrap();
        assert_eq!(
            store.get_rfp(rfp.id).unwrap().status,
            RfpStatus::DocumentReceived
        );

        store.commit_analysis(rfp.id, "resumo".into()).unwrap();
        store.commit_bom(rfp.id, vec![item("b")]).unwrap();
        assert_eq!(store.get_rfp(rfp.id).unwrap().status, RfpStatus::BomGenerated);
    }
}
