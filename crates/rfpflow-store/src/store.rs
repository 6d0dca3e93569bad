//! Store handle, shared state and snapshot persistence

use chrono::Utc;
use rfpflow_config::{ProviderSeed, VendorSeed};
use rfpflow_prompt_template::BUILTIN_PROMPTS;
use rfpflow_utils::atomic_write::write_file_atomic;
use rfpflow_utils::types::{
    FileId, PromptId, ProposalId, ProviderId, RfpId, ScopeId, VendorId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::model::{
    BomSnapshot, PromptRecord, Proposal, ProviderRecord, Rfp, RfpFile, ScopeEntry, Vendor,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Counters {
    pub rfp: u64,
    pub file: u64,
    pub scope: u64,
    pub proposal: u64,
    pub provider: u64,
    pub prompt: u64,
    pub vendor: u64,
}

/// Everything the store holds. Cloning is cheap for the large artifacts,
/// which sit behind `Arc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct State {
    pub counters: Counters,
    pub rfps: BTreeMap<RfpId, Rfp>,
    pub files: BTreeMap<FileId, RfpFile>,
    pub boms: BTreeMap<RfpId, BomSnapshot>,
    pub scopes: BTreeMap<ScopeId, ScopeEntry>,
    pub proposals: BTreeMap<ProposalId, Proposal>,
    pub providers: BTreeMap<ProviderId, ProviderRecord>,
    /// The one selected provider. A single value, so "two selected" cannot
    /// be represented.
    pub selected_provider: Option<ProviderId>,
    pub prompts: BTreeMap<PromptId, PromptRecord>,
    pub vendors: BTreeMap<VendorId, Vendor>,
}

impl State {
    pub fn rfp_mut(&mut self, id: RfpId) -> StoreResult<&mut Rfp> {
        self.rfps
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("RFP", id))
    }

    pub fn rfp(&self, id: RfpId) -> StoreResult<&Rfp> {
        self.rfps
            .get(&id)
            .ok_or_else(|| StoreError::not_found("RFP", id))
    }
}

/// Shared entity store.
///
/// Reads share one `RwLock`. Every mutation runs as a closure over a copy of
/// the state: it either commits completely or leaves the state untouched.
/// Writers queue on a separate mutex, so the snapshot write happens without
/// holding the `RwLock` and readers never wait on disk. With a state file
/// configured, the committed state is written atomically before it becomes
/// visible.
#[derive(Debug, Clone)]
pub struct Store {
    state: Arc<RwLock<State>>,
    writer: Arc<Mutex<()>>,
    state_file: Option<PathBuf>,
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Store {
    /// Fresh in-memory store seeded with the built-in prompts.
    #[must_use]
    pub fn in_memory() -> Self {
        let mut state = State::default();
        seed_builtin_prompts(&mut state);
        Self {
            state: Arc::new(RwLock::new(state)),
            writer: Arc::default(),
            state_file: None,
        }
    }

    /// Open a store backed by `state_file`, restoring it when it exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persistence` if the file exists but cannot be
    /// read or parsed.
    pub fn open(state_file: &Path) -> StoreResult<Self> {
        let state = if state_file.exists() {
            let raw = std::fs::read_to_string(state_file).map_err(|e| {
                StoreError::Persistence(format!("{}: {e}", state_file.display()))
            })?;
            let state: State = serde_json::from_str(&raw).map_err(|e| {
                StoreError::Persistence(format!("{}: {e}", state_file.display()))
            })?;
            info!(
                path = %state_file.display(),
                rfps = state.rfps.len(),
                providers = state.providers.len(),
                "Restored state snapshot"
            );
            state
        } else {
            debug!(path = %state_file.display(), "No state snapshot yet, starting fresh");
            let mut state = State::default();
            seed_builtin_prompts(&mut state);
            state
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            writer: Arc::default(),
            state_file: Some(state_file.to_path_buf()),
        })
    }

    /// Seed the vendor directory and provider registry from configuration.
    ///
    /// Each collection is only seeded while empty, so a restored snapshot
    /// keeps whatever admins changed at runtime.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` on duplicate vendor names, or a
    /// persistence error.
    pub fn seed(&self, vendors: &[VendorSeed], providers: &[ProviderSeed]) -> StoreResult<()> {
        self.mutate(|state| {
            if state.vendors.is_empty() {
                for seed in vendors {
                    let taken = state
                        .vendors
                        .values()
                        .any(|v| v.nome.trim().eq_ignore_ascii_case(seed.nome.trim()));
                    if taken {
                        return Err(StoreError::Duplicate {
                            entity: "Vendor",
                            name: seed.nome.clone(),
                        });
                    }
                    state.counters.vendor += 1;
                    let id = VendorId(state.counters.vendor);
                    state.vendors.insert(
                        id,
                        Vendor {
                            id,
                            nome: seed.nome.trim().to_string(),
                            tecnologias: seed.tecnologias.clone(),
                            produtos: seed.produtos.clone(),
                            certificacoes: seed.certificacoes.clone(),
                            requisitos_atendidos: seed.requisitos_atendidos.clone(),
                        },
                    );
                }
            }

            if state.providers.is_empty() {
                for seed in providers {
                    state.counters.provider += 1;
                    let id = ProviderId(state.counters.provider);
                    let api_key = seed.resolve_api_key();
                    if api_key.is_none() {
                        warn!(provider = %seed.name, "Seeded provider has no API key");
                    }
                    state.providers.insert(
                        id,
                        ProviderRecord {
                            id,
                            name: seed.name.clone(),
                            model: seed.model.clone(),
                            api_key,
                            base_url: seed.base_url.clone(),
                        },
                    );
                    if seed.selected {
                        state.selected_provider = Some(id);
                    }
                }
            }
            Ok(())
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        // Mutations never leave the state half-written, so a poisoned lock
        // still guards a consistent value.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state and commit its changes.
    ///
    /// `f` works on a copy; the copy replaces the live state only if `f`
    /// succeeds and, when configured, the snapshot was written. The write
    /// lock is held only for the final swap.
    pub(crate) fn mutate<T>(
        &self,
        f: impl FnOnce(&mut State) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.read().clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.state_file {
            off_worker(|| persist(path, &next))?;
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(out)
    }
}

/// Run blocking file I/O, telling a multi-threaded runtime to move its other
/// tasks off this worker first.
fn off_worker<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn persist(path: &Path, state: &State) -> StoreResult<()> {
    let json =
        serde_json::to_vec_pretty(state).map_err(|e| StoreError::Persistence(e.to_string()))?;
    write_file_atomic(path, &json).map_err(|e| {
        warn!(path = %path.display(), error = %e, "State snapshot write failed");
        StoreError::Persistence(format!("{e:#}"))
    })
}

fn seed_builtin_prompts(state: &mut State) {
    let now = Utc::now();
    for builtin in BUILTIN_PROMPTS {
        state.counters.prompt += 1;
        let id = PromptId(state.counters.prompt);
        state.prompts.insert(
            id,
            PromptRecord {
                id,
                name: builtin.name.to_string(),
                description: builtin.description.to_string(),
                texto: builtin.text.to_string(),
                version: 1,
                updated_at: now,
            },
        );
    }
}
