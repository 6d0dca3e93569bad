//! Provider registry, prompt store and vendor directory

use chrono::Utc;
use rfpflow_prompt_template::builtin;
use rfpflow_utils::redaction::mask_key;
use rfpflow_utils::types::{PromptId, ProviderId, VendorId};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    NewPrompt, NewProvider, PromptRecord, PromptUpdate, ProviderRecord, ProviderUpdate,
    ProviderView, Vendor,
};
use crate::store::{State, Store};

fn required(field: &str, value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn view(state: &State, record: &ProviderRecord) -> ProviderView {
    ProviderView {
        id: record.id,
        name: record.name.clone(),
        model: record.model.clone(),
        api_key: record.api_key.as_deref().map(mask_key),
        base_url: record.base_url.clone(),
        is_selected: state.selected_provider == Some(record.id),
    }
}

fn prompt_name_taken(state: &State, name: &str, except: Option<PromptId>) -> bool {
    state
        .prompts
        .values()
        .any(|p| p.name == name && Some(p.id) != except)
}

impl Store {
    #[must_use]
    pub fn list_providers(&self) -> Vec<ProviderView> {
        let state = self.read();
        state.providers.values().map(|p| view(&state, p)).collect()
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_provider(&self, id: ProviderId) -> StoreResult<ProviderView> {
        let state = self.read();
        state
            .providers
            .get(&id)
            .map(|p| view(&state, p))
            .ok_or_else(|| StoreError::not_found("Provider", id))
    }

    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty name or model.
    pub fn create_provider(&self, new: NewProvider) -> StoreResult<ProviderView> {
        let name = required("name", &new.name)?;
        let model = required("model", &new.model)?;
        self.mutate(|state| {
            state.counters.provider += 1;
            let record = ProviderRecord {
                id: ProviderId(state.counters.provider),
                name,
                model,
                api_key: new.api_key.filter(|k| !k.trim().is_empty()),
                base_url: new.base_url.filter(|u| !u.trim().is_empty()),
            };
            if new.is_selected {
                state.selected_provider = Some(record.id);
            }
            let out = view(state, &record);
            state.providers.insert(record.id, record);
            Ok(out)
        })
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::Validation` for an empty name or model.
    pub fn update_provider(
        &self,
        id: ProviderId,
        update: ProviderUpdate,
    ) -> StoreResult<ProviderView> {
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let model = update
            .model
            .as_deref()
            .map(|m| required("model", m))
            .transpose()?;
        self.mutate(|state| {
            let record = state
                .providers
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("Provider", id))?;
            if let Some(name) = name {
                record.name = name;
            }
            if let Some(model) = model {
                record.model = model;
            }
            // An empty key in an edit form means "keep the current one"
            if let Some(key) = update.api_key.filter(|k| !k.trim().is_empty()) {
                record.api_key = Some(key);
            }
            if let Some(url) = update.base_url {
                record.base_url = Some(url).filter(|u| !u.trim().is_empty());
            }
            let record = record.clone();
            Ok(view(state, &record))
        })
    }

    /// Make `id` the selected provider. The previous selection is cleared in
    /// the same commit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn select_provider(&self, id: ProviderId) -> StoreResult<ProviderView> {
        self.mutate(|state| {
            let record = state
                .providers
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("Provider", id))?;
            let previous = state.selected_provider.replace(id);
            info!(
                provider_id = %id,
                previous = ?previous.map(ProviderId::get),
                "Selected AI provider"
            );
            Ok(view(state, &record))
        })
    }

    /// The selected provider with its credential, for building a backend.
    #[must_use]
    pub fn selected_provider(&self) -> Option<ProviderRecord> {
        let state = self.read();
        state
            .selected_provider
            .and_then(|id| state.providers.get(&id).cloned())
    }

    #[must_use]
    pub fn list_prompts(&self) -> Vec<PromptRecord> {
        self.read().prompts.values().cloned().collect()
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_prompt(&self, id: PromptId) -> StoreResult<PromptRecord> {
        self.read()
            .prompts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Prompt", id))
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` when no prompt has that name.
    pub fn prompt_by_name(&self, name: &str) -> StoreResult<PromptRecord> {
        self.read()
            .prompts
            .values()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Prompt", name))
    }

    /// Template text for `name`: the stored prompt, else the built-in one.
    #[must_use]
    pub fn resolve_prompt_text(&self, name: &str) -> Option<String> {
        self.read()
            .prompts
            .values()
            .find(|p| p.name == name)
            .map(|p| p.texto.clone())
            .or_else(|| builtin(name).map(|b| b.text.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` when the name is taken and
    /// `StoreError::Validation` for an empty name or text.
    pub fn create_prompt(&self, new: NewPrompt) -> StoreResult<PromptRecord> {
        let name = required("name", &new.name)?;
        let texto = required("texto", &new.texto)?;
        self.mutate(|state| {
            if prompt_name_taken(state, &name, None) {
                return Err(StoreError::Duplicate {
                    entity: "Prompt",
                    name,
                });
            }
            state.counters.prompt += 1;
            let record = PromptRecord {
                id: PromptId(state.counters.prompt),
                name,
                description: new.description,
                texto,
                version: 1,
                updated_at: Utc::now(),
            };
            state.prompts.insert(record.id, record.clone());
            Ok(record)
        })
    }

    /// Apply an edit and bump the prompt's version.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound`, `StoreError::Duplicate` on a rename
    /// onto a taken name, or `StoreError::Validation` for empty values.
    pub fn update_prompt(&self, id: PromptId, update: PromptUpdate) -> StoreResult<PromptRecord> {
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let texto = update
            .texto
            .as_deref()
            .map(|t| required("texto", t))
            .transpose()?;
        self.mutate(|state| {
            if let Some(name) = &name {
                if prompt_name_taken(state, name, Some(id)) {
                    return Err(StoreError::Duplicate {
                        entity: "Prompt",
                        name: name.clone(),
                    });
                }
            }
            let record = state
                .prompts
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("Prompt", id))?;
            if let Some(name) = name {
                record.name = name;
            }
            if let Some(description) = update.description {
                record.description = description;
            }
            if let Some(texto) = texto {
                record.texto = texto;
            }
            record.version += 1;
            record.updated_at = Utc::now();
            Ok(record.clone())
        })
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn delete_prompt(&self, id: PromptId) -> StoreResult<PromptRecord> {
        self.mutate(|state| {
            state
                .prompts
                .remove(&id)
                .ok_or_else(|| StoreError::not_found("Prompt", id))
        })
    }

    #[must_use]
    pub fn list_vendors(&self) -> Vec<Vendor> {
        self.read().vendors.values().cloned().collect()
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub fn get_vendor(&self, id: VendorId) -> StoreResult<Vendor> {
        self.read()
            .vendors
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Vendor", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfpflow_prompt_template::names;

    fn provider(name: &str, selected: bool) -> NewProvider {
        NewProvider {
            name: name.to_string(),
            model: "m".to_string(),
            api_key: Some("sk-abcdefghijklmnop1234".to_string()),
            base_url: None,
            is_selected: selected,
        }
    }

    fn selected_count(store: &Store) -> usize {
        store
            .list_providers()
            .iter()
            .filter(|p| p.is_selected)
            .count()
    }

    #[test]
    fn test_selection_swaps_atomically() {
        let store = Store::in_memory();
        let p1 = store.create_provider(provider("openai", true)).unwrap();
        let p2 = store.create_provider(provider("anthropic", false)).unwrap();
        assert_eq!(selected_count(&store), 1);

        let selected = store.select_provider(p2.id).unwrap();
        assert!(selected.is_selected);
        assert_eq!(selected_count(&store), 1);
        assert!(!store.get_provider(p1.id).unwrap().is_selected);
        assert_eq!(store.selected_provider().unwrap().id, p2.id);
    }

    #[test]
    fn test_unknown_provider_keeps_selection() {
        let store = Store::in_memory();
        let p1 = store.create_provider(provider("openai", true)).unwrap();
        assert!(store.select_provider(ProviderId(42)).is_err());
        assert_eq!(store.selected_provider().unwrap().id, p1.id);
    }

    #[test]
    fn test_provider_key_is_masked() {
        let store = Store::in_memory();
        let view = store.create_provider(provider("openai", false)).unwrap();
        assert_eq!(view.api_key.as_deref(), Some("sk-…1234"));
        assert_eq!(
            store.selected_provider(),
            None,
            "nothing selected until asked"
        );
    }

    #[test]
    fn test_update_provider_keeps_key_on_blank() {
        let store = Store::in_memory();
        let view = store.create_provider(provider("openai", true)).unwrap();
        let update = ProviderUpdate {
            model: Some("gpt-4o".into()),
            api_key: Some(String::new()),
            ..ProviderUpdate::default()
        };
        store.update_provider(view.id, update).unwrap();
        let record = store.selected_provider().unwrap();
        assert_eq!(record.model, "gpt-4o");
        assert_eq!(record.api_key.as_deref(), Some("sk-abcdefghijklmnop1234"));
    }

    #[test]
    fn test_prompt_edit_bumps_version() {
        let store = Store::in_memory();
        let prompt = store.prompt_by_name(names::BOM_GENERATION_USER_PROMPT).unwrap();
        let update = PromptUpdate {
            texto: Some("BoM for {rfp_summary}".into()),
            ..PromptUpdate::default()
        };
        let updated = store.update_prompt(prompt.id, update).unwrap();
        assert_eq!(updated.version, prompt.version + 1);
        assert_eq!(
            store.resolve_prompt_text(names::BOM_GENERATION_USER_PROMPT).unwrap(),
            "BoM for {rfp_summary}"
        );
    }

    #[test]
    fn test_deleted_prompt_falls_back_to_builtin() {
        let store = Store::in_memory();
        let prompt = store.prompt_by_name(names::SCOPE_SUGGESTION_USER_PROMPT).unwrap();
        store.delete_prompt(prompt.id).unwrap();
        assert!(store.prompt_by_name(names::SCOPE_SUGGESTION_USER_PROMPT).is_err());
        assert_eq!(
            store.resolve_prompt_text(names::SCOPE_SUGGESTION_USER_PROMPT),
            Some(prompt.texto)
        );
        assert_eq!(store.resolve_prompt_text("nope"), None);
    }

    #[test]
    fn test_prompt_names_unique() {
        let store = Store::in_memory();
        let new = NewPrompt {
            name: names::RFP_ANALYSIS_USER_PROMPT.to_string(),
            description: String::new(),
            texto: "x".to_string(),
        };
        assert!(matches!(
            store.create_prompt(new),
            Err(StoreError::Duplicate { .. })
        ));
    }
}
