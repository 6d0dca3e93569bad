//! Service assembly shared by the binary and integration tests

use std::sync::Arc;

use axum::Router;
use rfpflow_api::{AppState, create_router};
use rfpflow_config::Config;
use rfpflow_engine::Engine;
use rfpflow_llm::BackendFactory;
use rfpflow_store::{Store, StoreResult};
use tracing::info;

/// Open the store described by `config` and apply the configured seeds.
///
/// Seeds only fill empty tables, so a restored state file keeps whatever
/// admins changed at runtime.
///
/// # Errors
///
/// Fails when the state file cannot be read or written, or when the vendor
/// seed contains duplicate names.
pub fn open_store(config: &Config) -> StoreResult<Store> {
    let store = match &config.storage.state_file {
        Some(path) => Store::open(path)?,
        None => Store::in_memory(),
    };
    store.seed(&config.vendors, &config.providers)?;
    info!(
        vendors = store.list_vendors().len(),
        providers = store.list_providers().len(),
        persistent = config.storage.state_file.is_some(),
        "Store ready"
    );
    Ok(store)
}

/// Build the HTTP application around `store`.
pub fn build_router(config: &Config, store: Store, factory: Arc<dyn BackendFactory>) -> Router {
    let engine = Engine::new(store, factory, config);
    create_router(AppState::new(engine), &config.server)
}
