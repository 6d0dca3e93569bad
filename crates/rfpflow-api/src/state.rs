//! Shared state handed to every handler

use rfpflow_engine::Engine;
use rfpflow_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        self.engine.store()
    }
}
