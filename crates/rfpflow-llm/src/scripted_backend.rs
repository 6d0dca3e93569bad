//! Scripted backend for tests
//!
//! Replays a queue of canned replies and records every invocation, so stage
//! and API tests never touch the network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use crate::{BackendFactory, ProviderSpec};
use rfpflow_utils::error::LlmError;

/// One canned reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Error(LlmError),
}

#[derive(Debug, Default)]
struct State {
    replies: VecDeque<ScriptedReply>,
    calls: Vec<LlmInvocation>,
}

/// Backend that answers from a FIFO script.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
    delay: Option<Duration>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every invocation before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    #[must_use]
    pub fn with_error(self, error: LlmError) -> Self {
        self.push_error(error);
        self
    }

    pub fn push_text(&self, text: impl Into<String>) {
        lock(&self.state)
            .replies
            .push_back(ScriptedReply::Text(text.into()));
    }

    pub fn push_error(&self, error: LlmError) {
        lock(&self.state)
            .replies
            .push_back(ScriptedReply::Error(error));
    }

    /// Every invocation received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<LlmInvocation> {
        lock(&self.state).calls.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.state).replies.len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = inv.model.clone();
        let reply = {
            let mut state = lock(&self.state);
            state.calls.push(inv);
            state.replies.pop_front()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(LlmResult::new(text, "scripted", model)),
            Some(ScriptedReply::Error(error)) => Err(error),
            None => Err(LlmError::Unavailable("scripted backend exhausted".to_string())),
        }
    }
}

/// Factory that hands out the same scripted backend for every provider and
/// records which providers were asked for.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    backend: Arc<ScriptedBackend>,
    built: Arc<Mutex<Vec<ProviderSpec>>>,
}

impl ScriptedFactory {
    #[must_use]
    pub fn new(backend: Arc<ScriptedBackend>) -> Self {
        Self {
            backend,
            built: Arc::default(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> Arc<ScriptedBackend> {
        Arc::clone(&self.backend)
    }

    /// Provider specs passed to [`BackendFactory::build`], oldest first.
    #[must_use]
    pub fn built(&self) -> Vec<ProviderSpec> {
        self.built
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl BackendFactory for ScriptedFactory {
    fn build(&self, spec: &ProviderSpec) -> Result<Arc<dyn LlmBackend>, LlmError> {
        self.built
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(spec.clone());
        Ok(self.backend.clone())
    }
}
