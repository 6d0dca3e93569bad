//! Core types for the generation backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use rfpflow_utils::error::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// RFP the call is made for, for log context
    pub rfp_id: u64,
    /// Stage name, for log context
    pub stage: String,
    /// Model to use; empty means the backend default
    pub model: String,
    /// Upper bound for this call
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific parameters (`max_tokens`, `temperature`)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        rfp_id: u64,
        stage: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            rfp_id,
            stage: stage.into(),
            model: model.into(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Concatenated user-message text. Handy for assertions in tests.
    #[must_use]
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result from a backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text
    pub raw_response: String,
    /// Backend name (e.g., "openai", "openrouter", "anthropic")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    /// Provider-specific extensions
    pub extensions: HashMap<String, serde_json::Value>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            extensions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}

/// Capability every provider implements.
///
/// Stage logic only sees this trait; which HTTP API sits behind it is decided
/// once, when the backend is built for the selected provider.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the model with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns a classified [`LlmError`] on network, provider, timeout or
    /// response-shape failure.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

/// Parameters resolved per call from backend defaults and invocation metadata
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

/// Resolve model and parameters for one invocation.
///
/// `inv.model` overrides `default_model`; `metadata["max_tokens"]` and
/// `metadata["temperature"]` override the backend defaults.
pub(crate) fn resolve_params(
    inv: &LlmInvocation,
    default_model: &str,
    defaults: HttpParams,
) -> (String, HttpParams) {
    let model = if inv.model.is_empty() {
        default_model.to_string()
    } else {
        inv.model.clone()
    };

    let max_tokens = inv
        .metadata
        .get("max_tokens")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(defaults.max_tokens);

    #[allow(clippy::cast_possible_truncation)]
    let temperature = inv
        .metadata
        .get("temperature")
        .and_then(serde_json::Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(defaults.temperature);

    (
        model,
        HttpParams {
            max_tokens,
            temperature,
        },
    )
}
