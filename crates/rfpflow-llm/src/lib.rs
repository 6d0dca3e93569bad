//! Generation backends for rfpflow
//!
//! Every provider implements [`LlmBackend`]. The stage engine never branches
//! on provider identity: it asks a [`BackendFactory`] for a backend matching
//! the selected provider and invokes it.
//!
//! | Provider name contains | Backend |
//! |---|---|
//! | `anthropic`, `claude` | Anthropic Messages API |
//! | `openrouter` | OpenRouter (OpenAI-compatible) |
//! | anything else | OpenAI chat completions |

mod anthropic_backend;
mod http_client;
mod openai_backend;
#[cfg(any(test, feature = "test-utils"))]
mod scripted_backend;
mod types;

use std::sync::Arc;

use rfpflow_config::LlmEndpoints;
use tracing::debug;

pub use rfpflow_utils::error::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

#[cfg(any(test, feature = "test-utils"))]
pub use scripted_backend::{ScriptedBackend, ScriptedFactory, ScriptedReply};

use anthropic_backend::AnthropicBackend;
use http_client::HttpClient;
use openai_backend::{Flavor, OpenAiCompatibleBackend};

/// Wire protocol family of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    OpenRouter,
    Anthropic,
}

impl BackendKind {
    /// Derive the backend from a provider's display name.
    ///
    /// ```rust
    /// use rfpflow_llm::BackendKind;
    ///
    /// assert_eq!(BackendKind::from_provider_name("Claude"), BackendKind::Anthropic);
    /// assert_eq!(BackendKind::from_provider_name("openrouter-free"), BackendKind::OpenRouter);
    /// assert_eq!(BackendKind::from_provider_name("OpenAI"), BackendKind::OpenAi);
    /// ```
    #[must_use]
    pub fn from_provider_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("anthropic") || lower.contains("claude") {
            Self::Anthropic
        } else if lower.contains("openrouter") {
            Self::OpenRouter
        } else {
            Self::OpenAi
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Anthropic => "anthropic",
        }
    }
}

/// What a factory needs to know about a provider to build its backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Overrides the endpoint for this provider's backend kind
    pub base_url: Option<String>,
}

/// Builds a backend for a provider. Swapped for a scripted factory in tests.
pub trait BackendFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the provider cannot produce a
    /// working client (missing key, empty model).
    fn build(&self, spec: &ProviderSpec) -> Result<Arc<dyn LlmBackend>, LlmError>;
}

/// Production factory backed by a shared HTTP client
#[derive(Clone)]
pub struct HttpBackendFactory {
    client: HttpClient,
    endpoints: LlmEndpoints,
}

impl HttpBackendFactory {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built
    pub fn new(endpoints: LlmEndpoints) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            endpoints,
        })
    }
}

impl BackendFactory for HttpBackendFactory {
    fn build(&self, spec: &ProviderSpec) -> Result<Arc<dyn LlmBackend>, LlmError> {
        construct_backend_for_provider(spec, &self.client, &self.endpoints)
    }
}

fn construct_backend_for_provider(
    spec: &ProviderSpec,
    client: &HttpClient,
    endpoints: &LlmEndpoints,
) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let kind = BackendKind::from_provider_name(&spec.name);
    let api_key = spec.api_key.clone().ok_or_else(|| {
        LlmError::Misconfiguration(format!("Provider '{}' has no API key configured", spec.name))
    })?;

    debug!(
        provider = %spec.name,
        backend = kind.as_str(),
        model = %spec.model,
        custom_base_url = spec.base_url.is_some(),
        "Constructing backend"
    );

    match kind {
        BackendKind::OpenAi | BackendKind::OpenRouter => {
            let (flavor, default_url) = if kind == BackendKind::OpenRouter {
                (Flavor::OpenRouter, &endpoints.openrouter_base_url)
            } else {
                (Flavor::OpenAi, &endpoints.openai_base_url)
            };
            let base_url = spec.base_url.clone().unwrap_or_else(|| default_url.clone());
            let backend = OpenAiCompatibleBackend::new(
                client.clone(),
                flavor,
                base_url,
                api_key,
                spec.model.clone(),
            )?;
            Ok(Arc::new(backend))
        }
        BackendKind::Anthropic => {
            let base_url = spec
                .base_url
                .clone()
                .unwrap_or_else(|| endpoints.anthropic_base_url.clone());
            let backend =
                AnthropicBackend::new(client.clone(), base_url, api_key, spec.model.clone())?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(name: &str, key: Option<&str>) -> ProviderSpec {
        ProviderSpec {
            name: name.to_string(),
            model: "some-model".to_string(),
            api_key: key.map(str::to_string),
            base_url: None,
        }
    }

    #[test]
    fn test_factory_builds_each_kind() {
        let factory = HttpBackendFactory::new(LlmEndpoints::default()).unwrap();
        for name in ["openai", "OpenRouter", "anthropic", "Claude Sonnet", "azure-gpt"] {
            assert!(factory.build(&spec(name, Some("k"))).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_factory_requires_key() {
        let factory = HttpBackendFactory::new(LlmEndpoints::default()).unwrap();
        let err = factory.build(&spec("openai", None)).err().unwrap();
        assert!(matches!(err, LlmError::Misconfiguration(m) if m.contains("openai")));
    }

    #[tokio::test]
    async fn test_scripted_backend_replays_in_order() {
        let backend = ScriptedBackend::new()
            .with_text("first")
            .with_error(LlmError::RateLimited("slow".into()));
        let inv = LlmInvocation::new(1, "bom", "m", Duration::from_secs(5), vec![Message::user("x")]);

        let first = backend.invoke(inv.clone()).await.unwrap();
        assert_eq!(first.raw_response, "first");
        let second = backend.invoke(inv.clone()).await.unwrap_err();
        assert!(matches!(second, LlmError::RateLimited(_)));
        let third = backend.invoke(inv).await.unwrap_err();
        assert!(matches!(third, LlmError::Unavailable(_)));
        assert_eq!(backend.call_count(), 3);
    }

    #[test]
    fn test_scripted_factory_records_specs() {
        let factory = ScriptedFactory::new(Arc::new(ScriptedBackend::new()));
        factory.build(&spec("anthropic", Some("k"))).unwrap();
        assert_eq!(factory.built()[0].name, "anthropic");
    }
}
