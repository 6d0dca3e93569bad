//! Generation gateway
//!
//! One call shape for every stage: resolve the selected provider, render the
//! stage's prompts against its context, invoke the backend under a bounded
//! timeout and hand back the raw text. The gateway never interprets what the
//! model said.

use std::sync::Arc;

use rfpflow_config::StageSettings;
use rfpflow_llm::{BackendFactory, LlmError, LlmInvocation, LlmResult, Message, ProviderSpec};
use rfpflow_prompt_template::{PromptContext, TemplateError, render};
use rfpflow_store::{ProviderRecord, Store};
use rfpflow_utils::types::{RfpId, StageId};
use tracing::debug;

use crate::error::EngineError;

/// What a stage asks the gateway to run
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub rfp_id: RfpId,
    pub stage: StageId,
    /// Name of the system-role prompt, if the stage uses one
    pub system_prompt: Option<&'a str>,
    /// Name of the user prompt
    pub user_prompt: &'a str,
    pub context: &'a PromptContext,
    pub settings: StageSettings,
}

#[derive(Clone)]
pub struct Gateway {
    store: Store,
    factory: Arc<dyn BackendFactory>,
}

impl Gateway {
    pub fn new(store: Store, factory: Arc<dyn BackendFactory>) -> Self {
        Self { store, factory }
    }

    /// The provider every call would currently go to.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoProviderSelected` when none is selected.
    pub fn selected_provider(&self) -> Result<ProviderRecord, EngineError> {
        self.store
            .selected_provider()
            .ok_or(EngineError::NoProviderSelected)
    }

    /// Render `name` against `context`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown prompt (neither stored
    /// nor built in) and `EngineError::PromptResolution` when the context
    /// lacks a placeholder's value.
    pub fn render_prompt(&self, name: &str, context: &PromptContext) -> Result<String, EngineError> {
        let template = self
            .store
            .resolve_prompt_text(name)
            .ok_or_else(|| EngineError::not_found("Prompt", name))?;
        render(&template, context).map_err(|err| match err {
            TemplateError::MissingFields { missing } => EngineError::PromptResolution {
                prompt: name.to_string(),
                missing,
            },
        })
    }

    /// Run one generation call.
    ///
    /// # Errors
    ///
    /// See [`EngineError`]; provider failures arrive as
    /// `EngineError::Provider` with the classified [`LlmError`].
    pub async fn invoke(&self, request: GenerationRequest<'_>) -> Result<LlmResult, EngineError> {
        let provider = self.selected_provider()?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(Message::system(self.render_prompt(system, request.context)?));
        }
        messages.push(Message::user(
            self.render_prompt(request.user_prompt, request.context)?,
        ));

        let backend = self.factory.build(&ProviderSpec {
            name: provider.name.clone(),
            model: provider.model.clone(),
            api_key: provider.api_key.clone(),
            base_url: provider.base_url.clone(),
        })?;

        let timeout = request.settings.timeout;
        let invocation = LlmInvocation::new(
            request.rfp_id.get(),
            request.stage.as_str(),
            provider.model.clone(),
            timeout,
            messages,
        )
        .with_metadata("max_tokens", serde_json::json!(request.settings.max_tokens))
        .with_metadata("temperature", serde_json::json!(request.settings.temperature));

        debug!(
            rfp_id = %request.rfp_id,
            stage = %request.stage,
            provider = %provider.name,
            model = %provider.model,
            timeout_secs = timeout.as_secs(),
            "Invoking provider"
        );

        match tokio::time::timeout(timeout, backend.invoke(invocation)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(LlmError::Timeout { duration: timeout }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfpflow_llm::{ScriptedBackend, ScriptedFactory};
    use rfpflow_prompt_template::names;
    use rfpflow_store::NewProvider;
    use std::time::Duration;

    fn settings(timeout: Duration) -> StageSettings {
        StageSettings {
            timeout,
            max_tokens: 100,
            temperature: 0.1,
        }
    }

    fn gateway_with(backend: ScriptedBackend, select: bool) -> (Gateway, Arc<ScriptedBackend>) {
        let store = Store::in_memory();
        store
            .create_provider(NewProvider {
                name: "openai".into(),
                model: "gpt-4o-mini".into(),
                api_key: Some("sk-test".into()),
                is_selected: select,
                ..NewProvider::default()
            })
            .unwrap();
        let backend = Arc::new(backend);
        let factory = ScriptedFactory::new(Arc::clone(&backend));
        (Gateway::new(store, Arc::new(factory)), backend)
    }

    #[tokio::test]
    async fn test_requires_selected_provider() {
        let (gateway, backend) = gateway_with(ScriptedBackend::new().with_text("x"), false);
        let ctx = PromptContext::new().with("rfp_summary", "s");
        let err = gateway
            .invoke(GenerationRequest {
                rfp_id: RfpId(1),
                stage: StageId::Scope,
                system_prompt: None,
                user_prompt: names::SCOPE_SUGGESTION_USER_PROMPT,
                context: &ctx,
                settings: settings(Duration::from_secs(5)),
            })
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::NoProviderSelected);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_context_field_is_prompt_resolution_error() {
        let (gateway, backend) = gateway_with(ScriptedBackend::new().with_text("x"), true);
        let err = gateway
            .invoke(GenerationRequest {
                rfp_id: RfpId(1),
                stage: StageId::Bom,
                system_prompt: None,
                user_prompt: names::BOM_GENERATION_USER_PROMPT,
                context: &PromptContext::new().with("rfp_summary", "s"),
                settings: settings(Duration::from_secs(5)),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::PromptResolution {
                prompt: names::BOM_GENERATION_USER_PROMPT.to_string(),
                missing: vec!["vendor_info".to_string()],
            }
        );
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_renders_prompts_and_passes_settings() {
        let (gateway, backend) = gateway_with(ScriptedBackend::new().with_text("ok"), true);
        let ctx = PromptContext::new().with("text", "conteúdo da RFP");
        let result = gateway
            .invoke(GenerationRequest {
                rfp_id: RfpId(7),
                stage: StageId::Analysis,
                system_prompt: Some(names::RFP_ANALYSIS_SYSTEM_ROLE),
                user_prompt: names::RFP_ANALYSIS_USER_PROMPT,
                context: &ctx,
                settings: settings(Duration::from_secs(5)),
            })
            .await
            .unwrap();
        assert_eq!(result.raw_response, "ok");

        let call = &backend.calls()[0];
        assert_eq!(call.messages.len(), 2);
        assert!(call.user_text().contains("conteúdo da RFP"));
        assert_eq!(call.metadata["max_tokens"], serde_json::json!(100));
        assert_eq!(call.stage, "analysis");
        assert_eq!(call.rfp_id, 7);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let backend = ScriptedBackend::new()
            .with_delay(Duration::from_secs(10))
            .with_text("late");
        let (gateway, _backend) = gateway_with(backend, true);
        let ctx = PromptContext::new().with("rfp_summary", "s");
        let err = gateway
            .invoke(GenerationRequest {
                rfp_id: RfpId(1),
                stage: StageId::Scope,
                system_prompt: None,
                user_prompt: names::SCOPE_SUGGESTION_USER_PROMPT,
                context: &ctx,
                settings: settings(Duration::from_millis(50)),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Provider(LlmError::Timeout {
                duration: Duration::from_millis(50)
            })
        );
    }
}
