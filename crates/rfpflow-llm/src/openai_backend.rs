//! OpenAI-compatible chat-completions backend
//!
//! Serves both the OpenAI API and OpenRouter, which speaks the same wire
//! format. OpenRouter additionally receives its attribution headers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{HttpParams, LlmBackend, LlmInvocation, LlmResult, Message, Role, resolve_params};
use rfpflow_utils::error::LlmError;

const OPENROUTER_REFERER: &str = "https://github.com/rfpflow/rfpflow";
const OPENROUTER_TITLE: &str = "rfpflow";

/// Which flavour of the chat-completions API is being spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    OpenAi,
    OpenRouter,
}

impl Flavor {
    const fn provider_name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
        }
    }
}

#[derive(Clone)]
pub(crate) struct OpenAiCompatibleBackend {
    client: HttpClient,
    flavor: Flavor,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl OpenAiCompatibleBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the key or model is empty
    pub fn new(
        client: HttpClient,
        flavor: Flavor,
        base_url: String,
        api_key: String,
        default_model: String,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Misconfiguration(format!(
                "{} provider has no API key configured",
                flavor.provider_name()
            )));
        }
        if default_model.trim().is_empty() {
            return Err(LlmError::Misconfiguration(format!(
                "{} provider has no model configured",
                flavor.provider_name()
            )));
        }

        Ok(Self {
            client,
            flavor,
            base_url,
            api_key,
            default_model,
            default_params: HttpParams::default(),
        })
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let provider = self.flavor.provider_name();
        let (model, params) = resolve_params(&inv, &self.default_model, self.default_params);

        debug!(
            provider = provider,
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat-completions backend"
        );

        let request_body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let mut request = self
            .client
            .inner()
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request_body);
        if self.flavor == Flavor::OpenRouter {
            request = request
                .header("HTTP-Referer", OPENROUTER_REFERER)
                .header("X-Title", OPENROUTER_TITLE);
        }

        let response = self.client.execute(request, inv.timeout, provider).await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse {provider} response: {e}"))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            LlmError::MalformedResponse(format!("{provider} response missing choices[0]"))
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(LlmError::Rejected(format!(
                "{provider} withheld the completion (content_filter)"
            )));
        }

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                LlmError::MalformedResponse(format!("{provider} response has no content"))
            })?;

        let mut result = LlmResult::new(content, provider, body.model.unwrap_or(model));
        if let Some(usage) = body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        debug!(
            provider = provider,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat-completions invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
