//! Anthropic Messages API backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{HttpParams, LlmBackend, LlmInvocation, LlmResult, Message, Role, resolve_params};
use rfpflow_utils::error::LlmError;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the key or model is empty
    pub fn new(
        client: HttpClient,
        base_url: String,
        api_key: String,
        default_model: String,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "anthropic provider has no API key configured".to_string(),
            ));
        }
        if default_model.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "anthropic provider has no model configured".to_string(),
            ));
        }

        Ok(Self {
            client,
            base_url,
            api_key,
            default_model,
            default_params: HttpParams::default(),
        })
    }

    /// Split out system messages; Anthropic takes them as a top-level field.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = system_prompt.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        system_prompt = Some(msg.content.clone());
                    }
                }
                Role::User => anthropic_messages.push(AnthropicMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                Role::Assistant => anthropic_messages.push(AnthropicMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, anthropic_messages)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = resolve_params(&inv, &self.default_model, self.default_params);

        debug!(
            provider = "anthropic",
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let (system_prompt, anthropic_messages) = Self::convert_messages(&inv.messages);

        let request_body = AnthropicRequest {
            model: model.clone(),
            messages: anthropic_messages,
            // Temperature above 1.0 is rejected by the Messages API
            temperature: params.temperature.min(1.0),
            max_tokens: params.max_tokens,
            system: system_prompt,
        };

        let request = self
            .client
            .inner()
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body);

        let response = self
            .client
            .execute(request, inv.timeout, "anthropic")
            .await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        if response_body.stop_reason.as_deref() == Some("refusal") {
            return Err(LlmError::Rejected(
                "anthropic declined to answer (refusal)".to_string(),
            ));
        }

        let content: String = response_body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.trim().is_empty() {
            return Err(LlmError::MalformedResponse(
                "Anthropic response missing text content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "anthropic", model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }
        if let Some(reason) = response_body.stop_reason {
            result = result.with_extension("stop_reason", serde_json::Value::String(reason));
        }

        debug!(
            provider = "anthropic",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_messages_hoists_system() {
        let messages = vec![
            Message::system("Persona"),
            Message::system("Regras"),
            Message::user("Analise"),
        ];
        let (system, rest) = AnthropicBackend::convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("Persona\n\nRegras"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role, "user");
    }

    #[test]
    fn test_convert_messages_without_system() {
        let (system, rest) = AnthropicBackend::convert_messages(&[Message::user("oi")]);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_request_omits_empty_system() {
        let body = AnthropicRequest {
            model: "claude-sonnet-4".to_string(),
            messages: vec![],
            max_tokens: 10,
            temperature: 0.2,
            system: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_missing_model_is_misconfiguration() {
        let result = AnthropicBackend::new(
            HttpClient::new().unwrap(),
            "http://localhost".to_string(),
            "key".to_string(),
            String::new(),
        );
        assert!(matches!(result, Err(LlmError::Misconfiguration(_))));
    }
}
