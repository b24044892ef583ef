//! `OpenAI`-compatible provider implementation using the `async-openai` crate.
//!
//! Serves both the `openai` and `groq` backends: Groq exposes the same chat
//! completion API under its own base URL. Neither enforces a declared
//! schema, so structured calls go out in JSON mode and the reply is run
//! through the tolerant parser.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
};
use async_trait::async_trait;
use tracing::debug;

use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// `OpenAI`-compatible LLM provider.
pub struct OpenAiProvider {
    name: &'static str,
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a provider.
    ///
    /// `name` is the backend tag reported by [`LlmProvider::name`]
    /// (`"openai"` or `"groq"`). `base_url` of `None` keeps the SDK default.
    #[must_use]
    pub fn new(
        name: &'static str,
        api_key: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(base_url) = base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            name,
            client: Client::with_config(openai_config),
            timeout,
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    ///
    /// A response schema is ignored here: these backends only get JSON mode.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let response_format = if request.json_mode || request.response_schema.is_some() {
            Some(ResponseFormat::JsonObject)
        } else {
            None
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            response_format,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("client", &"<async-openai::Client>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);
        debug!(
            backend = self.name,
            model = %request.model,
            json_mode = request.json_mode,
            "sending chat completion"
        );

        let response = tokio::time::timeout(
            self.timeout,
            self.client.chat().create(openai_request),
        )
        .await
        .map_err(|_| AgentError::Timeout {
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|e| AgentError::ApiRequest {
            message: e.to_string(),
            status: None,
        })?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message;

    fn request(json_mode: bool, schema: Option<serde_json::Value>) -> ChatRequest {
        ChatRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: vec![message::system_message("sys"), message::user_message("test")],
            temperature: Some(0.0),
            max_tokens: Some(100),
            json_mode,
            response_schema: schema,
        }
    }

    #[test]
    fn test_convert_system_message() {
        let msg = message::system_message("test");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let msg = message::user_message("hello");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_request_json_mode() {
        let built = OpenAiProvider::build_request(&request(true, None));
        assert!(built.response_format.is_some());
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.max_completion_tokens, Some(100));
        assert!(built.temperature.is_none());
    }

    #[test]
    fn test_build_request_schema_falls_back_to_json_mode() {
        let schema = serde_json::json!({"type": "object"});
        let built = OpenAiProvider::build_request(&request(false, Some(schema)));
        assert!(matches!(built.response_format, Some(ResponseFormat::JsonObject)));
    }

    #[test]
    fn test_build_request_plain_text() {
        let built = OpenAiProvider::build_request(&request(false, None));
        assert!(built.response_format.is_none());
    }

    #[test]
    fn test_provider_reports_backend_name() {
        let provider = OpenAiProvider::new(
            "groq",
            "key",
            Some("https://api.groq.com/openai/v1"),
            Duration::from_secs(5),
        );
        assert_eq!(provider.name(), "groq");
        assert!(!provider.supports_structured_output());
    }
}
