//! Google Gemini provider over the `generateContent` REST endpoint.
//!
//! Gemini enforces a declared response schema natively: when a request
//! carries one, it goes out as `responseSchema` with
//! `responseMimeType: application/json` and the reply text is the JSON
//! document itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::AgentError;

/// Longest error body carried into an [`AgentError::ApiRequest`] message.
const MAX_ERROR_BODY: usize = 512;

/// Gemini LLM provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiProvider {
    /// Creates a provider against `base_url` (e.g.
    /// `https://generativelanguage.googleapis.com/v1beta`).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AgentError::ApiRequest {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    /// Builds the JSON request body.
    ///
    /// System messages become the top-level `system_instruction`; user
    /// messages become `user` turns in `contents`.
    fn build_request_body(request: &ChatRequest) -> Value {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| json!({"role": "user", "parts": [{"text": m.content}]}))
            .collect();

        let mut generation_config = serde_json::Map::new();
        if let Some(max_tokens) = request.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if request.json_mode || request.response_schema.is_some() {
            generation_config.insert(
                "responseMimeType".to_string(),
                json!("application/json"),
            );
        }
        if let Some(schema) = &request.response_schema {
            generation_config.insert("responseSchema".to_string(), schema.clone());
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": Value::Object(generation_config),
        });

        if let Some(system) = request.system_text() {
            body["system_instruction"] = json!({"parts": [{"text": system}]});
        }

        body
    }

    /// Extracts text, usage and finish reason from a response body.
    fn parse_response(body: &Value) -> Result<ChatResponse, AgentError> {
        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| AgentError::ResponseParse {
                message: "missing or empty 'candidates' array".to_string(),
                content: body.to_string(),
            })?;

        let content: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = candidate["finishReason"]
            .as_str()
            .map(str::to_lowercase);

        let usage_metadata = &body["usageMetadata"];
        let count = |key: &str| {
            usage_metadata[key]
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };
        let usage = TokenUsage {
            prompt_tokens: count("promptTokenCount"),
            completion_tokens: count("candidatesTokenCount"),
            total_tokens: count("totalTokenCount"),
        };

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn supports_structured_output(&self) -> bool {
        true
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let body = Self::build_request_body(request);
        debug!(
            model = %request.model,
            schema = request.response_schema.is_some(),
            "sending Gemini generateContent"
        );

        let response = self
            .client
            .post(self.endpoint_url(&request.model))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    AgentError::ApiRequest {
                        message: format!("request to Gemini failed: {}", e.without_url()),
                        status: None,
                    }
                }
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| AgentError::ApiRequest {
            message: format!("failed to read response body: {}", e.without_url()),
            status: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            let mut message = body_text;
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| message.is_char_boundary(i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            return Err(AgentError::ApiRequest {
                message,
                status: Some(status.as_u16()),
            });
        }

        let json: Value =
            serde_json::from_str(&body_text).map_err(|e| AgentError::ResponseParse {
                message: format!("invalid JSON envelope: {e}"),
                content: body_text.clone(),
            })?;

        Self::parse_response(&json)
    }
}
