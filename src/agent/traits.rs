//! Agent trait definition.
//!
//! All agents (clarifier, planner, query generator, stepper, synthesizer)
//! implement this trait, which provides a uniform interface for the
//! orchestrators.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use super::structured;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate one pipeline operation with a fixed system prompt
/// and model. The prompt is bound at construction, independent of the
/// backend that ends up serving the call.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Output schema declared to backends with native structured output.
    fn response_schema(&self) -> Option<Value> {
        None
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// Sends exactly one request. The schema is attached only when the
    /// provider enforces schemas natively.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let response_schema = if provider.supports_structured_output() {
            self.response_schema()
        } else {
            None
        };

        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            response_schema,
        };

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent and decodes its response into a JSON object.
///
/// Schema-enforcing providers return the document itself, which is decoded
/// strictly. Other providers go through the tolerant
/// [`structured::parse`].
///
/// # Errors
///
/// Transport failures pass through unchanged. Undecodable output yields
/// [`AgentError::ResponseParse`] or [`AgentError::NoStructuredData`].
pub async fn execute_structured(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    user_msg: &str,
) -> Result<(Map<String, Value>, AgentResponse), AgentError> {
    let response = agent.execute(provider, user_msg).await?;

    let native = provider.supports_structured_output() && agent.response_schema().is_some();
    let map = if native {
        match serde_json::from_str::<Value>(response.content.trim()) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(AgentError::ResponseParse {
                    message: format!("{} expected a JSON object, got {other}", agent.name()),
                    content: response.content,
                });
            }
            Err(e) => {
                return Err(AgentError::ResponseParse {
                    message: format!("{}: {e}", agent.name()),
                    content: response.content,
                });
            }
        }
    } else {
        structured::parse(&response.content)?
    };

    Ok((map, response))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Mock provider shared by agent and orchestrator tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::provider::LlmProvider;
    use crate::error::AgentError;

    /// Replays canned responses in order and records every request.
    pub struct ScriptedProvider {
        name: &'static str,
        structured: bool,
        replies: Mutex<VecDeque<Result<String, AgentError>>>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<String, AgentError>>) -> Self {
            Self {
                name: "mock",
                structured: false,
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn structured(mut self) -> Self {
            self.structured = true;
            self
        }

        pub fn ok(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().map(|r| r.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports_structured_output(&self) -> bool {
            self.structured
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            let next = self
                .replies
                .lock()
                .ok()
                .and_then(|mut r| r.pop_front())
                .unwrap_or_else(|| {
                    Err(AgentError::ApiRequest {
                        message: "no scripted reply left".to_string(),
                        status: None,
                    })
                });
            next.map(|content| ChatResponse {
                content,
                usage: TokenUsage {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    total_tokens: 2,
                },
                finish_reason: Some("stop".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedProvider;
    use super::*;
    use serde_json::json;

    struct EchoAgent {
        schema: Option<Value>,
    }

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-model"
        }

        fn system_prompt(&self) -> &str {
            "system"
        }

        fn json_mode(&self) -> bool {
            true
        }

        fn response_schema(&self) -> Option<Value> {
            self.schema.clone()
        }
    }

    fn schema() -> Option<Value> {
        Some(json!({"type": "OBJECT", "properties": {"question": {"type": "STRING"}}}))
    }

    #[tokio::test]
    async fn test_schema_only_sent_to_structured_provider() {
        let agent = EchoAgent { schema: schema() };

        let plain = ScriptedProvider::ok(&["{}"]);
        let _ = agent.execute(&plain, "hi").await;
        let sent = plain.requests.lock().map(|r| r[0].clone());
        assert!(sent.is_ok_and(|r| r.response_schema.is_none() && r.json_mode));

        let native = ScriptedProvider::ok(&["{}"]).structured();
        let _ = agent.execute(&native, "hi").await;
        let sent = native.requests.lock().map(|r| r[0].clone());
        assert!(sent.is_ok_and(|r| r.response_schema.is_some()));
    }

    #[tokio::test]
    async fn test_structured_uses_tolerant_parser_without_native_schema() {
        let agent = EchoAgent { schema: schema() };
        let provider = ScriptedProvider::ok(&["Sure: {\"question\": \"Which years?\"} ok"]);
        let (map, _) = execute_structured(&agent, &provider, "q")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(map.get("question"), Some(&json!("Which years?")));
    }

    #[tokio::test]
    async fn test_native_schema_is_decoded_strictly() {
        let agent = EchoAgent { schema: schema() };
        let provider = ScriptedProvider::ok(&["Sure: {\"question\": \"x\"}"]).structured();
        let result = execute_structured(&agent, &provider, "q").await;
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_unchanged() {
        let agent = EchoAgent { schema: None };
        let provider = ScriptedProvider::new(vec![Err(AgentError::ApiRequest {
            message: "boom".to_string(),
            status: Some(503),
        })]);
        let result = execute_structured(&agent, &provider, "q").await;
        assert!(matches!(
            result,
            Err(AgentError::ApiRequest { status: Some(503), .. })
        ));
    }
}
