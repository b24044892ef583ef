//! Clarification agent.
//!
//! Asks the requester one follow-up question per round, given the
//! accumulated context.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::binding::OperationBinding;
use super::config::AgentConfig;
use super::prompt::build_clarify_prompt;
use super::provider::LlmProvider;
use super::research::{DEFAULT_QUESTION, FollowUp};
use super::structured::string_field;
use super::traits::{Agent, AgentResponse, execute_structured};
use crate::error::AgentError;

/// Agent that produces follow-up questions.
pub struct ClarifierAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ClarifierAgent {
    /// Creates a clarifier for `binding`'s model.
    #[must_use]
    pub fn new(binding: &OperationBinding, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Asks the model for the next follow-up question.
    ///
    /// A parsed response without a question yields
    /// [`DEFAULT_QUESTION`].
    ///
    /// # Errors
    ///
    /// Transport and parse failures are returned; the caller decides on the
    /// fallback.
    pub async fn follow_up(
        &self,
        provider: &dyn LlmProvider,
        context: &str,
    ) -> Result<(FollowUp, AgentResponse), AgentError> {
        let user_msg = build_clarify_prompt(context);
        let (map, response) = execute_structured(self, provider, &user_msg).await?;
        let follow_up = FollowUp {
            question: string_field(&map, "question")
                .unwrap_or_else(|| DEFAULT_QUESTION.to_string()),
            query_context: string_field(&map, "query_context"),
        };
        Ok((follow_up, response))
    }
}

#[async_trait]
impl Agent for ClarifierAgent {
    fn name(&self) -> &'static str {
        "clarifier"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn response_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "OBJECT",
            "properties": {
                "question": {"type": "STRING"},
                "query_context": {"type": "STRING"}
            },
            "required": ["question"]
        }))
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
