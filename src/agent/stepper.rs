//! Next-step agent for the iterative research loop.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::binding::OperationBinding;
use super::config::AgentConfig;
use super::prompt::build_step_prompt;
use super::provider::LlmProvider;
use super::structured::string_field;
use super::traits::{Agent, AgentResponse, execute_structured};
use crate::error::AgentError;

/// The model's choice of the next search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStep {
    /// Query to run.
    pub query: String,
    /// Why this query.
    pub reasoning: String,
    /// Remaining plan.
    pub plan: String,
}

/// Agent that picks one search at a time.
pub struct StepperAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl StepperAgent {
    /// Creates a stepper for `binding`'s model.
    #[must_use]
    pub fn new(binding: &OperationBinding, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Asks for the next search given the rendered `history`.
    ///
    /// Returns `None` when the model declines to produce a query.
    ///
    /// # Errors
    ///
    /// Transport and parse failures are returned unchanged.
    pub async fn next_step(
        &self,
        provider: &dyn LlmProvider,
        request: &str,
        history: &str,
    ) -> Result<(Option<NextStep>, AgentResponse), AgentError> {
        let user_msg = build_step_prompt(request, history);
        let (map, response) = execute_structured(self, provider, &user_msg).await?;
        let step = string_field(&map, "query").map(|query| NextStep {
            query,
            reasoning: string_field(&map, "reasoning").unwrap_or_default(),
            plan: string_field(&map, "plan").unwrap_or_default(),
        });
        Ok((step, response))
    }
}

#[async_trait]
impl Agent for StepperAgent {
    fn name(&self) -> &'static str {
        "stepper"
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
                "query": {"type": "STRING"},
                "reasoning": {"type": "STRING"},
                "plan": {"type": "STRING"}
            },
            "required": ["query", "reasoning"]
        }))
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
