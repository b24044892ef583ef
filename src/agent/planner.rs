//! Planning agent.
//!
//! Decomposes the clarified request into an ordered [`ResearchPlan`].
//! Step keys are chosen by the model, so no schema is declared: the call
//! always goes out in JSON mode and the reply is run through the tolerant
//! parser.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::binding::OperationBinding;
use super::config::AgentConfig;
use super::prompt::build_plan_prompt;
use super::provider::LlmProvider;
use super::research::ResearchPlan;
use super::traits::{Agent, AgentResponse, execute_structured};
use crate::error::AgentError;

/// Agent that produces the research plan.
pub struct PlannerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl PlannerAgent {
    /// Creates a planner for `binding`'s model.
    #[must_use]
    pub fn new(binding: &OperationBinding, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Executes the agent and parses the plan.
    ///
    /// # Errors
    ///
    /// Transport failures pass through. Anything that does not yield at
    /// least one step is [`AgentError::PlanUnavailable`].
    pub async fn plan(
        &self,
        provider: &dyn LlmProvider,
        initial_query: &str,
        context: &str,
    ) -> Result<(ResearchPlan, AgentResponse), AgentError> {
        let user_msg = build_plan_prompt(initial_query, context);
        let (map, response) = match execute_structured(self, provider, &user_msg).await {
            Ok(ok) => ok,
            Err(e) if e.is_parse_failure() => {
                return Err(AgentError::PlanUnavailable {
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let plan = Self::parse_plan(&map)?;
        Ok((plan, response))
    }

    /// Reads the step map from `{"plan": {...}}`, or from the top level
    /// when the model dropped the wrapper.
    fn parse_plan(map: &Map<String, Value>) -> Result<ResearchPlan, AgentError> {
        match map.get("plan") {
            Some(Value::Object(steps)) => ResearchPlan::from_map(steps),
            Some(other) => Err(AgentError::PlanUnavailable {
                message: format!("'plan' is not an object: {other}"),
            }),
            None if !map.is_empty() && map.values().all(Value::is_string) => {
                ResearchPlan::from_map(map)
            }
            None => Err(AgentError::PlanUnavailable {
                message: "response has no 'plan' object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
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

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
