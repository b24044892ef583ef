//! Query generation agent.
//!
//! Turns one plan step into a batch of web search queries.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use super::binding::OperationBinding;
use super::config::AgentConfig;
use super::prompt::build_query_prompt;
use super::provider::LlmProvider;
use super::research::StepQueries;
use super::structured::string_field;
use super::traits::{Agent, AgentResponse, execute_structured};
use crate::error::AgentError;

/// Maximum number of queries kept from one response.
const MAX_QUERIES_PER_STEP: usize = 10;

/// Maximum byte length of a single query.
const MAX_QUERY_LEN: usize = 500;

/// Agent that generates search queries for a plan step.
pub struct QueryGenAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl QueryGenAgent {
    /// Creates a query generator for `binding`'s model.
    #[must_use]
    pub fn new(binding: &OperationBinding, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Generates queries for one step.
    ///
    /// # Errors
    ///
    /// Transport failures pass through. A response without usable queries
    /// is [`AgentError::ResponseParse`]; when the model hit its token limit
    /// the message says so.
    pub async fn generate(
        &self,
        provider: &dyn LlmProvider,
        step_id: &str,
        description: &str,
        today: NaiveDate,
    ) -> Result<(StepQueries, AgentResponse), AgentError> {
        let user_msg = build_query_prompt(step_id, description, today);
        let (map, response) = execute_structured(self, provider, &user_msg).await?;
        match Self::parse_queries(&map, description) {
            Ok(batch) => Ok((batch, response)),
            Err(_) if response.finish_reason.as_deref() == Some("length") => {
                Err(AgentError::ResponseParse {
                    message: format!(
                        "response truncated (finish_reason=length, max_tokens={})",
                        self.max_tokens
                    ),
                    content: response.content,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn parse_queries(
        map: &Map<String, Value>,
        description: &str,
    ) -> Result<StepQueries, AgentError> {
        let queries: Vec<String> = map
            .get("search_queries")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|q| !q.is_empty() && q.len() <= MAX_QUERY_LEN)
                    .take(MAX_QUERIES_PER_STEP)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if queries.is_empty() {
            return Err(AgentError::ResponseParse {
                message: "no usable 'search_queries' in response".to_string(),
                content: Value::Object(map.clone()).to_string(),
            });
        }

        Ok(StepQueries {
            plan_step: string_field(map, "plan_step").unwrap_or_else(|| description.to_string()),
            queries,
            failure: None,
        })
    }
}

#[async_trait]
impl Agent for QueryGenAgent {
    fn name(&self) -> &'static str {
        "query_gen"
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
                "plan_step": {"type": "STRING"},
                "search_queries": {"type": "ARRAY", "items": {"type": "STRING"}}
            },
            "required": ["plan_step", "search_queries"]
        }))
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::binding::Bindings;
    use crate::agent::traits::test_support::ScriptedProvider;
    use std::sync::Arc;

    fn agent() -> QueryGenAgent {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::ok(&[]));
        let bindings = Bindings::uniform(&config, &provider);
        QueryGenAgent::new(&bindings.generate_queries, &config, "queries".to_string())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 20).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_generate_queries() {
        let provider = ScriptedProvider::ok(&[
            r#"```json
{"plan_step": "Map suppliers", "search_queries": ["a", " b ", "", "c"]}
```"#,
        ]);
        let (batch, _) = agent()
            .generate(&provider, "step 1", "Map suppliers", today())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(batch.queries, vec!["a", "b", "c"]);
        assert_eq!(batch.plan_step, "Map suppliers");
        assert!(!batch.is_fallback());
    }

    #[tokio::test]
    async fn test_missing_queries_is_parse_failure() {
        let provider = ScriptedProvider::ok(&[r#"{"plan_step": "x", "search_queries": []}"#]);
        let result = agent().generate(&provider, "step 1", "x", today()).await;
        assert!(result.err().is_some_and(|e| e.is_parse_failure()));
    }

    #[tokio::test]
    async fn test_plan_step_defaults_to_description() {
        let provider = ScriptedProvider::ok(&[r#"{"search_queries": ["q"]}"#]);
        let (batch, _) = agent()
            .generate(&provider, "step 3", "Assess outlook", today())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(batch.plan_step, "Assess outlook");
    }

    #[tokio::test]
    async fn test_prompt_carries_date() {
        let provider = ScriptedProvider::ok(&[r#"{"search_queries": ["q"]}"#]);
        let _ = agent().generate(&provider, "step 1", "x", today()).await;
        let request = provider.requests.lock().map(|r| r[0].clone());
        assert!(request.is_ok_and(|r| r.messages[1].content.contains("2025-02-20")));
    }
}
