//! Synthesizer agent for the final report.
//!
//! Takes the original request and the learnings text and produces a
//! markdown report. Schema-enforcing backends return it wrapped in a
//! `reportMarkdown` field; other backends may return the wrapper or the
//! markdown itself.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::binding::OperationBinding;
use super::config::AgentConfig;
use super::prompt::build_report_prompt;
use super::provider::LlmProvider;
use super::structured::{self, string_field};
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Field holding the report in structured responses.
const REPORT_FIELD: &str = "reportMarkdown";

/// Agent that writes the final report.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a synthesizer for `binding`'s model.
    #[must_use]
    pub fn new(binding: &OperationBinding, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: binding.model.clone(),
            max_tokens: config.report_max_tokens,
            system_prompt,
        }
    }

    /// Writes the report for `prompt` from `learnings`.
    ///
    /// # Errors
    ///
    /// Transport failures pass through. A schema-enforced response without
    /// a `reportMarkdown` string, or an empty report, is
    /// [`AgentError::ResponseParse`].
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        prompt: &str,
        learnings: &str,
    ) -> Result<(String, AgentResponse), AgentError> {
        let user_msg = build_report_prompt(prompt, learnings);
        let response = self.execute(provider, &user_msg).await?;
        let markdown = Self::extract_report(&response.content, provider.supports_structured_output())?;
        Ok((markdown, response))
    }

    fn extract_report(content: &str, native: bool) -> Result<String, AgentError> {
        let parse_error = |message: &str| AgentError::ResponseParse {
            message: message.to_string(),
            content: content.to_string(),
        };

        if native {
            let value: Value = serde_json::from_str(content.trim())
                .map_err(|e| parse_error(&format!("report is not JSON: {e}")))?;
            return value
                .as_object()
                .and_then(|map| string_field(map, REPORT_FIELD))
                .ok_or_else(|| parse_error("response has no 'reportMarkdown' string"));
        }

        if let Ok(map) = structured::parse(content)
            && let Some(markdown) = string_field(&map, REPORT_FIELD)
        {
            return Ok(markdown);
        }

        let markdown = content.trim();
        if markdown.is_empty() {
            return Err(parse_error("report is empty"));
        }
        Ok(markdown.to_string())
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn response_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "OBJECT",
            "properties": {"reportMarkdown": {"type": "STRING"}},
            "required": ["reportMarkdown"]
        }))
    }

    fn temperature(&self) -> f32 {
        0.4
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
