//! Data types for research sessions, plans, step results and reports.

use std::fmt::{self, Write};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use super::config::ResearchMode;
use crate::error::AgentError;
use crate::search::QueryResults;

/// Question used when a clarify response cannot be parsed.
pub const FALLBACK_QUESTION: &str = "Could you clarify further?";

/// Question used when a parsed clarify response has no question.
pub const DEFAULT_QUESTION: &str = "Could you elaborate?";

/// Query batch substituted when query generation fails.
pub const FALLBACK_QUERY: &str = "No queries generated";

/// One clarification round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interaction {
    /// 1-based round number.
    pub iteration: usize,
    /// Question asked.
    pub question: String,
    /// Requester's answer.
    pub answer: String,
    /// Accumulated context after this round.
    pub context_snapshot: String,
}

/// One end-to-end run for a single initial query.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchSession {
    /// The query as first entered.
    pub initial_query: String,
    /// Clarification rounds, in order.
    pub history: Vec<Interaction>,
    /// Running context: initial query plus every follow-up fragment.
    pub context: String,
}

impl ResearchSession {
    /// Starts a session; the context begins as the initial query.
    #[must_use]
    pub fn new(initial_query: &str) -> Self {
        Self {
            initial_query: initial_query.to_string(),
            history: Vec::new(),
            context: initial_query.to_string(),
        }
    }

    /// Records one question/answer round and extends the context.
    pub fn record(&mut self, question: &str, answer: &str) {
        let _ = write!(
            self.context,
            " Follow-up Q: {question} Follow-up A: {answer}"
        );
        self.history.push(Interaction {
            iteration: self.history.len() + 1,
            question: question.to_string(),
            answer: answer.to_string(),
            context_snapshot: self.context.clone(),
        });
    }
}

/// A clarify response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    /// Question for the requester.
    pub question: String,
    /// The model's restatement of the request so far, if given.
    pub query_context: Option<String>,
}

impl FollowUp {
    /// The fixed question used when the response could not be parsed.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            question: FALLBACK_QUESTION.to_string(),
            query_context: None,
        }
    }
}

/// One plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    /// Step identifier as returned by the planner (e.g. `"step 1"`).
    pub id: String,
    /// What to investigate.
    pub description: String,
}

/// Ordered decomposition of a topic into steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchPlan {
    steps: Vec<PlanStep>,
}

impl ResearchPlan {
    /// Builds a plan from the planner's step map, in document order.
    ///
    /// Non-string descriptions are kept as their JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PlanUnavailable`] for an empty map.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, AgentError> {
        let steps: Vec<PlanStep> = map
            .iter()
            .map(|(id, value)| PlanStep {
                id: id.clone(),
                description: match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })
            .collect();
        if steps.is_empty() {
            return Err(AgentError::PlanUnavailable {
                message: "planner returned no steps".to_string(),
            });
        }
        Ok(Self { steps })
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false` for a constructed plan.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Search queries generated for one plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepQueries {
    /// Plan step the model says it answered.
    pub plan_step: String,
    /// Queries in submission order.
    pub queries: Vec<String>,
    /// Why generation failed, for the fallback batch.
    pub failure: Option<String>,
}

impl StepQueries {
    /// The `["No queries generated"]` batch substituted on failure.
    #[must_use]
    pub fn fallback(plan_step: &str, reason: impl Into<String>) -> Self {
        Self {
            plan_step: plan_step.to_string(),
            queries: vec![FALLBACK_QUERY.to_string()],
            failure: Some(reason.into()),
        }
    }

    /// Returns `true` for the substituted batch.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }
}

/// Everything produced for one plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Step identifier.
    pub step_id: String,
    /// Step description.
    pub description: String,
    /// Results keyed by query, with submission order.
    pub results: QueryResults,
}

/// One round of the iterative loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchIteration {
    /// Query that was run.
    pub query: String,
    /// Why the model chose it.
    pub reasoning: String,
    /// The model's remaining plan at that point.
    pub plan: String,
    /// Processed results as markdown.
    pub results: String,
}

/// The synthesized report, or why it could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Markdown produced by the report agent.
    Generated(String),
    /// Synthesis failed.
    Failed {
        /// Failure description.
        error: String,
    },
}

impl Report {
    /// Returns `true` when the report was produced.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }

    /// Markdown document to show and persist.
    ///
    /// A failure still renders as a document stating what went wrong.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        match self {
            Self::Generated(markdown) => markdown.clone(),
            Self::Failed { error } => format!(
                "# Research Report Unavailable\n\n\
                 The research completed, but the report could not be generated.\n\n\
                 **Error:** {error}\n"
            ),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// Orchestration mode that ran.
    pub mode: ResearchMode,
    /// Clarification record.
    pub session: ResearchSession,
    /// Plan, in plan mode.
    pub plan: Option<ResearchPlan>,
    /// Per-step results, in plan mode.
    pub steps: Vec<StepResult>,
    /// Rounds, in iterative mode.
    pub iterations: Vec<ResearchIteration>,
    /// Text handed to the report agent.
    pub learnings: String,
    /// Final report.
    pub report: Report,
    /// Searches sent to the backend.
    pub queries_executed: usize,
    /// Searches that produced an error entry.
    pub queries_failed: usize,
    /// Tokens reported by the LLM backends.
    pub total_tokens: u32,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl fmt::Display for ResearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.mode {
            ResearchMode::Plan => format!("{} steps", self.steps.len()),
            ResearchMode::Iterative => format!("{} iterations", self.iterations.len()),
        };
        write!(
            f,
            "{} mode | {shape} | {} queries ({} failed) | {} tokens | {:.1}s",
            self.mode,
            self.queries_executed,
            self.queries_failed,
            self.total_tokens,
            self.elapsed.as_secs_f64()
        )?;
        if !self.report.is_generated() {
            f.write_str(" | report failed")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_records_rounds_in_order() {
        let mut session = ResearchSession::new("tariffs");
        session.record("Which years?", "2024-2025");
        session.record("Which regions?", "US and Taiwan");
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[1].iteration, 2);
        assert_eq!(
            session.context,
            "tariffs Follow-up Q: Which years? Follow-up A: 2024-2025 \
             Follow-up Q: Which regions? Follow-up A: US and Taiwan"
        );
        assert_eq!(session.history[0].context_snapshot, "tariffs Follow-up Q: Which years? Follow-up A: 2024-2025");
    }

    #[test]
    fn test_plan_keeps_document_order() {
        let map = json!({"step 2": "b", "step 1": "a", "step 3": {"detail": 1}});
        let plan = ResearchPlan::from_map(map.as_object().unwrap_or(&Map::new()))
            .unwrap_or_else(|_| unreachable!());
        let ids: Vec<&str> = plan.steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["step 2", "step 1", "step 3"]);
        assert_eq!(plan.steps()[2].description, r#"{"detail":1}"#);
    }

    #[test]
    fn test_empty_plan_is_unavailable() {
        let result = ResearchPlan::from_map(&Map::new());
        assert!(matches!(result, Err(AgentError::PlanUnavailable { .. })));
    }

    #[test]
    fn test_fallback_queries() {
        let batch = StepQueries::fallback("step 1", "no JSON");
        assert!(batch.is_fallback());
        assert_eq!(batch.queries, vec![FALLBACK_QUERY.to_string()]);
    }

    #[test]
    fn test_failed_report_renders_error() {
        let report = Report::Failed {
            error: "HTTP 503".to_string(),
        };
        let md = report.to_markdown();
        assert!(md.starts_with("# Research Report Unavailable"));
        assert!(md.contains("HTTP 503"));
        assert_eq!(Report::Generated("# R".to_string()).to_markdown(), "# R");
    }
}
