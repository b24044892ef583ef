//! Orchestrator for the research pipeline.
//!
//! Drives one run end to end:
//! clarify → plan → per-step query generation and search → learnings →
//! report. Stages run strictly in sequence; the only concurrency is the
//! query executor's fan-out inside a step.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use super::binding::Bindings;
use super::clarifier::ClarifierAgent;
use super::config::{AgentConfig, ResearchMode};
use super::interviewer::Interviewer;
use super::learnings::extract_learnings;
use super::planner::PlannerAgent;
use super::prompt::PromptSet;
use super::query_gen::QueryGenAgent;
use super::research::{
    FALLBACK_QUERY, FollowUp, Report, ResearchOutcome, ResearchPlan, ResearchSession,
    StepQueries, StepResult,
};
use super::synthesizer::SynthesizerAgent;
use crate::error::AgentError;
use crate::search::{QueryExecutor, QueryResults, SearchClient, SearchResult};

/// Orchestrates the research workflow.
pub struct Orchestrator {
    pub(super) bindings: Bindings,
    pub(super) executor: QueryExecutor,
    pub(super) config: AgentConfig,
    pub(super) prompts: PromptSet,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling
    /// back to compiled-in defaults.
    #[must_use]
    pub fn new(bindings: Bindings, search: Arc<dyn SearchClient>, config: AgentConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let executor = QueryExecutor::new(search, config.max_concurrency, config.top_citations);
        Self {
            bindings,
            executor,
            config,
            prompts,
        }
    }

    /// Replaces the loaded prompts.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Runs the configured research mode for `query`.
    ///
    /// Clarification runs first in both modes.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty query,
    /// [`AgentError::Interaction`] if the requester cannot be read,
    /// and [`AgentError::PlanUnavailable`] when plan mode gets no plan.
    pub async fn run(
        &self,
        query: &str,
        interviewer: &dyn Interviewer,
    ) -> Result<ResearchOutcome, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::Orchestration {
                message: "Query cannot be empty".to_string(),
            });
        }

        let start = Instant::now();
        let mut tokens: u32 = 0;
        let session = self.clarify(query, interviewer, &mut tokens).await?;

        let mut outcome = match self.config.mode {
            ResearchMode::Plan => self.research_plan(session, &mut tokens).await?,
            ResearchMode::Iterative => self.research_iteratively(session, &mut tokens).await,
        };
        outcome.total_tokens = tokens;
        outcome.elapsed = start.elapsed();
        info!(summary = %outcome, "research finished");
        Ok(outcome)
    }

    /// Runs the clarification rounds.
    ///
    /// A failed clarify call never stops the loop: the fallback question is
    /// asked instead.
    ///
    /// # Errors
    ///
    /// Only a failure to read the requester's answer is returned.
    pub async fn clarify(
        &self,
        query: &str,
        interviewer: &dyn Interviewer,
        tokens: &mut u32,
    ) -> Result<ResearchSession, AgentError> {
        let binding = &self.bindings.clarify;
        let agent = ClarifierAgent::new(binding, &self.config, self.prompts.clarify.clone());
        let mut session = ResearchSession::new(query);

        for round in 1..=self.config.clarify_iterations {
            let follow_up = match agent.follow_up(&*binding.provider, &session.context).await {
                Ok((follow_up, response)) => {
                    *tokens = tokens.saturating_add(response.usage.total_tokens);
                    follow_up
                }
                Err(e) => {
                    warn!(
                        round,
                        error = %e,
                        transport = e.is_transport_failure(),
                        "clarify failed; asking fallback question"
                    );
                    FollowUp::fallback()
                }
            };
            let answer = interviewer.ask(&follow_up.question).await?;
            session.record(&follow_up.question, answer.trim());
            debug!(
                round,
                question = %follow_up.question,
                context = follow_up.query_context.as_deref().unwrap_or_default(),
                "clarification recorded"
            );
        }

        Ok(session)
    }

    /// Runs plan mode on a clarified session.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PlanUnavailable`] if the planner call fails or
    /// yields no steps.
    pub async fn research_plan(
        &self,
        session: ResearchSession,
        tokens: &mut u32,
    ) -> Result<ResearchOutcome, AgentError> {
        let plan = self.plan(&session, tokens).await?;
        info!(steps = plan.len(), "research plan ready");

        let mut steps = Vec::with_capacity(plan.len());
        let mut queries_executed = 0;
        let mut queries_failed = 0;

        for step in plan.steps() {
            let batch = self.generate_queries(&step.id, &step.description, tokens).await;
            let results = if batch.is_fallback() {
                let reason = batch.failure.as_deref().unwrap_or_default();
                QueryResults::single(
                    FALLBACK_QUERY,
                    SearchResult::error(format!("query generation failed: {reason}")),
                )
            } else {
                let results = self.executor.execute(&batch.queries).await;
                queries_executed += results.len();
                queries_failed += results.failures();
                results
            };
            info!(
                step = %step.id,
                queries = results.len(),
                failed = results.failures(),
                "step complete"
            );
            steps.push(StepResult {
                step_id: step.id.clone(),
                description: step.description.clone(),
                results,
            });
        }

        let learnings = extract_learnings(&steps);
        let report = self
            .synthesize(&session.initial_query, &learnings, tokens)
            .await;

        Ok(ResearchOutcome {
            mode: ResearchMode::Plan,
            session,
            plan: Some(plan),
            steps,
            iterations: Vec::new(),
            learnings,
            report,
            queries_executed,
            queries_failed,
            total_tokens: 0,
            elapsed: std::time::Duration::ZERO,
        })
    }

    async fn plan(
        &self,
        session: &ResearchSession,
        tokens: &mut u32,
    ) -> Result<ResearchPlan, AgentError> {
        let binding = &self.bindings.plan;
        let agent = PlannerAgent::new(binding, &self.config, self.prompts.plan.clone());
        let (plan, response) = agent
            .plan(&*binding.provider, &session.initial_query, &session.context)
            .await
            .map_err(|e| match e {
                AgentError::PlanUnavailable { .. } => e,
                other => AgentError::PlanUnavailable {
                    message: other.to_string(),
                },
            })?;
        *tokens = tokens.saturating_add(response.usage.total_tokens);

        if plan.len() != self.config.expected_plan_steps {
            warn!(
                expected = self.config.expected_plan_steps,
                got = plan.len(),
                "plan step count differs from the requested size"
            );
        }
        Ok(plan)
    }

    /// Generates queries for one step, substituting the fallback batch on
    /// any failure.
    async fn generate_queries(
        &self,
        step_id: &str,
        description: &str,
        tokens: &mut u32,
    ) -> StepQueries {
        let binding = &self.bindings.generate_queries;
        let agent = QueryGenAgent::new(binding, &self.config, self.prompts.queries.clone());
        let today = Local::now().date_naive();

        match agent
            .generate(&*binding.provider, step_id, description, today)
            .await
        {
            Ok((batch, response)) => {
                *tokens = tokens.saturating_add(response.usage.total_tokens);
                debug!(step = step_id, answered = %batch.plan_step, "queries generated");
                if batch.queries.len() != self.config.expected_queries_per_step {
                    warn!(
                        step = step_id,
                        expected = self.config.expected_queries_per_step,
                        got = batch.queries.len(),
                        "query count differs from the requested size"
                    );
                }
                batch
            }
            Err(e) => {
                warn!(
                    step = step_id,
                    error = %e,
                    transport = e.is_transport_failure(),
                    "query generation failed; step will not be searched"
                );
                StepQueries::fallback(description, e.to_string())
            }
        }
    }

    /// Writes the report. Failures become [`Report::Failed`].
    pub async fn synthesize(&self, prompt: &str, learnings: &str, tokens: &mut u32) -> Report {
        let binding = &self.bindings.synthesize_report;
        let agent = SynthesizerAgent::new(binding, &self.config, self.prompts.report.clone());
        match agent.synthesize(&*binding.provider, prompt, learnings).await {
            Ok((markdown, response)) => {
                *tokens = tokens.saturating_add(response.usage.total_tokens);
                Report::Generated(markdown)
            }
            Err(e) => {
                warn!(error = %e, "report synthesis failed");
                Report::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("bindings", &self.bindings)
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
