//! Iterative research mode.
//!
//! Instead of planning up front, asks the model for one search at a time,
//! conditioned on every earlier query and its processed results. Stops
//! when the budget runs out, the model declines to search, or the latest
//! search found nothing.

use std::fmt::Write;

use tracing::{debug, info, warn};

use super::config::ResearchMode;
use super::orchestrator::Orchestrator;
use super::research::{ResearchIteration, ResearchOutcome, ResearchSession};
use super::stepper::StepperAgent;
use crate::search::{NO_ANSWER, SearchResult};

/// Processed results text for a search that found nothing.
pub const NO_RESULTS: &str = "No relevant results found";

impl Orchestrator {
    /// Runs the iterative loop on a clarified session, then synthesizes.
    ///
    /// Never fails: a model that cannot produce a next step simply ends the
    /// loop, and synthesis failures become [`super::research::Report::Failed`].
    pub async fn research_iteratively(
        &self,
        session: ResearchSession,
        tokens: &mut u32,
    ) -> ResearchOutcome {
        let binding = &self.bindings.next_step;
        let agent = StepperAgent::new(binding, &self.config, self.prompts.next_step.clone());
        let mut iterations: Vec<ResearchIteration> = Vec::new();
        let mut queries_failed = 0;

        for round in 1..=self.config.max_iterations {
            let history = render_history(&iterations);
            let step = match agent
                .next_step(&*binding.provider, &session.context, &history)
                .await
            {
                Ok((step, response)) => {
                    *tokens = tokens.saturating_add(response.usage.total_tokens);
                    step
                }
                Err(e) => {
                    warn!(
                        round,
                        error = %e,
                        transport = e.is_transport_failure(),
                        "next step failed; ending research loop"
                    );
                    None
                }
            };
            let Some(step) = step else {
                info!(round, "no further query; ending research loop");
                break;
            };

            debug!(round, query = %step.query, reasoning = %step.reasoning, "running search");
            let results = self
                .executor
                .execute_all_citations(std::slice::from_ref(&step.query))
                .await;
            queries_failed += results.failures();
            let processed = results
                .get(&step.query)
                .map_or_else(|| NO_RESULTS.to_string(), process_results);
            let exhausted = processed.to_lowercase().contains("no relevant results");

            iterations.push(ResearchIteration {
                query: step.query,
                reasoning: step.reasoning,
                plan: step.plan,
                results: processed,
            });

            if exhausted {
                info!(round, "search found nothing; ending research loop");
                break;
            }
        }

        let learnings = render_history(&iterations);
        let report = self
            .synthesize(&session.initial_query, &learnings, tokens)
            .await;

        ResearchOutcome {
            mode: ResearchMode::Iterative,
            session,
            plan: None,
            steps: Vec::new(),
            queries_executed: iterations.len(),
            queries_failed,
            iterations,
            learnings,
            report,
            total_tokens: 0,
            elapsed: std::time::Duration::ZERO,
        }
    }
}

/// Renders one search result as markdown for the history.
///
/// An answer-less result without citations, or a failed search, becomes
/// [`NO_RESULTS`].
#[must_use]
pub fn process_results(result: &SearchResult) -> String {
    match result {
        SearchResult::Error { message } => format!("{NO_RESULTS} (search failed: {message})"),
        SearchResult::Answer { answer, citations } => {
            let answer = answer.trim();
            let answered = !answer.is_empty() && answer != NO_ANSWER;
            if !answered && citations.is_empty() {
                return NO_RESULTS.to_string();
            }

            let mut out = String::new();
            if answered {
                let _ = writeln!(out, "**Answer**: {answer}");
            }
            for c in citations {
                let _ = writeln!(out, "### {}", c.title.as_deref().unwrap_or("Untitled"));
                let _ = writeln!(out, "**URL**: {}", c.url);
                if let Some(snippet) = c.snippet.as_deref().map(str::trim)
                    && !snippet.is_empty()
                {
                    let _ = writeln!(out, "**Content**: {snippet}");
                }
            }
            out.trim_end().to_string()
        }
    }
}

/// Renders the rounds so far as numbered markdown sections.
///
/// Empty when nothing has run yet.
#[must_use]
pub fn render_history(iterations: &[ResearchIteration]) -> String {
    iterations
        .iter()
        .enumerate()
        .map(|(i, it)| {
            format!(
                "## Research Step {}\n**Query**: {}\n**Results**:\n{}",
                i + 1,
                it.query,
                it.results
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
