//! System prompts and template builders for agents.
//!
//! Each operation's system prompt is fixed when the agents are built and
//! does not depend on the backend serving the call. Template builders
//! format the user messages.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// System prompt for the clarification agent.
pub const CLARIFY_SYSTEM_PROMPT: &str = r#"You are a research analyst preparing a brief for an automated research agent. You receive the user's research request, possibly followed by earlier follow-up questions and the user's answers.

Read what is already known and ask the ONE follow-up question whose answer would most improve the research: scope, time frame, geography, audience, depth, or the decision the research should support. Do not repeat a question that was already answered.

Respond with a JSON object and nothing else:
{
  "question": "the follow-up question to ask the user",
  "query_context": "the request restated together with everything learned so far"
}"#;

/// System prompt for the planning agent.
pub const PLAN_SYSTEM_PROMPT: &str = r#"You are a research strategist. Given a research request and the context gathered from the user, break the work into a sequence of research steps.

Each step must be a self-contained phase that can be turned into a handful of web searches. Order the steps so that later steps build on earlier ones. Produce exactly 5 steps.

Respond with a JSON object and nothing else:
{
  "plan": {
    "step 1": "what to investigate in step 1",
    "step 2": "what to investigate in step 2",
    "step 3": "what to investigate in step 3",
    "step 4": "what to investigate in step 4",
    "step 5": "what to investigate in step 5"
  }
}"#;

/// System prompt for the query generation agent.
pub const QUERIES_SYSTEM_PROMPT: &str = r#"You turn one step of a research plan into web search queries. Queries must be specific enough to return focused results from a general web search engine: name the entities, periods and metrics involved. Prefer recent sources; the current date is given with the step.

Produce exactly 3 queries.

Respond with a JSON object and nothing else:
{
  "plan_step": "the plan step you were given",
  "search_queries": ["first query", "second query", "third query"]
}"#;

/// System prompt for the report agent.
pub const REPORT_SYSTEM_PROMPT: &str = r##"You are a senior analyst writing the final deliverable of a research project. You receive the original request inside <prompt> tags and every learning gathered during research inside <learnings> tags. Each learning carries the query that produced it, the answer found and its sources.

Write a detailed, well-structured markdown report that answers the request:
- Use every learning. Do not drop findings because they are minor.
- Organize by theme with headings and subsections; open with an executive summary.
- Cite inline in each subsection using markdown links to the source URLs given with the learnings.
- Point out contradictions between sources and gaps the research could not close.
- Do not invent facts or sources that are not in the learnings.

Respond with a JSON object whose "reportMarkdown" field holds the whole report:
{"reportMarkdown": "# Title\n..."}"##;

/// System prompt for the iterative next-step agent.
pub const NEXT_STEP_SYSTEM_PROMPT: &str = r#"You are a research analyst working one search at a time. You receive the research request and the history of searches run so far with their results.

Decide the single most valuable next web search. Use the results already gathered: follow promising leads, fill gaps and avoid repeating earlier queries. When the request is fully covered, return an empty query to stop.

Respond with a JSON object and nothing else:
{
  "query": "the next search query, or an empty string when research is complete",
  "reasoning": "why this search is the best next step",
  "plan": "the remaining research plan in one or two sentences"
}"#;

/// Default prompt directory relative to home.
const DEFAULT_PROMPT_DIR: &str = ".config/deeper-seeker/prompts";

const CLARIFY_FILENAME: &str = "clarify.md";
const PLAN_FILENAME: &str = "plan.md";
const QUERIES_FILENAME: &str = "queries.md";
const REPORT_FILENAME: &str = "report.md";
const NEXT_STEP_FILENAME: &str = "next_step.md";

/// Loaded prompt templates, one per operation.
///
/// Use [`PromptSet::load`] to read from disk with fallback to compiled-in
/// defaults, or [`PromptSet::defaults`] for the built-in prompts only.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for clarification.
    pub clarify: String,
    /// System prompt for planning.
    pub plan: String,
    /// System prompt for query generation.
    pub queries: String,
    /// System prompt for report synthesis.
    pub report: String,
    /// System prompt for the iterative next step.
    pub next_step: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (config file or builder)
    /// 2. `DEEPER_SEEKER_PROMPT_DIR` environment variable
    /// 3. `~/.config/deeper-seeker/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("DEEPER_SEEKER_PROMPT_DIR")
                    .ok()
                    .map(PathBuf::from)
            })
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            clarify: load_file(CLARIFY_FILENAME, CLARIFY_SYSTEM_PROMPT),
            plan: load_file(PLAN_FILENAME, PLAN_SYSTEM_PROMPT),
            queries: load_file(QUERIES_FILENAME, QUERIES_SYSTEM_PROMPT),
            report: load_file(REPORT_FILENAME, REPORT_SYSTEM_PROMPT),
            next_step: load_file(NEXT_STEP_FILENAME, NEXT_STEP_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            clarify: CLARIFY_SYSTEM_PROMPT.to_string(),
            plan: PLAN_SYSTEM_PROMPT.to_string(),
            queries: QUERIES_SYSTEM_PROMPT.to_string(),
            report: REPORT_SYSTEM_PROMPT.to_string(),
            next_step: NEXT_STEP_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (CLARIFY_FILENAME, CLARIFY_SYSTEM_PROMPT),
            (PLAN_FILENAME, PLAN_SYSTEM_PROMPT),
            (QUERIES_FILENAME, QUERIES_SYSTEM_PROMPT),
            (REPORT_FILENAME, REPORT_SYSTEM_PROMPT),
            (NEXT_STEP_FILENAME, NEXT_STEP_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for a clarification round.
#[must_use]
pub fn build_clarify_prompt(context: &str) -> String {
    format!("<context>{context}</context>\n\nAsk the next follow-up question.")
}

/// Builds the user message for the planner.
#[must_use]
pub fn build_plan_prompt(initial_query: &str, context: &str) -> String {
    format!(
        "<query>{initial_query}</query>\n\n\
         <context>{context}</context>\n\n\
         Create the research plan."
    )
}

/// Builds the user message for query generation for one plan step.
#[must_use]
pub fn build_query_prompt(step_id: &str, description: &str, today: NaiveDate) -> String {
    format!(
        "<date>{}</date>\n\n\
         <step id=\"{step_id}\">{description}</step>\n\n\
         Generate the search queries for this step.",
        today.format("%Y-%m-%d")
    )
}

/// Builds the user message for the report writer.
#[must_use]
pub fn build_report_prompt(prompt: &str, learnings: &str) -> String {
    format!(
        "Write the final report for the following request using the learnings from research.\n\n\
         <prompt>{prompt}</prompt>\n\n\
         Here are all the learnings from research:\n\n\
         <learnings>\n{learnings}\n</learnings>"
    )
}

/// Builds the user message for the iterative next-step agent.
///
/// `history` is the rendered record of previous searches; empty on the
/// first iteration.
#[must_use]
pub fn build_step_prompt(request: &str, history: &str) -> String {
    if history.trim().is_empty() {
        format!(
            "<request>{request}</request>\n\n\
             No searches have been run yet. Choose the first search."
        )
    } else {
        format!(
            "<request>{request}</request>\n\n\
             <history>\n{history}\n</history>\n\n\
             Choose the next search."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_clarify_prompt() {
        let prompt = build_clarify_prompt("tariffs Follow-up Q: when? Follow-up A: 2024");
        assert!(prompt.contains("<context>tariffs Follow-up Q: when? Follow-up A: 2024</context>"));
    }

    #[test]
    fn test_build_plan_prompt() {
        let prompt = build_plan_prompt("tariffs", "tariffs, US only");
        assert!(prompt.contains("<query>tariffs</query>"));
        assert!(prompt.contains("<context>tariffs, US only</context>"));
    }

    #[test]
    fn test_build_query_prompt_includes_date() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 20).unwrap_or_default();
        let prompt = build_query_prompt("step 2", "Survey suppliers", today);
        assert!(prompt.contains("<date>2025-02-20</date>"));
        assert!(prompt.contains("<step id=\"step 2\">Survey suppliers</step>"));
    }

    #[test]
    fn test_build_report_prompt_tags() {
        let prompt = build_report_prompt("the request", "## step 1: a");
        assert!(prompt.contains("<prompt>the request</prompt>"));
        assert!(prompt.contains("<learnings>\n## step 1: a\n</learnings>"));
    }

    #[test]
    fn test_build_step_prompt_first_iteration() {
        let prompt = build_step_prompt("chips", "");
        assert!(prompt.contains("No searches have been run yet"));
        assert!(!prompt.contains("<history>"));

        let prompt = build_step_prompt("chips", "## Research Step 1");
        assert!(prompt.contains("<history>\n## Research Step 1\n</history>"));
    }

    #[test]
    fn test_prompts_not_empty() {
        let set = PromptSet::defaults();
        for prompt in [&set.clarify, &set.plan, &set.queries, &set.report, &set.next_step] {
            assert!(!prompt.is_empty());
        }
    }

    #[test]
    fn test_load_overrides_single_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        std::fs::write(dir.path().join(PLAN_FILENAME), "custom plan prompt")
            .unwrap_or_else(|_| unreachable!());
        let set = PromptSet::load(Some(dir.path()));
        assert_eq!(set.plan, "custom plan prompt");
        assert_eq!(set.clarify, CLARIFY_SYSTEM_PROMPT);
    }

    #[test]
    fn test_write_defaults_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        std::fs::write(dir.path().join(REPORT_FILENAME), "mine").unwrap_or_else(|_| unreachable!());
        let written = PromptSet::write_defaults(dir.path()).unwrap_or_default();
        assert_eq!(written.len(), 4);
        let report = std::fs::read_to_string(dir.path().join(REPORT_FILENAME)).unwrap_or_default();
        assert_eq!(report, "mine");
    }
}
