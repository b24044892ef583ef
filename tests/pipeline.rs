//! End-to-end pipeline tests with scripted LLM and search backends.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use deeper_seeker::agent::{
    AgentConfig, Bindings, ChatRequest, ChatResponse, LlmProvider, Orchestrator, PromptSet,
    Report, ResearchMode, ScriptedInterviewer, TokenUsage,
};
use deeper_seeker::error::AgentError;
use deeper_seeker::io::{resolve_report_path, write_report};
use deeper_seeker::search::{Citation, SearchClient, SearchResult};
use tempfile::TempDir;

/// Replays replies in order and records each user message.
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    user_messages: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
            user_messages: Mutex::new(Vec::new()),
        }
    }

    fn user_messages(&self) -> Vec<String> {
        self.user_messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if let (Ok(mut seen), Some(last)) = (self.user_messages.lock(), request.messages.last()) {
            seen.push(last.content.clone());
        }
        let content = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| AgentError::ApiRequest {
                message: "script exhausted".to_string(),
                status: None,
            })?;
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Answers every query distinctly; queries containing "broken" fail.
struct FakeSearch;

#[async_trait]
impl SearchClient for FakeSearch {
    async fn search(&self, query: &str) -> SearchResult {
        if query.contains("broken") {
            return SearchResult::error("HTTP 502: bad gateway");
        }
        SearchResult::Answer {
            answer: format!("Findings for {query}"),
            citations: vec![
                Citation {
                    url: format!("https://news.example/{}", query.replace(' ', "-")),
                    title: Some(format!("Source on {query}")),
                    snippet: Some("excerpt".to_string()),
                },
                Citation {
                    url: "https://second.example".to_string(),
                    title: None,
                    snippet: None,
                },
            ],
        }
    }
}

const QUERY: &str = "impact of tariffs on semiconductor supply chains";

const PLAN: &str = r#"{"plan": {
    "step 1": "Map current tariff measures",
    "step 2": "Trace effects on chip supply chains",
    "step 3": "Assess the outlook"
}}"#;

fn queries(step: usize, middle: &str) -> String {
    format!(r#"{{"plan_step": "step {step}", "search_queries": ["s{step} first", "{middle}", "s{step} third"]}}"#)
}

fn orchestrator(llm: &Arc<ScriptedLlm>, clarify_iterations: usize) -> Orchestrator {
    let config = AgentConfig::builder()
        .mode(ResearchMode::Plan)
        .clarify_iterations(clarify_iterations)
        .build()
        .unwrap_or_else(|e| panic!("config: {e}"));
    let provider: Arc<dyn LlmProvider> = Arc::clone(llm) as Arc<dyn LlmProvider>;
    let bindings = Bindings::uniform(&config, &provider);
    Orchestrator::new(bindings, Arc::new(FakeSearch), config).with_prompts(PromptSet::defaults())
}

#[tokio::test]
async fn full_plan_run_writes_report() {
    let q1 = queries(1, "s1 second");
    let q2 = queries(2, "s2 second");
    let q3 = queries(3, "s3 second");
    let llm = Arc::new(ScriptedLlm::new(&[
        r#"{"question": "Which period matters?", "query_context": "tariffs"}"#,
        r#"<json>{"question": "Which regions?"}</json>"#,
        PLAN,
        q1.as_str(),
        q2.as_str(),
        q3.as_str(),
        "# Tariffs and Chips\n\nSupply shifted [1](https://news.example/s1-first).",
    ]));
    let interviewer = ScriptedInterviewer::new(["focus on 2024-2025", "US and Taiwan only"]);

    let outcome = orchestrator(&llm, 2)
        .run(QUERY, &interviewer)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    // Clarification.
    assert_eq!(interviewer.asked(), vec!["Which period matters?", "Which regions?"]);
    assert!(outcome.session.context.ends_with(
        "Follow-up Q: Which period matters? Follow-up A: focus on 2024-2025 \
         Follow-up Q: Which regions? Follow-up A: US and Taiwan only"
    ));

    // Three sections of three records, in plan order.
    let sections: Vec<&str> = outcome
        .learnings
        .lines()
        .filter(|l| l.starts_with("## "))
        .collect();
    assert_eq!(
        sections,
        vec![
            "## step 1: Map current tariff measures",
            "## step 2: Trace effects on chip supply chains",
            "## step 3: Assess the outlook",
        ]
    );
    assert_eq!(outcome.learnings.matches("### Query: ").count(), 9);
    assert_eq!(outcome.queries_executed, 9);
    assert_eq!(outcome.queries_failed, 0);
    assert_eq!(outcome.total_tokens, 7 * 15);
    // Only the top citation is kept.
    assert!(!outcome.learnings.contains("https://second.example"));

    // The report call saw the initial query and the learnings.
    let messages = llm.user_messages();
    let report_input = messages.last().cloned().unwrap_or_default();
    assert!(report_input.contains(&format!("<prompt>{QUERY}</prompt>")));
    assert!(report_input.contains("Findings for s3 third"));

    // The plan call saw the clarified context.
    assert!(messages[2].contains("US and Taiwan only"));

    let Report::Generated(markdown) = &outcome.report else {
        panic!("report failed: {:?}", outcome.report);
    };

    let tmp = TempDir::new().unwrap_or_else(|_| unreachable!());
    fs::write(tmp.path().join("report_20240101_1.md"), "old").unwrap_or_else(|_| unreachable!());
    let now = Local
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(|| unreachable!());
    let path = resolve_report_path("report_{date}_{n}.md", tmp.path(), now)
        .unwrap_or_else(|e| panic!("resolve: {e}"));
    write_report(&path, markdown).unwrap_or_else(|e| panic!("write: {e}"));

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("report_20240101_2.md"));
    assert_eq!(fs::read_to_string(&path).unwrap_or_default(), *markdown);
}

#[tokio::test]
async fn failed_search_is_isolated_within_step() {
    let q1 = queries(1, "s1 broken");
    let llm = Arc::new(ScriptedLlm::new(&[
        r#"{"plan": {"step 1": "Map current tariff measures"}}"#,
        q1.as_str(),
        "# Report",
    ]));

    let outcome = orchestrator(&llm, 0)
        .run(QUERY, &ScriptedInterviewer::default())
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    let step = &outcome.steps[0];
    assert_eq!(step.results.len(), 3);
    match step.results.get("s1 broken") {
        Some(SearchResult::Error { message }) => assert!(!message.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
    assert!(step.results.get("s1 third").is_some_and(|r| !r.is_error()));
    assert_eq!(outcome.queries_failed, 1);

    assert_eq!(outcome.learnings.matches("### Query: ").count(), 3);
    assert!(outcome.learnings.contains("Answer unavailable (search failed: HTTP 502: bad gateway)"));
    assert!(outcome.report.is_generated());
}

#[tokio::test]
async fn missing_plan_stops_before_search() {
    let llm = Arc::new(ScriptedLlm::new(&["Sorry, I can't help with planning."]));
    let result = orchestrator(&llm, 0)
        .run(QUERY, &ScriptedInterviewer::default())
        .await;
    assert!(matches!(result, Err(AgentError::PlanUnavailable { .. })));
    assert_eq!(llm.user_messages().len(), 1);
}
