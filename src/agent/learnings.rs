//! Flattens step results into the learnings text handed to the report agent.

use std::fmt::Write;

use super::research::StepResult;
use crate::search::SearchResult;

/// Renders every (step, query, result) triple as markdown.
///
/// Output is one `## ` section per step in plan order, and within a step
/// one `### ` record per query in submission order. Failed searches still
/// produce a record with an "answer unavailable" placeholder.
#[must_use]
pub fn extract_learnings(steps: &[StepResult]) -> String {
    let mut out = String::new();

    for step in steps {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "## {}: {}", step.step_id, step.description);

        for (query, result) in step.results.iter() {
            let _ = write!(
                out,
                "\n### Query: {query}\n**Step:** {}\n**Query:** {query}\n",
                step.description
            );
            match result {
                SearchResult::Answer { answer, citations } => {
                    let _ = writeln!(out, "**Answer:** {answer}");
                    if citations.is_empty() {
                        out.push_str("**Citations:** none\n");
                    } else {
                        out.push_str("**Citations:**\n");
                        for c in citations {
                            let label = c.title.as_deref().unwrap_or(&c.url);
                            let _ = writeln!(out, "- [{label}]({})", c.url);
                            if let Some(snippet) = c.snippet.as_deref().map(str::trim)
                                && !snippet.is_empty()
                            {
                                let _ = writeln!(out, "  > {}", snippet.replace('\n', " "));
                            }
                        }
                    }
                }
                SearchResult::Error { message } => {
                    let _ = writeln!(
                        out,
                        "**Answer:** Answer unavailable (search failed: {message})\n**Citations:** none"
                    );
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Citation, QueryExecutor, QueryResults, SearchClient};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn answered(query: &str, url: &str) -> QueryResults {
        QueryResults::single(
            query,
            SearchResult::Answer {
                answer: format!("answer for {query}"),
                citations: vec![Citation {
                    url: url.to_string(),
                    title: Some("Source".to_string()),
                    snippet: Some("line one\nline two".to_string()),
                }],
            },
        )
    }

    fn step(id: &str, description: &str, results: QueryResults) -> StepResult {
        StepResult {
            step_id: id.to_string(),
            description: description.to_string(),
            results,
        }
    }

    #[test]
    fn test_one_section_per_step_in_order() {
        let steps = vec![
            step("step 1", "Background", answered("q1", "https://a")),
            step("step 2", "Suppliers", answered("q2", "https://b")),
            step("step 3", "Outlook", answered("q3", "https://c")),
        ];
        let blob = extract_learnings(&steps);
        let headers: Vec<&str> = blob.lines().filter(|l| l.starts_with("## ")).collect();
        assert_eq!(
            headers,
            vec!["## step 1: Background", "## step 2: Suppliers", "## step 3: Outlook"]
        );
        assert!(blob.contains("- [Source](https://a)"));
        assert!(blob.contains("  > line one line two"));
    }

    #[test]
    fn test_failed_query_keeps_a_record() {
        let steps = vec![step(
            "step 1",
            "Background",
            QueryResults::single("q1", SearchResult::error("HTTP 500: upstream")),
        )];
        let blob = extract_learnings(&steps);
        assert!(blob.contains("### Query: q1"));
        assert!(blob.contains("Answer unavailable (search failed: HTTP 500: upstream)"));
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_learnings(&[]).is_empty());
    }

    struct Echo;

    #[async_trait]
    impl SearchClient for Echo {
        async fn search(&self, query: &str) -> SearchResult {
            SearchResult::Answer {
                answer: query.to_uppercase(),
                citations: Vec::new(),
            }
        }
    }

    #[tokio::test]
    async fn test_records_follow_submission_order() {
        let executor = QueryExecutor::new(Arc::new(Echo), 3, 1);
        let batch: Vec<String> = ["gamma", "alpha", "beta"].iter().map(ToString::to_string).collect();
        let results = executor.execute(&batch).await;
        let blob = extract_learnings(&[step("step 1", "Any", results)]);
        let records: Vec<&str> = blob.lines().filter(|l| l.starts_with("### ")).collect();
        assert_eq!(
            records,
            vec!["### Query: gamma", "### Query: alpha", "### Query: beta"]
        );
        assert!(blob.contains("**Citations:** none"));
    }
}
