//! Search client trait and the Exa answer API implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::result::{Citation, NO_ANSWER, SearchResult};
use crate::error::SearchError;

/// Longest error body kept in a search failure message.
const MAX_ERROR_BODY: usize = 300;

/// Issues one query to a search/answer backend.
///
/// Implementations never fail: every problem is reported through
/// [`SearchResult::Error`].
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs `query` and returns its outcome.
    async fn search(&self, query: &str) -> SearchResult;
}

/// Response body of the Exa `/answer` endpoint.
#[derive(Debug, Deserialize)]
struct AnswerBody {
    #[serde(default)]
    answer: Option<serde_json::Value>,
    #[serde(default)]
    citations: Vec<Citation>,
}

/// Client for the Exa answer API.
pub struct ExaClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl ExaClient {
    /// Creates a client for `endpoint` (e.g. `https://api.exa.ai/answer`).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] if the HTTP client cannot be built.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    async fn request(&self, query: &str) -> Result<SearchResult, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({"query": query, "text": true}))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    SearchError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                SearchError::Transport(e.without_url().to_string())
            }
        })?;

        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        parse_answer(&body)
    }
}

/// Decodes an answer body into a result.
fn parse_answer(body: &str) -> Result<SearchResult, SearchError> {
    let parsed: AnswerBody =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;

    let answer = match parsed.answer {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
        Some(serde_json::Value::Null | serde_json::Value::String(_)) | None => {
            NO_ANSWER.to_string()
        }
        Some(other) => other.to_string(),
    };

    Ok(SearchResult::Answer {
        answer,
        citations: parsed.citations,
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let cut = (0..=max)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

impl std::fmt::Debug for ExaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExaClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchClient for ExaClient {
    async fn search(&self, query: &str) -> SearchResult {
        debug!(query, "searching");
        match self.request(query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(query, error = %e, "search failed");
                SearchResult::error(e.to_string())
            }
        }
    }
}
