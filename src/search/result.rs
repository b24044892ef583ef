//! Search outcome types.

use serde::{Deserialize, Serialize};

/// Answer text used when the backend returns no answer field.
pub const NO_ANSWER: &str = "No answer found";

/// A source reference returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source URL.
    pub url: String,
    /// Page title, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Supporting excerpt from the source.
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Outcome of one search query.
///
/// Either an answer with its citations or an error message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchResult {
    /// The backend answered.
    Answer {
        /// Answer text.
        answer: String,
        /// Citations in the backend's relevance order.
        citations: Vec<Citation>,
    },
    /// The query failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl SearchResult {
    /// Creates an error-shaped result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns `true` for the error shape.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Keeps only the first `n` citations.
    #[must_use]
    pub fn truncate_citations(mut self, n: usize) -> Self {
        if let Self::Answer { citations, .. } = &mut self {
            citations.truncate(n);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(url: &str) -> Citation {
        Citation {
            url: url.to_string(),
            title: None,
            snippet: None,
        }
    }

    #[test]
    fn test_truncate_citations() {
        let result = SearchResult::Answer {
            answer: "a".to_string(),
            citations: vec![citation("https://a"), citation("https://b")],
        }
        .truncate_citations(1);
        assert_eq!(
            result,
            SearchResult::Answer {
                answer: "a".to_string(),
                citations: vec![citation("https://a")],
            }
        );
    }

    #[test]
    fn test_truncate_leaves_errors_alone() {
        let result = SearchResult::error("down").truncate_citations(0);
        assert!(result.is_error());
    }

    #[test]
    fn test_citation_accepts_text_alias() {
        let c: Citation = serde_json::from_str(r#"{"url": "https://x", "text": "excerpt", "id": "1"}"#)
            .unwrap_or_else(|_| citation("wrong"));
        assert_eq!(c.snippet.as_deref(), Some("excerpt"));
        assert!(c.title.is_none());
    }
}
