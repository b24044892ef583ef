//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into backend-specific calls. This keeps all agent logic decoupled from
//! any particular LLM vendor.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// One call to [`LlmProvider::chat`] is exactly one outbound request.
/// Implementations do not retry; transport failures are returned as
/// [`AgentError::ApiRequest`] or [`AgentError::Timeout`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"groq"`, `"gemini"`).
    fn name(&self) -> &'static str;

    /// Whether the backend enforces a declared output schema natively.
    ///
    /// When `false`, agents request JSON-shaped text and run the response
    /// through [`structured::parse`](super::structured::parse).
    fn supports_structured_output(&self) -> bool {
        false
    }

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or timeouts.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
