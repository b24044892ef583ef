//! Backends, pipeline operations and the per-operation binding descriptor.
//!
//! An [`OperationBinding`] pairs an operation with the backend that serves
//! it, the model identifier to request and the shared provider instance.
//! Bindings are resolved once at startup (see
//! [`resolve_bindings`](super::client::resolve_bindings)); call sites only
//! ever go through a binding.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::config::AgentConfig;
use super::provider::LlmProvider;
use crate::error::AgentError;

/// LLM backends known to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Backend {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Groq, through its `OpenAI`-compatible endpoint.
    Groq,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl Backend {
    /// All backends, in configuration order.
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Groq, Self::Gemini];

    /// Name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable holding the API key.
    #[must_use]
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Environment variable that overrides the base URL.
    #[must_use]
    pub const fn base_url_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_BASE_URL",
            Self::Groq => "GROQ_BASE_URL",
            Self::Gemini => "GEMINI_BASE_URL",
        }
    }

    /// Base URL used when none is configured. `None` means the SDK default.
    #[must_use]
    pub const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => None,
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
        }
    }

    /// Model used for `operation` when the configuration names none.
    #[must_use]
    pub const fn default_model(self, operation: Operation) -> &'static str {
        match (self, operation) {
            (Self::OpenAi, Operation::SynthesizeReport) => "gpt-4o",
            (Self::OpenAi, _) => "gpt-4o-mini",
            (Self::Groq, _) => "llama-3.3-70b-versatile",
            (Self::Gemini, _) => "gemini-2.0-flash",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(AgentError::UnsupportedProvider {
                name: other.to_string(),
            }),
        }
    }
}

/// Pipeline operations served by an LLM backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Ask the requester a follow-up question.
    Clarify,
    /// Decompose the clarified topic into plan steps.
    Plan,
    /// Turn one plan step into search queries.
    GenerateQueries,
    /// Write the final markdown report.
    SynthesizeReport,
    /// Choose the next single query in iterative mode.
    NextStep,
}

impl Operation {
    /// All operations, in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Clarify,
        Self::Plan,
        Self::GenerateQueries,
        Self::SynthesizeReport,
        Self::NextStep,
    ];

    /// Key used under `[ai_providers]` and `[models.<backend>]`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clarify => "clarify",
            Self::Plan => "plan",
            Self::GenerateQueries => "generate_queries",
            Self::SynthesizeReport => "synthesize_report",
            Self::NextStep => "next_step",
        }
    }

    /// Backend used when `[ai_providers]` does not mention the operation.
    #[must_use]
    pub const fn default_backend(self) -> Backend {
        match self {
            Self::SynthesizeReport => Backend::Gemini,
            _ => Backend::Groq,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clarify" | "followup" => Ok(Self::Clarify),
            "plan" | "research_plan" => Ok(Self::Plan),
            "generate_queries" | "generate_step_queries" => Ok(Self::GenerateQueries),
            "synthesize_report" | "report" => Ok(Self::SynthesizeReport),
            "next_step" => Ok(Self::NextStep),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

/// Descriptor binding one operation to a backend, model and provider.
#[derive(Clone)]
pub struct OperationBinding {
    /// Operation this binding serves.
    pub operation: Operation,
    /// Backend tag.
    pub backend: Backend,
    /// Model identifier sent with every request.
    pub model: String,
    /// Shared provider instance for the backend.
    pub provider: Arc<dyn LlmProvider>,
}

impl fmt::Debug for OperationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBinding")
            .field("operation", &self.operation)
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// The full set of bindings used by one run.
#[derive(Debug, Clone)]
pub struct Bindings {
    /// Clarification questions.
    pub clarify: OperationBinding,
    /// Research plan.
    pub plan: OperationBinding,
    /// Per-step query generation.
    pub generate_queries: OperationBinding,
    /// Final report.
    pub synthesize_report: OperationBinding,
    /// Iterative-mode next query.
    pub next_step: OperationBinding,
}

impl Bindings {
    /// Binds every operation to the same provider, using the backends and
    /// models named in `config`.
    ///
    /// Used when the provider is supplied by the caller (tests, embedding
    /// applications) instead of being built from credentials.
    #[must_use]
    pub fn uniform(config: &AgentConfig, provider: &Arc<dyn LlmProvider>) -> Self {
        let bind = |operation: Operation| {
            let backend = config.backend_for(operation);
            OperationBinding {
                operation,
                backend,
                model: config.model_for(backend, operation),
                provider: Arc::clone(provider),
            }
        };
        Self {
            clarify: bind(Operation::Clarify),
            plan: bind(Operation::Plan),
            generate_queries: bind(Operation::GenerateQueries),
            synthesize_report: bind(Operation::SynthesizeReport),
            next_step: bind(Operation::NextStep),
        }
    }
}
