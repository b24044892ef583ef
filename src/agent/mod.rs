//! Research agents and orchestration.
//!
//! Provides the LLM-driven research workflow: clarify the request with the
//! user, plan it, search the web for each step and synthesize a cited
//! report. Every operation is bound to a backend and model at startup
//! through a pluggable provider abstraction.
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── ClarifierAgent ⇄ Interviewer (N follow-up rounds)
//!   ├── mode = plan
//!   │   ├── PlannerAgent → ResearchPlan
//!   │   ├── per step: QueryGenAgent → QueryExecutor (bounded fan-out)
//!   │   └── extract_learnings → learnings text
//!   ├── mode = iterative
//!   │   └── loop: StepperAgent → one search → history
//!   └── SynthesizerAgent → Report
//! ```

pub mod binding;
pub mod clarifier;
pub mod client;
pub mod config;
pub mod interviewer;
pub mod iterative;
pub mod learnings;
pub mod message;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod query_gen;
pub mod research;
pub mod stepper;
pub mod structured;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use binding::{Backend, Bindings, Operation, OperationBinding};
pub use clarifier::ClarifierAgent;
pub use client::{create_provider, resolve_bindings};
pub use config::{AgentConfig, AgentConfigBuilder, ResearchMode};
pub use interviewer::{Interviewer, ScriptedInterviewer};
pub use learnings::extract_learnings;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use planner::PlannerAgent;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use query_gen::QueryGenAgent;
pub use research::{
    FollowUp, Interaction, PlanStep, Report, ResearchIteration, ResearchOutcome, ResearchPlan,
    ResearchSession, StepQueries, StepResult,
};
pub use stepper::{NextStep, StepperAgent};
pub use synthesizer::SynthesizerAgent;
pub use traits::{Agent, AgentResponse, execute_structured};
