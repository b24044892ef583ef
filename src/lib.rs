//! deeper-seeker: an iterative research agent.
//!
//! Takes a research question, refines it through a short clarification
//! dialogue, decomposes it into a research plan, fans out web searches per
//! step and synthesizes a cited markdown report.
//!
//! # Modules
//!
//! - [`agent`]: LLM backends, the research agents and the orchestrators
//! - [`search`]: the answer-API search client and the concurrent query executor
//! - [`io`]: report filename resolution and persistence
//! - [`cli`]: argument parsing, console interaction and command execution
//! - [`error`]: error types for every layer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use deeper_seeker::agent::{AgentConfig, Orchestrator, ScriptedInterviewer, resolve_bindings};
//! use deeper_seeker::search::ExaClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let bindings = resolve_bindings(&config)?;
//! let search = ExaClient::new(&config.search_base_url, "exa-key", config.search_timeout)?;
//! let orchestrator = Orchestrator::new(bindings, Arc::new(search), config);
//!
//! let answers = ScriptedInterviewer::new(["focus on 2024-2025", "US and Taiwan only"]);
//! let outcome = orchestrator
//!     .run("impact of tariffs on semiconductor supply chains", &answers)
//!     .await?;
//! println!("{}", outcome.report.to_markdown());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod io;
pub mod search;

pub use error::{Error, Result};
