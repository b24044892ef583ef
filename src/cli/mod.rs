//! CLI layer for deeper-seeker.
//!
//! Provides the command-line interface using clap, the console side of the
//! clarification dialogue and the command that runs a research session.

pub mod commands;
pub mod console;
pub mod parser;

pub use commands::{execute, load_config};
pub use console::StdinInterviewer;
pub use parser::Cli;
