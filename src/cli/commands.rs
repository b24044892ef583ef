//! CLI command implementations.
//!
//! Contains the business logic behind the single research flow and the
//! prompt-template initializer.

use std::fmt::Write as FmtWrite;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::agent::{
    AgentConfig, AgentConfigBuilder, Orchestrator, PromptSet, ResearchOutcome, resolve_bindings,
};
use crate::cli::console::StdinInterviewer;
use crate::cli::parser::Cli;
use crate::error::{CommandError, ConfigError, Result};
use crate::io::{resolve_report_path, write_report};
use crate::search::ExaClient;

/// Prompt shown before reading the research query.
const QUERY_PROMPT: &str = "Enter your research query: ";

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error for invalid configuration, an empty query, a run
/// without a research plan, or a report that cannot be saved.
pub fn execute(cli: &Cli) -> Result<String> {
    if let Some(dir) = &cli.init_prompts {
        let dir = (!dir.as_os_str().is_empty()).then_some(dir.as_path());
        return cmd_init_prompts(dir);
    }
    cmd_research(cli)
}

/// Resolves configuration: CLI flags, then environment, then the config
/// file, then defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or a value is
/// invalid.
pub fn load_config(cli: &Cli) -> std::result::Result<AgentConfig, ConfigError> {
    let mut builder = AgentConfigBuilder::default();
    if let Some(mode) = cli.mode {
        builder = builder.mode(mode);
    }
    if let Some(n) = cli.iterations {
        builder = builder.clarify_iterations(n);
    }
    if let Some(dir) = &cli.output_dir {
        builder = builder.report_dir(dir);
    }
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder = builder.from_env();
    if let Some(path) = &cli.config {
        builder = builder.from_file(path)?;
    }
    builder.build()
}

/// Runs one research session end to end and saves the report.
fn cmd_research(cli: &Cli) -> Result<String> {
    let config = load_config(cli)?;
    let search_key = config
        .search_api_key
        .clone()
        .ok_or(ConfigError::SearchKeyMissing)?;
    let bindings = resolve_bindings(&config)?;
    let search = ExaClient::new(&config.search_base_url, &search_key, config.search_timeout)
        .map_err(|e| CommandError::ExecutionFailed(format!("Search client setup failed: {e}")))?;

    let report_dir = config.report_dir.clone();
    let template = config.filename_template.clone();
    let orchestrator = Orchestrator::new(bindings, Arc::new(search), config);

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let outcome = rt.block_on(run_session(&orchestrator))?;

    let markdown = outcome.report.to_markdown();
    let path = resolve_report_path(&template, &report_dir, Local::now())?;
    write_report(&path, &markdown)?;
    info!(path = %path.display(), "report saved");

    let mut output = String::new();
    let _ = writeln!(output, "\n{}\n", markdown.trim_end());
    let _ = writeln!(output, "Report saved to: {}", path.display());
    let _ = writeln!(output, "{outcome}");
    Ok(output)
}

/// Reads the query from the console and runs the orchestrator.
async fn run_session(orchestrator: &Orchestrator) -> Result<ResearchOutcome> {
    let console = StdinInterviewer::new();
    let query = console.prompt(QUERY_PROMPT).await?;
    if query.is_empty() {
        return Err(CommandError::EmptyQuery.into());
    }
    Ok(orchestrator.run(&query, &console).await?)
}

/// Writes the default prompt templates to `dir` or the default location.
fn cmd_init_prompts(dir: Option<&Path>) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    if written.is_empty() {
        return Ok(format!(
            "All prompt templates already exist in: {}\n",
            target_dir.display()
        ));
    }

    let mut output = format!(
        "Wrote {} prompt template(s) to: {}\n",
        written.len(),
        target_dir.display()
    );
    for path in &written {
        let _ = writeln!(
            output,
            "  {}",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
        );
    }
    output.push_str("\nEdit these files to customize agent system prompts.\n");
    Ok(output)
}
