//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::Parser;
use std::path::PathBuf;

use crate::agent::ResearchMode;

/// deeper-seeker: iterative research agent.
///
/// Reads a research question from standard input, asks a few clarifying
/// questions, searches the web and writes a cited markdown report.
#[derive(Parser, Debug)]
#[command(name = "deeper-seeker")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"Examples:
  deeper-seeker                              # Plan mode with defaults
  deeper-seeker --config research.toml       # Backends and models from a file
  deeper-seeker --mode iterative             # One search at a time
  deeper-seeker --iterations 0 -o reports/   # Skip clarification
  deeper-seeker --init-prompts               # Write editable prompt templates
"#)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "DEEPER_SEEKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Research mode: plan or iterative.
    #[arg(short, long)]
    pub mode: Option<ResearchMode>,

    /// Number of clarification rounds.
    #[arg(short, long)]
    pub iterations: Option<usize>,

    /// Directory the report is saved to.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,

    /// Write the default prompt templates and exit.
    ///
    /// Writes to DIR, or to ~/.config/deeper-seeker/prompts. Existing
    /// files are left untouched.
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = "")]
    pub init_prompts: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "deeper-seeker",
            "--mode",
            "iterative",
            "--iterations",
            "0",
            "-o",
            "out",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.mode, Some(ResearchMode::Iterative));
        assert_eq!(cli.iterations, Some(0));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.init_prompts.is_none());
    }

    #[test]
    fn test_init_prompts_optional_dir() {
        let bare = Cli::try_parse_from(["deeper-seeker", "--init-prompts"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(bare.init_prompts, Some(PathBuf::new()));

        let with_dir = Cli::try_parse_from(["deeper-seeker", "--init-prompts", "p"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(with_dir.init_prompts, Some(PathBuf::from("p")));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["deeper-seeker", "--mode", "bfs"]).is_err());
    }
}
