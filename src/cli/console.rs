//! Console interaction for the clarification dialogue.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::agent::Interviewer;
use crate::error::AgentError;

/// Asks follow-up questions on stdout and reads one answer line from stdin.
///
/// End of input yields empty answers.
pub struct StdinInterviewer {
    input: Mutex<BufReader<Stdin>>,
}

impl StdinInterviewer {
    /// Creates an interviewer on the process's standard streams.
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinInterviewer {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinInterviewer {
    /// Writes `prompt` to stdout and reads one trimmed line.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Interaction`] if either stream fails.
    pub async fn prompt(&self, prompt: &str) -> Result<String, AgentError> {
        let interaction = |e: std::io::Error| AgentError::Interaction {
            message: e.to_string(),
        };

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(prompt.as_bytes())
            .await
            .map_err(interaction)?;
        stdout.flush().await.map_err(interaction)?;

        let mut line = String::new();
        self.input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(interaction)?;
        Ok(line.trim().to_string())
    }
}

#[async_trait]
impl Interviewer for StdinInterviewer {
    async fn ask(&self, question: &str) -> Result<String, AgentError> {
        self.prompt(&format!("\n{question}\n> ")).await
    }
}

impl std::fmt::Debug for StdinInterviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdinInterviewer").finish_non_exhaustive()
    }
}
