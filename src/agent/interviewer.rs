//! The requester side of the clarification dialogue.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;

/// Surfaces a follow-up question and waits for the requester's answer.
#[async_trait]
pub trait Interviewer: Send + Sync {
    /// Shows `question` and returns the free-text answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Interaction`] if no answer can be read.
    async fn ask(&self, question: &str) -> Result<String, AgentError>;
}

/// Answers questions from a fixed script, recording what was asked.
///
/// Runs out of answers → empty strings.
#[derive(Debug, Default)]
pub struct ScriptedInterviewer {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedInterviewer {
    /// Creates an interviewer that replies with `answers` in order.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Interviewer for ScriptedInterviewer {
    async fn ask(&self, question: &str) -> Result<String, AgentError> {
        self.asked
            .lock()
            .map_err(|e| AgentError::Interaction {
                message: e.to_string(),
            })?
            .push(question.to_string());
        let answer = self
            .answers
            .lock()
            .map_err(|e| AgentError::Interaction {
                message: e.to_string(),
            })?
            .pop_front()
            .unwrap_or_default();
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_answers_in_order() {
        let interviewer = ScriptedInterviewer::new(["first", "second"]);
        assert_eq!(interviewer.ask("a?").await.ok().as_deref(), Some("first"));
        assert_eq!(interviewer.ask("b?").await.ok().as_deref(), Some("second"));
        assert_eq!(interviewer.ask("c?").await.ok().as_deref(), Some(""));
        assert_eq!(interviewer.asked(), vec!["a?", "b?", "c?"]);
    }
}
