//! Interactive questions asked while adding a binding

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Source of answers to yes/no and free-text questions.
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Ask for text; an empty answer means `default`.
    fn prompt(&mut self, question: &str, default: &str) -> Result<String>;
}

/// A [`Prompter`] that replays pre-recorded answers.
///
/// Every question asked is recorded so callers can assert on it. Running out
/// of answers is an error rather than a hang.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    confirmations: VecDeque<bool>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, answer: impl Into<String>) -> Self {
        self.answers.push_back(answer.into());
        self
    }

    pub fn confirm_with(mut self, yes: bool) -> Self {
        self.confirmations.push_back(yes);
        self
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.questions.push(question.to_string());
        self.confirmations
            .pop_front()
            .ok_or_else(|| Error::Prompt(format!("no scripted confirmation for: {question}")))
    }

    fn prompt(&mut self, question: &str, default: &str) -> Result<String> {
        self.questions.push(question.to_string());
        let answer = self
            .answers
            .pop_front()
            .ok_or_else(|| Error::Prompt(format!("no scripted answer for: {question}")))?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }
}
