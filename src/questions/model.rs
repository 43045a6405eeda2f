use serde::{Deserialize, Serialize};

/// Identity used to detect repeated questions.
pub type QuestionKey = (String, usize);

/// A multiple-choice question ready to be posted as a quiz poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub statement: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct: usize,
    pub comment: String,
    pub topic: String,
}

impl Question {
    pub fn key(&self) -> QuestionKey {
        (self.statement.trim().to_string(), self.correct)
    }

    pub fn poll_title(&self) -> String {
        format!("[{}] {}", self.topic, self.statement)
    }
}
