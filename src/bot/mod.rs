use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ConfigError;
use crate::questions::QuestionService;
use crate::questions::source::QuestionApiError;
use crate::telegram::{BotApi, ChatId, TelegramError};

pub mod broadcast;
pub mod handlers;
pub mod polling;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Questions API error: {0}")]
    QuestionApi(#[from] QuestionApiError),
}

/// What triggered a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrigin {
    Manual,
    Automatic,
}

impl fmt::Display for BatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOrigin::Manual => f.write_str("manual"),
            BatchOrigin::Automatic => f.write_str("automatic"),
        }
    }
}

/// Everything handlers and jobs need, shared across tasks.
pub struct BotContext {
    pub api: Arc<dyn BotApi>,
    pub questions: Arc<QuestionService>,
    pub channel: ChatId,
    pub topics: Vec<String>,
    pub batch_size: usize,
}

impl BotContext {
    pub fn is_known_topic(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }
}
