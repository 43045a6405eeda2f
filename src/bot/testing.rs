//! In-memory doubles for the Bot API and the questions API.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::BotContext;
use crate::questions::{FetchParams, QuestionService, QuestionSource};
use crate::telegram::types::{InlineKeyboardMarkup, QuizPoll, Update};
use crate::telegram::{BotApi, ChatId, TelegramError};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackAnswer {
    pub id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

#[derive(Default)]
pub struct RecordingApi {
    pub messages: Mutex<Vec<SentMessage>>,
    pub polls: Mutex<Vec<(ChatId, QuizPoll)>>,
    pub answers: Mutex<Vec<CallbackAnswer>>,
    pub update_batches: Mutex<VecDeque<Result<Vec<Update>, String>>>,
    pub offsets: Mutex<Vec<Option<i64>>>,
    /// Statements whose poll should be rejected.
    pub failing_polls: Mutex<Vec<String>>,
}

impl RecordingApi {
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn polls(&self) -> Vec<(ChatId, QuizPoll)> {
        self.polls.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<CallbackAnswer> {
        self.answers.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotApi for RecordingApi {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout_seconds: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.update_batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(updates)) => Ok(updates),
            Some(Err(description)) => Err(TelegramError::Api(description)),
            None => std::future::pending().await,
        }
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        self.messages.lock().unwrap().push(SentMessage {
            chat: chat.clone(),
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(())
    }

    async fn send_poll(&self, chat: &ChatId, poll: &QuizPoll) -> Result<(), TelegramError> {
        if self
            .failing_polls
            .lock()
            .unwrap()
            .iter()
            .any(|s| poll.question.ends_with(s.as_str()))
        {
            return Err(TelegramError::Api("Bad Request: poll rejected".to_string()));
        }
        self.polls.lock().unwrap().push((chat.clone(), poll.clone()));
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        self.answers.lock().unwrap().push(CallbackAnswer {
            id: callback_query_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }
}

/// Serves numbered questions forever, or nothing at all.
pub struct CountingSource {
    next: Mutex<usize>,
    available: bool,
}

impl CountingSource {
    pub fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(0),
            available,
        })
    }
}

#[async_trait]
impl QuestionSource for CountingSource {
    async fn fetch(&self, params: &FetchParams) -> Option<Value> {
        if !self.available {
            return None;
        }
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let comment = if *next % 2 == 0 { "" } else { "Comentário" };
        Some(json!({
            "pergunta": format!("Questão {}", *next),
            "opcoes": ["certo", "errado"],
            "correta": 0,
            "comentario": comment,
            "topico": params.topico.clone()
        }))
    }
}

pub fn context(api: Arc<RecordingApi>, api_available: bool, batch_size: usize) -> Arc<BotContext> {
    let source = CountingSource::new(api_available);
    Arc::new(BotContext {
        api,
        questions: Arc::new(QuestionService::new(source, 100)),
        channel: ChatId::from("@canal_teste"),
        topics: vec!["Penal".to_string(), "Raciocínio Lógico".to_string()],
        batch_size,
    })
}
