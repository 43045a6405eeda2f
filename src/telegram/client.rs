use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{
    AnswerCallbackQuery, ApiResponse, ChatId, GetUpdates, InlineKeyboardMarkup, QuizPoll,
    SendMessage, SendPoll, Update,
};

/// Extra time granted on top of the long-poll timeout before giving up on `getUpdates`.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Telegram API returned non-success status: {status}. Body: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// The Bot API calls the bot makes.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<Update>, TelegramError>;

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError>;

    async fn send_poll(&self, chat: &ChatId, poll: &QuizPoll) -> Result<(), TelegramError>;

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError>;
}

/// HTTP client for the Telegram Bot API.
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<P, R>(
        &self,
        method: &str,
        payload: &P,
        timeout: Option<Duration>,
    ) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!(method, "Calling Telegram Bot API.");
        let mut request = self.client.post(self.method_url(method)).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Errors carry the request URL, which embeds the token.
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        let parsed: Option<ApiResponse<R>> = serde_json::from_str(&body).ok();
        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Some(ApiResponse {
                ok: false,
                description,
                ..
            }) => Err(TelegramError::Api(
                description.unwrap_or_else(|| format!("{method} failed with status {status}")),
            )),
            _ => Err(TelegramError::Http { status, body }),
        }
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_seconds: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let payload = GetUpdates {
            offset,
            timeout: timeout_seconds,
            allowed_updates: &ALLOWED_UPDATES,
        };
        self.call(
            "getUpdates",
            &payload,
            Some(Duration::from_secs(timeout_seconds) + LONG_POLL_GRACE),
        )
        .await
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let payload = SendMessage {
            chat_id: chat,
            text,
            parse_mode: "MarkdownV2",
            reply_markup: markup,
        };
        self.call::<_, Value>("sendMessage", &payload, None).await?;
        Ok(())
    }

    async fn send_poll(&self, chat: &ChatId, poll: &QuizPoll) -> Result<(), TelegramError> {
        let payload = SendPoll {
            chat_id: chat,
            question: &poll.question,
            options: &poll.options,
            poll_type: "quiz",
            correct_option_id: poll.correct_option_id,
            explanation: poll.explanation.as_deref(),
            is_anonymous: false,
        };
        self.call::<_, Value>("sendPoll", &payload, None).await?;
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let payload = AnswerCallbackQuery {
            callback_query_id,
            text,
            show_alert,
        };
        self.call::<_, Value>("answerCallbackQuery", &payload, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc").unwrap();
        assert_eq!(
            client.method_url("sendPoll"),
            "https://api.telegram.org/bot123:abc/sendPoll"
        );
    }
}
