use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum QuestionApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Questions API returned non-success status: {status}. Body: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Query string sent to the questions API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchParams {
    pub qtd: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topico: Option<String>,
}

impl FetchParams {
    pub fn single(topic: Option<&str>) -> Self {
        Self {
            qtd: 1,
            topico: topic.map(str::to_string),
        }
    }
}

/// Where raw question payloads come from.
/// Implementations swallow their own failures and return `None`.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Option<Value>;
}

/// Calls the questions API over HTTP with a timeout, retries and exponential backoff.
pub struct HttpQuestionSource {
    client: Client,
    api_url: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpQuestionSource {
    pub fn new(
        api_url: &str,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Result<Self, QuestionApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim().to_string(),
            max_retries: max_retries.max(1),
            backoff_base,
        })
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .unwrap_or(Duration::MAX)
    }

    async fn fetch_once(&self, params: &FetchParams) -> Result<Value, QuestionApiError> {
        let response = self.client.get(&self.api_url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(QuestionApiError::Status { status, body });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch(&self, params: &FetchParams) -> Option<Value> {
        if self.api_url.is_empty() {
            warn!("QUESTIONS_API_URL is not configured. Skipping API call.");
            return None;
        }

        for attempt in 1..=self.max_retries {
            info!(
                url = %self.api_url,
                qtd = params.qtd,
                topic = params.topico.as_deref().unwrap_or("-"),
                attempt,
                "Calling questions API."
            );
            match self.fetch_once(params).await {
                Ok(payload) => return Some(payload),
                Err(e) => {
                    warn!(
                        error = %e,
                        "Questions API call failed ({}/{}).",
                        attempt,
                        self.max_retries
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff_for(attempt)).await;
                    }
                }
            }
        }
        None
    }
}
