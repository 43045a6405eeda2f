use chrono::FixedOffset;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::bot::polling::run_polling;
use crate::bot::{BotContext, BotError};
use crate::config::{BotConfig, ConfigError};
use crate::questions::{HttpQuestionSource, QuestionService, QuestionSource};
use crate::scheduler::{Schedule, spawn_daily_jobs};
use crate::telegram::{BotApi, ChatId, TelegramClient};
use crate::version::VERSION;

/// A fully wired bot, ready to run.
pub struct App {
    ctx: Arc<BotContext>,
    schedule: Schedule,
    offset: FixedOffset,
    poll_timeout_seconds: u64,
}

impl App {
    /// Validates `config` and wires the HTTP clients and services.
    pub fn build(config: &BotConfig) -> Result<Self, BotError> {
        config.validate()?;

        let backoff_base = Duration::try_from_secs_f64(config.api_backoff_base_seconds)
            .map_err(|e| ConfigError::Invalid(format!("Invalid API_BACKOFF_BASE_SECONDS: {e}")))?;
        let source = HttpQuestionSource::new(
            &config.questions_api_url,
            Duration::from_secs(config.api_timeout_seconds),
            config.api_max_retries,
            backoff_base,
        )?;
        let api = TelegramClient::new(&config.telegram_api_url, &config.telegram_token)?;

        Self::with_parts(config, Arc::new(api), Arc::new(source))
    }

    /// Wires the bot around the given Bot API and question source.
    pub fn with_parts(
        config: &BotConfig,
        api: Arc<dyn BotApi>,
        source: Arc<dyn QuestionSource>,
    ) -> Result<Self, BotError> {
        let ctx = Arc::new(BotContext {
            api,
            questions: Arc::new(QuestionService::new(source, config.history_limit)),
            channel: ChatId::from(config.channel_id.as_str()),
            topics: config.topics.clone(),
            batch_size: config.batch_size,
        });

        Ok(Self {
            ctx,
            schedule: config.daily_schedule()?,
            offset: config.offset()?,
            poll_timeout_seconds: config.poll_timeout_seconds,
        })
    }

    pub fn context(&self) -> Arc<BotContext> {
        Arc::clone(&self.ctx)
    }

    /// Runs the daily jobs and the polling loop until `shutdown` flips to true.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(version = VERSION, "Starting Black House Bot.");

        let jobs = spawn_daily_jobs(
            Arc::clone(&self.ctx),
            &self.schedule,
            self.offset,
            shutdown.clone(),
        );

        info!("Bot running in polling mode.");
        run_polling(Arc::clone(&self.ctx), self.poll_timeout_seconds, shutdown).await;

        for result in join_all(jobs).await {
            if let Err(e) = result {
                warn!(error = %e, "Scheduled job task failed.");
            }
        }
        info!("Black House Bot stopped.");
    }
}

/// Flips the returned receiver to true on Ctrl-C or SIGTERM.
pub fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received.");
        let _ = tx.send(true);
    });
    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler. Only Ctrl-C will stop the bot.");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
