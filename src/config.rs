use chrono::{FixedOffset, NaiveTime};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::bot::handlers::TOPIC_ACTION;
use crate::scheduler::{Schedule, ScheduleEntry};

/// Telegram rejects inline buttons whose `callback_data` exceeds this many bytes.
const MAX_CALLBACK_DATA_BYTES: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0}")]
    Invalid(String),
}

/// One automatic daily batch, as written in the config file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    /// Wall-clock time, `HH:MM`.
    pub time: String,
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub questions_api_url: String,
    pub channel_id: String,
    pub telegram_api_url: String,
    pub utc_offset: String,
    pub batch_size: usize,
    pub api_timeout_seconds: u64,
    pub api_max_retries: u32,
    pub api_backoff_base_seconds: f64,
    pub history_limit: usize,
    pub poll_timeout_seconds: u64,
    pub log_dir: Option<String>,
    pub topics: Vec<String>,
    pub schedule: Vec<ScheduleConfig>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialBotConfig {
    telegram_token: Option<String>,
    questions_api_url: Option<String>,
    channel_id: Option<String>,
    // legacy name
    canal_id: Option<String>,
    telegram_api_url: Option<String>,
    utc_offset: Option<String>,
    batch_size: Option<usize>,
    api_timeout_seconds: Option<u64>,
    api_max_retries: Option<u32>,
    api_backoff_base_seconds: Option<f64>,
    history_limit: Option<usize>,
    poll_timeout_seconds: Option<u64>,
    log_dir: Option<String>,
    topics: Option<Vec<String>>,
}

// The schedule table only comes from the file.
#[derive(Deserialize, Default, Debug)]
struct FileBotConfig {
    #[serde(flatten)]
    common: PartialBotConfig,
    schedule: Option<Vec<ScheduleConfig>>,
}

fn default_questions_api_url() -> String {
    "https://blackhouse-api-production.up.railway.app/questoes".to_string()
}

fn default_channel_id() -> String {
    "@BLACKHOUSE_CONCURSOS".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_utc_offset() -> String {
    // America/Sao_Paulo, no DST since 2019
    "-03:00".to_string()
}

fn default_topics() -> Vec<String> {
    [
        "Penal",
        "Constitucional",
        "Raciocínio Lógico",
        "Processo Penal",
        "Direitos Humanos",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_schedule() -> Vec<ScheduleConfig> {
    [
        ("08:00", "Penal"),
        ("13:00", "Constitucional"),
        ("19:00", "Raciocínio Lógico"),
    ]
    .into_iter()
    .map(|(time, topic)| ScheduleConfig {
        time: time.to_string(),
        topic: topic.to_string(),
    })
    .collect()
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

impl BotConfig {
    /// Loads `.env`, then the optional TOML file, then the process environment.
    /// Environment values override file values.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_from(config_path, std::env::vars())
    }

    pub fn load_from<I>(config_path: Option<&str>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. Load from file (optional)
        let file_config: FileBotConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => FileBotConfig::default(),
        };
        let file = file_config.common;

        // 2. Load from environment variables
        let env_config: PartialBotConfig = envy::from_iter(env)?;

        // 3. Merge: environment overrides file
        Ok(BotConfig {
            telegram_token: trimmed(env_config.telegram_token.or(file.telegram_token))
                .unwrap_or_default(),
            questions_api_url: trimmed(env_config.questions_api_url.or(file.questions_api_url))
                .unwrap_or_else(default_questions_api_url),
            channel_id: trimmed(
                env_config
                    .channel_id
                    .or(env_config.canal_id)
                    .or(file.channel_id)
                    .or(file.canal_id),
            )
            .unwrap_or_else(default_channel_id),
            telegram_api_url: trimmed(env_config.telegram_api_url.or(file.telegram_api_url))
                .filter(|url| !url.is_empty())
                .unwrap_or_else(default_telegram_api_url),
            utc_offset: trimmed(env_config.utc_offset.or(file.utc_offset))
                .unwrap_or_else(default_utc_offset),
            batch_size: env_config.batch_size.or(file.batch_size).unwrap_or(10),
            api_timeout_seconds: env_config
                .api_timeout_seconds
                .or(file.api_timeout_seconds)
                .unwrap_or(10),
            api_max_retries: env_config
                .api_max_retries
                .or(file.api_max_retries)
                .unwrap_or(3),
            api_backoff_base_seconds: env_config
                .api_backoff_base_seconds
                .or(file.api_backoff_base_seconds)
                .unwrap_or(0.7),
            history_limit: env_config
                .history_limit
                .or(file.history_limit)
                .unwrap_or(500),
            poll_timeout_seconds: env_config
                .poll_timeout_seconds
                .or(file.poll_timeout_seconds)
                .unwrap_or(30),
            log_dir: trimmed(env_config.log_dir.or(file.log_dir)).filter(|dir| !dir.is_empty()),
            topics: env_config
                .topics
                .or(file.topics)
                .map(|topics| {
                    topics
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_else(default_topics),
            schedule: file_config.schedule.unwrap_or_else(default_schedule),
        })
    }

    /// Checks every setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.telegram_token.is_empty() {
            problems.push("TELEGRAM_TOKEN is not set.".to_string());
        }
        if self.channel_id.is_empty() {
            problems.push("CHANNEL_ID is not set.".to_string());
        }
        if self.topics.is_empty() {
            problems.push("topics must list at least one topic.".to_string());
        }
        if self.batch_size == 0 {
            problems.push("BATCH_SIZE must be at least 1.".to_string());
        }
        if self.api_max_retries == 0 {
            problems.push("API_MAX_RETRIES must be at least 1.".to_string());
        }
        if Duration::try_from_secs_f64(self.api_backoff_base_seconds).is_err() {
            problems.push(format!(
                "API_BACKOFF_BASE_SECONDS '{}' must be a non-negative number of seconds.",
                self.api_backoff_base_seconds
            ));
        }
        for topic in &self.topics {
            let len = TOPIC_ACTION.len() + 1 + topic.len();
            if len > MAX_CALLBACK_DATA_BYTES {
                problems.push(format!(
                    "topic '{topic}' is too long for a button ({len} of {MAX_CALLBACK_DATA_BYTES} bytes)."
                ));
            }
        }
        if parse_utc_offset(&self.utc_offset).is_none() {
            problems.push(format!(
                "UTC_OFFSET '{}' is not a valid offset (expected e.g. -03:00).",
                self.utc_offset
            ));
        }
        for entry in &self.schedule {
            if parse_schedule_time(&entry.time).is_none() {
                problems.push(format!(
                    "schedule time '{}' for topic '{}' is not HH:MM.",
                    entry.time, entry.topic
                ));
            }
        }

        if !problems.is_empty() {
            let msg = format!("Invalid configuration:\n- {}", problems.join("\n- "));
            error!("{}", msg);
            return Err(ConfigError::Invalid(msg));
        }

        info!("Configuration validated.");
        if self.questions_api_url.is_empty() {
            info!("Questions API: (not configured)");
        } else {
            info!(url = %self.questions_api_url, "Questions API configured.");
        }
        info!(channel = %self.channel_id, "Target channel configured.");
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset).ok_or_else(|| {
            ConfigError::Invalid(format!("Invalid UTC offset: {}", self.utc_offset))
        })
    }

    pub fn daily_schedule(&self) -> Result<Schedule, ConfigError> {
        let entries = self
            .schedule
            .iter()
            .map(|entry| {
                let time = parse_schedule_time(&entry.time).ok_or_else(|| {
                    ConfigError::Invalid(format!("Invalid schedule time: {}", entry.time))
                })?;
                Ok(ScheduleEntry::new(time, &entry.topic))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Schedule::new(entries))
    }
}

fn parse_schedule_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Parses `+HH:MM`, `-HHMM`, `Z` or `UTC`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    value.parse::<FixedOffset>().ok()
}
