pub mod client;
pub mod markdown;
pub mod types;

pub use client::{BotApi, TelegramClient, TelegramError};
pub use markdown::escape_markdown_v2;
pub use types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, QuizPoll, Update};
