use tracing::{debug, error, info};

use super::broadcast::send_batch_to_channel;
use super::{BatchOrigin, BotContext, BotError};
use crate::telegram::types::{CallbackQuery, Message};
use crate::telegram::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Update};

/// Callback data prefix for topic buttons.
pub const TOPIC_ACTION: &str = "TEMA";

const START_TEXT: &str =
    "👊 *Black House Bot*\n\nEscolha a matéria para mandar um lote de questões no canal\\.";

const HELP_TEXT: &str = "ℹ️ *Comandos disponíveis*\n\n\
    /start – escolher matéria e enviar questões\n\
    /help – exibe esta ajuda\n\
    \n\
    O envio automático é feito direto no canal nos horários configurados\\.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

/// Extracts the command from `/cmd`, `/cmd@BotName` or `/cmd args`.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split_once('@').map_or(name, |(cmd, _)| cmd);
    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction<'a> {
    Topic(&'a str),
    Unknown,
    Malformed,
}

pub fn parse_callback(data: Option<&str>) -> CallbackAction<'_> {
    match data.and_then(|d| d.split_once('|')) {
        Some((TOPIC_ACTION, topic)) => CallbackAction::Topic(topic),
        Some(_) => CallbackAction::Unknown,
        None => CallbackAction::Malformed,
    }
}

pub fn topic_keyboard(topics: &[String]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: topics
            .iter()
            .map(|topic| {
                vec![InlineKeyboardButton {
                    text: topic.clone(),
                    callback_data: format!("{TOPIC_ACTION}|{topic}"),
                }]
            })
            .collect(),
    }
}

/// Routes one update to the matching handler.
pub async fn handle_update(ctx: &BotContext, update: Update) -> Result<(), BotError> {
    if let Some(query) = update.callback_query {
        return handle_callback(ctx, &query).await;
    }
    if let Some(message) = update.message {
        return handle_message(ctx, &message).await;
    }
    debug!(update_id = update.update_id, "Ignoring update without message or callback.");
    Ok(())
}

async fn handle_message(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let Some(command) = message.text.as_deref().and_then(parse_command) else {
        return Ok(());
    };
    let chat = ChatId::Id(message.chat.id);

    match command {
        Command::Start => {
            match &message.from {
                Some(user) => info!(
                    user_id = user.id,
                    username = user.username.as_deref().unwrap_or("?"),
                    "/start called."
                ),
                None => info!(user_id = "?", username = "?", "/start called."),
            }
            let keyboard = topic_keyboard(&ctx.topics);
            ctx.api.send_message(&chat, START_TEXT, Some(&keyboard)).await?;
        }
        Command::Help => {
            ctx.api.send_message(&chat, HELP_TEXT, None).await?;
        }
    }
    Ok(())
}

async fn handle_callback(ctx: &BotContext, query: &CallbackQuery) -> Result<(), BotError> {
    match parse_callback(query.data.as_deref()) {
        CallbackAction::Malformed => {
            ctx.api
                .answer_callback_query(&query.id, Some("Formato de ação inválido."), true)
                .await?;
        }
        CallbackAction::Unknown => {
            ctx.api
                .answer_callback_query(&query.id, Some("Ação desconhecida."), true)
                .await?;
        }
        CallbackAction::Topic(topic) if !ctx.is_known_topic(topic) => {
            ctx.api
                .answer_callback_query(&query.id, Some("Matéria inválida."), true)
                .await?;
        }
        CallbackAction::Topic(topic) => {
            let notice = format!("Enviando questões de {topic} no canal...");
            ctx.api
                .answer_callback_query(&query.id, Some(&notice), false)
                .await?;
            send_batch_to_channel(ctx, topic, BatchOrigin::Manual, ctx.batch_size).await?;
        }
    }
    Ok(())
}

/// Global hook for errors that escape a handler.
pub fn report_error(update_id: i64, err: &BotError) {
    error!(update_id, error = %err, "Unhandled error while processing update.");
}
