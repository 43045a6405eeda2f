use tracing::{error, info};

use super::{BatchOrigin, BotContext, BotError};
use crate::questions::Question;
use crate::telegram::{QuizPoll, escape_markdown_v2};

impl From<&Question> for QuizPoll {
    fn from(question: &Question) -> Self {
        QuizPoll {
            question: question.poll_title(),
            options: question.options.clone(),
            correct_option_id: question.correct,
            explanation: Some(question.comment.clone()).filter(|c| !c.is_empty()),
        }
    }
}

fn unavailable_message(topic: &str) -> String {
    format!(
        "⚠️ Não consegui carregar questões de *{}* agora\\. Tente novamente mais tarde\\.",
        escape_markdown_v2(topic)
    )
}

/// Posts a batch of quiz polls about `topic` to the configured channel.
/// Returns how many polls were delivered.
pub async fn send_batch_to_channel(
    ctx: &BotContext,
    topic: &str,
    origin: BatchOrigin,
    qty: usize,
) -> Result<usize, BotError> {
    info!(%origin, topic, "Starting batch.");

    let questions = ctx.questions.fetch_batch(qty, Some(topic), true).await;

    if questions.is_empty() {
        error!(topic, "No questions available for topic.");
        ctx.api
            .send_message(&ctx.channel, &unavailable_message(topic), None)
            .await?;
        return Ok(0);
    }

    let mut sent = 0;
    for question in &questions {
        let poll = QuizPoll::from(question);
        match ctx.api.send_poll(&ctx.channel, &poll).await {
            Ok(()) => sent += 1,
            Err(e) => error!(error = %e, topic, "Failed to send poll to channel."),
        }
    }

    info!(%origin, topic, total = sent, "Batch finished.");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{RecordingApi, context};
    use crate::telegram::ChatId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_posts_one_quiz_per_question() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context(api.clone(), true, 3);

        let sent = send_batch_to_channel(&ctx, "Penal", BatchOrigin::Manual, 3)
            .await
            .unwrap();

        assert_eq!(sent, 3);
        let polls = api.polls();
        assert_eq!(polls.len(), 3);
        for (chat, poll) in &polls {
            assert_eq!(*chat, ChatId::from("@canal_teste"));
            assert!(poll.question.starts_with("[Penal] Questão "));
            assert_eq!(poll.options, vec!["certo".to_string(), "errado".to_string()]);
            assert_eq!(poll.correct_option_id, 0);
        }
        // Even-numbered questions have an empty comment and therefore no explanation.
        assert!(polls.iter().any(|(_, p)| p.explanation.is_none()));
        assert!(polls
            .iter()
            .any(|(_, p)| p.explanation.as_deref() == Some("Comentário")));
        assert!(api.messages().is_empty());
    }

    #[tokio::test]
    async fn test_failed_poll_does_not_stop_batch() {
        let api = Arc::new(RecordingApi::default());
        api.failing_polls
            .lock()
            .unwrap()
            .push("Questão 1".to_string());
        let ctx = context(api.clone(), true, 3);

        let sent = send_batch_to_channel(&ctx, "Penal", BatchOrigin::Automatic, 3)
            .await
            .unwrap();

        assert_eq!(sent, 2);
        assert_eq!(api.polls().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_used_when_api_down() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context(api.clone(), false, 10);

        let sent = send_batch_to_channel(&ctx, "Raciocínio Lógico", BatchOrigin::Manual, 10)
            .await
            .unwrap();

        assert_eq!(sent, 1);
        assert_eq!(api.polls()[0].1.question, "[Raciocínio Lógico] Fallback: 2 + 2 é igual a?");
    }

    #[tokio::test]
    async fn test_zero_quantity_warns_channel() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context(api.clone(), true, 0);

        let sent = send_batch_to_channel(&ctx, "Penal", BatchOrigin::Automatic, 0)
            .await
            .unwrap();

        assert_eq!(sent, 0);
        let messages = api.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].chat, ChatId::from("@canal_teste"));
        assert!(messages[0].text.contains("*Penal*"));
    }

    #[test]
    fn test_unavailable_message_escapes_topic() {
        assert_eq!(
            unavailable_message("Processo-Penal"),
            "⚠️ Não consegui carregar questões de *Processo\\-Penal* agora\\. Tente novamente mais tarde\\."
        );
    }
}
