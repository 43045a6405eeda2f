use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::BotContext;
use super::handlers::{handle_update, report_error};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Resolves once shutdown has been requested or the sender is gone.
pub async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Long-polls `getUpdates` and dispatches every update on its own task
/// until `shutdown` flips to true. In-flight handlers are awaited before returning.
pub async fn run_polling(
    ctx: Arc<BotContext>,
    poll_timeout_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset: Option<i64> = None;
    let mut handlers = JoinSet::new();

    info!("Polling for updates.");
    loop {
        while handlers.try_join_next().is_some() {}

        let result = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            result = ctx.api.get_updates(offset, poll_timeout_seconds) => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "Received updates.");
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let ctx = Arc::clone(&ctx);
                    handlers.spawn(async move {
                        let update_id = update.update_id;
                        if let Err(e) = handle_update(&ctx, update).await {
                            report_error(update_id, &e);
                        }
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch updates. Retrying shortly.");
                tokio::select! {
                    _ = wait_for_shutdown(&mut shutdown) => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }

    if !handlers.is_empty() {
        info!(in_flight = handlers.len(), "Waiting for in-flight handlers to finish.");
    }
    while let Some(joined) = handlers.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Update handler task failed.");
        }
    }
    info!("Polling stopped.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{RecordingApi, context};
    use crate::telegram::Update;
    use crate::telegram::types::{Chat, Message};

    fn command(update_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: 1 },
                from: None,
                text: Some(text.to_string()),
            }),
            callback_query: None,
        }
    }

    #[tokio::test]
    async fn test_dispatches_updates_and_advances_offset() {
        let api = Arc::new(RecordingApi::default());
        {
            let mut batches = api.update_batches.lock().unwrap();
            batches.push_back(Ok(vec![command(10, "/start"), command(11, "/help")]));
            batches.push_back(Ok(vec![command(12, "/help")]));
        }
        let ctx = context(api.clone(), true, 1);
        let (tx, rx) = watch::channel(false);

        let polling = tokio::spawn(run_polling(ctx, 1, rx));

        // The third poll blocks forever in the double; wait for it, then stop.
        while api.offsets.lock().unwrap().len() < 3 {
            tokio::task::yield_now().await;
        }
        tx.send(true).unwrap();
        polling.await.unwrap();

        assert_eq!(
            *api.offsets.lock().unwrap(),
            vec![None, Some(12), Some(13)]
        );
        assert_eq!(api.messages().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_backs_off_and_retries() {
        let api = Arc::new(RecordingApi::default());
        {
            let mut batches = api.update_batches.lock().unwrap();
            batches.push_back(Err("Conflict: terminated by other getUpdates request".to_string()));
            batches.push_back(Ok(vec![command(3, "/help")]));
        }
        let ctx = context(api.clone(), true, 1);
        let (tx, rx) = watch::channel(false);

        let polling = tokio::spawn(run_polling(ctx, 1, rx));

        while api.offsets.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        tx.send(true).unwrap();
        polling.await.unwrap();

        assert_eq!(*api.offsets.lock().unwrap(), vec![None, None, Some(4)]);
        assert_eq!(api.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_polling() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context(api, true, 1);
        let (tx, rx) = watch::channel(false);
        drop(tx);

        run_polling(ctx, 1, rx).await;
    }
}
