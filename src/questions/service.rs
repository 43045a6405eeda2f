use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::fallback::fallback_batch;
use super::history::History;
use super::model::Question;
use super::normalize::{is_empty_payload, normalize};
use super::source::{FetchParams, QuestionSource};

/// API calls allowed per requested question, to push for variety.
const ATTEMPTS_PER_QUESTION: usize = 4;

/// Fetches batches of questions, avoiding repeats within a batch and across recent batches.
pub struct QuestionService {
    source: Arc<dyn QuestionSource>,
    history: Mutex<History>,
}

impl QuestionService {
    pub fn new(source: Arc<dyn QuestionSource>, history_limit: usize) -> Self {
        Self {
            source,
            history: Mutex::new(History::new(history_limit)),
        }
    }

    /// Returns up to `qty` questions, one API call at a time.
    /// Falls back to the built-in questions when the API yields nothing usable.
    pub async fn fetch_batch(
        &self,
        qty: usize,
        topic: Option<&str>,
        avoid_repeats: bool,
    ) -> Vec<Question> {
        if qty == 0 {
            return Vec::new();
        }

        let mut batch: Vec<Question> = Vec::with_capacity(qty);
        let mut seen_in_batch = HashSet::new();
        let max_attempts = qty * ATTEMPTS_PER_QUESTION;
        let params = FetchParams::single(topic);
        let mut attempts = 0;

        while batch.len() < qty && attempts < max_attempts {
            attempts += 1;

            let payload = match self.source.fetch(&params).await {
                Some(payload) if !is_empty_payload(&payload) => payload,
                _ => break,
            };

            let candidates = normalize(&payload, topic);
            if candidates.is_empty() {
                debug!(attempt = attempts, "API payload held no valid questions.");
                continue;
            }

            let mut history = self.history.lock().await;
            for question in candidates {
                let key = question.key();
                if seen_in_batch.contains(&key) {
                    continue;
                }
                if avoid_repeats && history.contains(&key) {
                    continue;
                }

                seen_in_batch.insert(key);
                history.record(&question);
                batch.push(question);

                if batch.len() >= qty {
                    break;
                }
            }
        }

        if !batch.is_empty() {
            batch.shuffle(&mut rand::rng());
            batch.truncate(qty);
            return batch;
        }

        warn!("API returned no valid questions. Using local fallback.");
        let mut history = self.history.lock().await;
        fallback_batch(qty, topic, &mut history)
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}
