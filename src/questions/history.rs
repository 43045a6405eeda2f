use std::collections::{HashSet, VecDeque};

use super::model::{Question, QuestionKey};

/// Bounded memory of recently posted questions, oldest evicted first.
#[derive(Debug)]
pub struct History {
    order: VecDeque<QuestionKey>,
    keys: HashSet<QuestionKey>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            order: VecDeque::new(),
            keys: HashSet::new(),
            limit,
        }
    }

    pub fn contains(&self, key: &QuestionKey) -> bool {
        self.keys.contains(key)
    }

    pub fn record(&mut self, question: &Question) {
        let key = question.key();
        if self.keys.contains(&key) {
            return;
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);

        while self.order.len() > self.limit {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
