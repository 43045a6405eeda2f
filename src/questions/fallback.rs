use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::history::History;
use super::model::Question;

/// Built-in questions used when the API yields nothing.
pub fn fallback_questions() -> Vec<Question> {
    vec![
        Question {
            statement: "Fallback: Qual a capital do Brasil?".to_string(),
            options: vec![
                "Rio de Janeiro".to_string(),
                "Brasília".to_string(),
                "São Paulo".to_string(),
                "Belo Horizonte".to_string(),
            ],
            correct: 1,
            comment: "Brasília é a capital federal desde 1960.".to_string(),
            topic: "Geral".to_string(),
        },
        Question {
            statement: "Fallback: 2 + 2 é igual a?".to_string(),
            options: vec![
                "1".to_string(),
                "2".to_string(),
                "3".to_string(),
                "4".to_string(),
            ],
            correct: 3,
            comment: "Operação básica de adição.".to_string(),
            topic: "Raciocínio Lógico".to_string(),
        },
    ]
}

/// Draws up to `qty` distinct fallback questions, preferring those of `topic`.
/// Stops early once the distinct pool runs out.
pub fn fallback_batch(qty: usize, topic: Option<&str>, history: &mut History) -> Vec<Question> {
    let mut pool = fallback_questions();
    if let Some(topic) = topic {
        let matching: Vec<Question> = pool.iter().filter(|q| q.topic == topic).cloned().collect();
        if !matching.is_empty() {
            pool = matching;
        }
    }

    pool.shuffle(&mut rand::rng());

    let mut seen = HashSet::new();
    let batch: Vec<Question> = pool
        .into_iter()
        .filter(|q| seen.insert(q.key()))
        .take(qty)
        .collect();

    for question in &batch {
        history.record(question);
    }
    batch
}
