use serde_json::{Map, Value};

use super::model::Question;

const REQUIRED_KEYS: [&str; 3] = ["pergunta", "opcoes", "correta"];
const DEFAULT_TOPIC: &str = "Geral";

/// True for payloads that carry nothing: null, false, zero, "", [] and {}.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn has_required_keys(map: &Map<String, Value>) -> bool {
    REQUIRED_KEYS.iter().all(|k| map.contains_key(*k))
}

/// Picks the list of raw question objects out of the shapes the API returns:
/// a single question, `{"result": [...]}`, `{"questoes": [...]}` or a bare list.
fn raw_items(payload: &Value) -> &[Value] {
    match payload {
        Value::Object(map) if has_required_keys(map) => std::slice::from_ref(payload),
        Value::Object(map) => match (map.get("result"), map.get("questoes")) {
            (Some(Value::Array(items)), _) => items.as_slice(),
            (_, Some(Value::Array(items))) => items.as_slice(),
            _ => &[],
        },
        Value::Array(items) => items.as_slice(),
        _ => &[],
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_index(value: &Value) -> Option<usize> {
    let index = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if !f.is_finite() {
                    return None;
                }
                f.trunc() as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Bool(b) => i64::from(*b),
        _ => return None,
    };
    usize::try_from(index).ok()
}

fn normalize_item(item: &Value, default_topic: Option<&str>) -> Option<Question> {
    let map = item.as_object()?;
    if !has_required_keys(map) {
        return None;
    }

    let options: Vec<String> = match map.get("opcoes") {
        Some(Value::Array(opts)) if opts.len() >= 2 => opts.iter().map(value_to_text).collect(),
        _ => return None,
    };

    let correct = parse_index(&map["correta"])?;
    if correct >= options.len() {
        return None;
    }

    let statement = match &map["pergunta"] {
        Value::Null => return None,
        other => value_to_text(other),
    };
    if statement.trim().is_empty() {
        return None;
    }

    let comment = match map.get("comentario") {
        Some(value) if !is_empty_payload(value) => value_to_text(value),
        _ => String::new(),
    };

    let topic = match map.get("topico") {
        Some(value) if !is_empty_payload(value) => value_to_text(value),
        _ => default_topic
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC)
            .to_string(),
    };

    Some(Question {
        statement,
        options,
        correct,
        comment,
        topic,
    })
}

/// Turns a raw API payload into valid questions, silently dropping malformed entries.
pub fn normalize(payload: &Value, default_topic: Option<&str>) -> Vec<Question> {
    raw_items(payload)
        .iter()
        .filter_map(|item| normalize_item(item, default_topic))
        .collect()
}
