//! Response normalization.
//!
//! Providers return completions as plain strings, lists of candidate
//! strings, or arbitrary JSON values. Everything is reduced to a single
//! candidate script string before validation, unwrapping markdown code
//! fences along the way.

use serde_json::Value;

use crate::provider::ProviderResponse;

/// Reduce a raw provider response to a single candidate script string.
pub fn normalize_response(response: ProviderResponse) -> String {
    match response {
        ProviderResponse::Text(text) => strip_code_fences(&text),
        ProviderResponse::Candidates(candidates) => {
            // First candidate wins, taken as-is.
            candidates.into_iter().next().unwrap_or_default()
        }
        ProviderResponse::Value(value) => normalize_value(value),
    }
}

fn normalize_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => strip_code_fences(&text),
        Value::Array(items) => items.into_iter().next().map(value_text).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Unwrap a markdown code fence if the text carries one.
///
/// A ```python fence with a closing fence wins over a generic fence pair;
/// text without fences passes through unchanged, so this is idempotent on
/// plain script text.
pub fn strip_code_fences(text: &str) -> String {
    if let Some((_, after)) = text.split_once("```python") {
        if let Some((inner, _)) = after.split_once("```") {
            return inner.trim().to_string();
        }
    }
    if let Some((_, after)) = text.split_once("```") {
        let inner = match after.split_once("```") {
            Some((inner, _)) => inner,
            None => after,
        };
        return inner.trim().to_string();
    }
    text.to_string()
}
