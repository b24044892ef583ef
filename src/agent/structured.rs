//! Tolerant extraction of JSON objects from free-form LLM output.
//!
//! Backends without native structured output wrap JSON inconsistently:
//! bare, inside `<json>` tags, inside a markdown fence, or surrounded by
//! prose. [`parse`] tries, in order:
//!
//! 1. each explicitly delimited block (every `<json>…</json>`, then every
//!    fenced code block)
//! 2. the outermost `{…}` span (first `{` to last `}`)
//!
//! and either returns a fully decoded object or
//! [`AgentError::NoStructuredData`].

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::error::AgentError;

static TAGGED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"<json>(.*?)</json>")
        .dot_matches_new_line(true)
        .build()
        .unwrap_or_else(|_| unreachable!())
});

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"```(?:json|JSON)?[ \t]*\n?(.*?)```")
        .dot_matches_new_line(true)
        .build()
        .unwrap_or_else(|_| unreachable!())
});

static OUTER_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\{.*\}")
        .dot_matches_new_line(true)
        .build()
        .unwrap_or_else(|_| unreachable!())
});

/// Parses the first decodable JSON object out of `raw`.
///
/// # Errors
///
/// Returns [`AgentError::NoStructuredData`] carrying `raw` when neither a
/// delimited block nor the outer `{…}` span decodes to a JSON object.
pub fn parse(raw: &str) -> Result<Map<String, Value>, AgentError> {
    let delimited = [&*TAGGED_BLOCK, &*FENCED_BLOCK]
        .into_iter()
        .flat_map(|re| re.captures_iter(raw))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| decode_object(m.as_str()));
    if let Some(map) = delimited {
        return Ok(map);
    }

    if let Some(map) = OUTER_OBJECT
        .find(raw)
        .and_then(|m| decode_object(m.as_str()))
    {
        return Ok(map);
    }

    Err(AgentError::NoStructuredData {
        content: raw.to_string(),
    })
}

/// Returns the trimmed string at `key`, if present and non-empty.
#[must_use]
pub fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Decodes `text` as a JSON object, rejecting other JSON values.
fn decode_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
