// src/pipeline/envelope.rs
//! Locate the assistant's text inside a Responses-style reply envelope:
//!
//! ```text
//! {"output": [ {"type": "reasoning", ...},
//!              {"type": "message", "content": [ {"text": "..."} ]} ]}
//! ```
//!
//! Best effort only: any shape mismatch yields `None` and the caller falls back to
//! the raw reply.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    output: Option<Value>,
}

/// One `output` element, discriminated on `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

/// Text of the first content part of the first `message` item with non-empty content.
pub fn extract_text(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "reply is not a JSON envelope");
            return None;
        }
    };
    let items = envelope.output?;
    let items = items.as_array()?;

    items
        .iter()
        // elements that do not fit the item schema are skipped, not fatal
        .filter_map(|v| OutputItem::deserialize(v).ok())
        .find_map(|item| match item {
            OutputItem::Message { content } if !content.is_empty() => Some(content),
            _ => None,
        })
        .and_then(|content| content.into_iter().next())
        .and_then(|part| part.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_text() {
        let raw = r#"{"output":[{"type":"message","content":[{"text":"T"}]}]}"#;
        assert_eq!(extract_text(raw).as_deref(), Some("T"));
    }

    #[test]
    fn skips_non_message_items() {
        let raw = r#"{
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant",
                 "content": [{"type": "output_text", "text": "[]", "annotations": []},
                             {"type": "output_text", "text": "ignored"}]}
            ]
        }"#;
        assert_eq!(extract_text(raw).as_deref(), Some("[]"));
    }

    #[test]
    fn empty_message_content_falls_through_to_next_message() {
        let raw = r#"{"output":[
            {"type":"message","content":[]},
            {"type":"message","content":[{"text":"second"}]}
        ]}"#;
        assert_eq!(extract_text(raw).as_deref(), Some("second"));
    }

    #[test]
    fn malformed_items_are_skipped() {
        let raw = r#"{"output":[
            {"no_type": true},
            {"type":"message","content":"not a list"},
            {"type":"message","content":[{"text":"ok"}]}
        ]}"#;
        assert_eq!(extract_text(raw).as_deref(), Some("ok"));
    }

    #[test]
    fn absent_for_unexpected_shapes() {
        for raw in [
            "",
            "   ",
            "not json",
            r#"{"output":[]}"#,
            r#"{"output":{"type":"message"}}"#,
            r#"{"choices":[{"message":{"content":"x"}}]}"#,
            r#"[{"title":"an event array, not an envelope"}]"#,
            r#"{"output":[{"type":"message","content":[{"type":"refusal"}]}]}"#,
        ] {
            assert!(extract_text(raw).is_none(), "expected None for {raw:?}");
        }
    }
}
