// src/pipeline/parse.rs
//! Structural parsing of cleaned model text into catalog records.
//! All-or-nothing: a failure never yields a partial record set.

use thiserror::Error;

use crate::model::{Event, Summary};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty text")]
    Empty,
    #[error("expected a JSON {expected}, found {found}")]
    WrongContainer {
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("summary text is missing or blank")]
    BlankSummary,
}

/// A JSON array of events. Unknown event keys are rejected.
pub fn parse_events(text: &str) -> Result<Vec<Event>, ParseError> {
    let value = parse_value(text)?;
    if !value.is_array() {
        return Err(ParseError::WrongContainer {
            expected: "array",
            found: kind_of(&value),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// A single JSON object with non-blank English text. Unknown keys are ignored.
pub fn parse_summary(text: &str) -> Result<Summary, ParseError> {
    let value = parse_value(text)?;
    if !value.is_object() {
        return Err(ParseError::WrongContainer {
            expected: "object",
            found: kind_of(&value),
        });
    }
    let summary: Summary = serde_json::from_value(value)?;
    if summary.summary.en.trim().is_empty() {
        return Err(ParseError::BlankSummary);
    }
    Ok(summary)
}

fn parse_value(text: &str) -> Result<serde_json::Value, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

fn kind_of(v: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocalizedText, Location, Source};

    fn sample_events() -> Vec<Event> {
        vec![
            Event {
                title: "Valencia Jazz Festival".into(),
                date: "2025-07-17".into(),
                location: Location {
                    name: Some("Teatro Principal".into()),
                    address: Some("Carrer de les Barques, 15".into()),
                    district: Some("Ciutat Vella".into()),
                },
                description: "Experience jazz.".into(),
                image_url: "https://example.org/jazz.jpg".into(),
                source: Source {
                    url: Some("https://valencia.es/agenda/jazz".into()),
                    main_url: Some("https://valencia.es".into()),
                    provider: Some("Valencia City Council".into()),
                },
                ..Event::default()
            },
            Event {
                title: "Book Fair".into(),
                date: "2025-07-23".into(),
                ..Event::default()
            },
        ]
    }

    #[test]
    fn events_serialized_then_parsed_are_equal() {
        let events = sample_events();
        let text = serde_json::to_string_pretty(&events).unwrap();
        assert_eq!(parse_events(&text).unwrap(), events);
    }

    #[test]
    fn events_missing_fields_default_to_empty() {
        let out = parse_events(r#"[{"title":"Only a title"}]"#).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Only a title");
        assert_eq!(out[0].date, "");
        assert_eq!(out[0].location, Location::default());
    }

    #[test]
    fn events_reject_non_array() {
        let err = parse_events(r#"{"title":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::WrongContainer {
                expected: "array",
                found: "object"
            }
        ));
        assert!(matches!(parse_events("not json"), Err(ParseError::Json(_))));
        assert!(matches!(parse_events("  "), Err(ParseError::Empty)));
    }

    #[test]
    fn events_reject_unknown_keys_and_type_mismatch() {
        assert!(parse_events(r#"[{"title":"x","venue":"y"}]"#).is_err());
        assert!(parse_events(r#"[{"title":42}]"#).is_err());
        // one bad element spoils the whole batch
        assert!(parse_events(r#"[{"title":"ok"}, 7]"#).is_err());
    }

    #[test]
    fn summary_plain_string_and_snake_case_keys() {
        let text = r#"{
            "summary": "Valencia comes alive this week.",
            "start_date": "2025-07-15",
            "end_date": "2025-07-25",
            "event_types": ["music", "food"],
            "confidence": 0.9
        }"#;
        let s = parse_summary(text).unwrap();
        assert_eq!(
            s.summary,
            LocalizedText {
                en: "Valencia comes alive this week.".into(),
                es: None
            }
        );
        assert_eq!(s.start_date, "2025-07-15");
        assert_eq!(s.end_date, "2025-07-25");
        assert_eq!(s.event_types, vec!["music", "food"]);
    }

    #[test]
    fn summary_tagged_text_and_camel_case_keys() {
        let text = r#"{"summary":{"en":"Hi","es":"Hola"},"startDate":"a","endDate":"b","eventTypes":[]}"#;
        let s = parse_summary(text).unwrap();
        assert_eq!(s.summary.es.as_deref(), Some("Hola"));
        assert_eq!(s.start_date, "a");
    }

    #[test]
    fn events_accept_null_as_missing() {
        let out = parse_events(
            r#"[{"title":"A","date":"2025-03-01","imageUrl":null,"description":null,"location":null}]"#,
        )
        .unwrap();
        assert_eq!(out[0].title, "A");
        assert_eq!(out[0].image_url, "");
        assert_eq!(out[0].description, "");
        assert_eq!(out[0].location, Location::default());
        // null does not open the door to unknown keys
        assert!(parse_events(r#"[{"title":"A","venue":null}]"#).is_err());
    }

    #[test]
    fn summary_requires_text() {
        assert!(matches!(parse_summary("{}"), Err(ParseError::BlankSummary)));
        assert!(matches!(
            parse_summary(r#"{"summary":"   ","start_date":"2025-03-01"}"#),
            Err(ParseError::BlankSummary)
        ));
        assert!(matches!(
            parse_summary(r#"{"summary":{"es":"solo"}}"#),
            Err(ParseError::BlankSummary)
        ));
        assert!(matches!(
            parse_summary(r#"{"summary":null}"#),
            Err(ParseError::BlankSummary)
        ));
        // a Responses envelope without a message item is not a summary either
        let envelope = r#"{"id":"resp_1","status":"incomplete","output":[{"type":"reasoning","summary":[]}]}"#;
        assert!(parse_summary(envelope).is_err());
    }

    #[test]
    fn summary_rejects_array_and_bad_types() {
        assert!(matches!(
            parse_summary("[]"),
            Err(ParseError::WrongContainer { .. })
        ));
        assert!(parse_summary(r#"{"event_types":"music"}"#).is_err());
    }
}
