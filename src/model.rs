// src/model.rs
//! Catalog records: the singleton admin configuration, events, and the summary.
//!
//! Wire shape is camelCase (what the admin UI consumes). Summary fields also
//! accept the snake_case spelling the bundled summary prompt asks the model for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const SUMMARY_TEXT_MAX_CHARS: usize = 1000;

/// Singleton admin configuration. Replaced wholesale on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub id: String,
    /// Bumped by the store on every replace; 1 for the first record.
    pub version: u64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    /// Provider credential. `ENV` means: read `OPENAI_API_KEY` at request time.
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub events_prompt: String,
    #[serde(default)]
    pub summary_prompt: String,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PUT /config`: every operator-editable field. Absent fields become empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub city: String,
    pub categories: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub openai_api_key: String,
    pub events_prompt: String,
    pub summary_prompt: String,
}

impl Configuration {
    /// Build the record that replaces `previous` (or the first one when `None`).
    pub fn from_update(update: ConfigUpdate, previous: Option<&Configuration>) -> Self {
        let (id, version) = match previous {
            Some(p) => (p.id.clone(), p.version.saturating_add(1)),
            None => (uuid::Uuid::new_v4().to_string(), 1),
        };
        Self {
            id,
            version,
            city: update.city,
            categories: update.categories,
            start_date: update.start_date,
            end_date: update.end_date,
            openai_api_key: update.openai_api_key,
            events_prompt: update.events_prompt,
            summary_prompt: update.summary_prompt,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
}

/// Where the event listing came from. Sub-fields are whatever the provider returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub url: Option<String>,
    pub main_url: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Event {
    /// Assigned at persist time; any value in an incoming payload is replaced.
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// ISO calendar date (YYYY-MM-DD).
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: Location,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Summary body, English plus an optional Spanish rendition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    pub en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub es: Option<String>,
}

// A bare string is accepted as the English text.
impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Plain(String),
            Tagged {
                #[serde(default)]
                en: String,
                #[serde(default)]
                es: Option<String>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Plain(en) => LocalizedText { en, es: None },
            Repr::Tagged { en, es } => LocalizedText { en, es },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summary {
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: LocalizedText,
    #[serde(alias = "start_date", deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(alias = "end_date", deserialize_with = "null_as_default")]
    pub end_date: String,
    #[serde(alias = "event_types", deserialize_with = "null_as_default")]
    pub event_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// Models emit `null` for fields they could not fill; treat it like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Cut `s` to at most `max` chars on a char boundary. Returns true when it was cut.
pub(crate) fn truncate_chars(s: &mut String, max: usize) -> bool {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            s.truncate(idx);
            true
        }
        None => false,
    }
}

impl Event {
    /// Fresh id + timestamp, description bounded. Returns true if the description was cut.
    pub(crate) fn stamp(&mut self, now: DateTime<Utc>) -> bool {
        self.id = uuid::Uuid::new_v4().to_string();
        self.created_at = Some(now);
        truncate_chars(&mut self.description, DESCRIPTION_MAX_CHARS)
    }
}

impl Summary {
    pub(crate) fn stamp(&mut self, now: DateTime<Utc>) -> bool {
        self.id = uuid::Uuid::new_v4().to_string();
        self.created_at = Some(now);
        let mut cut = truncate_chars(&mut self.summary.en, SUMMARY_TEXT_MAX_CHARS);
        if let Some(es) = self.summary.es.as_mut() {
            cut |= truncate_chars(es, SUMMARY_TEXT_MAX_CHARS);
        }
        cut
    }
}
