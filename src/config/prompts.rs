// src/config/prompts.rs
//! Bundled prompt document, used to seed the first admin configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::model::ConfigUpdate;
use crate::store::CatalogStore;

/// Compiled into the binary so a fresh deployment always has working prompts.
pub const BUNDLED_PROMPTS: &str = include_str!("../../config/prompts.json");

#[derive(Debug, Deserialize)]
struct PromptDocument {
    valencia_events: Instruction,
    valencia_events_summary: Instruction,
}

#[derive(Debug, Deserialize)]
struct Instruction {
    instruction: String,
}

/// Configuration seeded from a prompt document: prompts set, everything else empty.
pub fn seed_update_from(doc: &str) -> Result<ConfigUpdate> {
    let doc: PromptDocument = serde_json::from_str(doc).context("parsing prompt document")?;
    Ok(ConfigUpdate {
        events_prompt: doc.valencia_events.instruction,
        summary_prompt: doc.valencia_events_summary.instruction,
        ..ConfigUpdate::default()
    })
}

/// Insert the bundled prompts if no configuration exists yet.
pub fn seed_store(store: &dyn CatalogStore) -> Result<bool> {
    let update = seed_update_from(BUNDLED_PROMPTS)?;
    let seeded = store
        .seed_config(update)
        .context("seeding admin configuration")?;
    if seeded {
        info!("admin configuration seeded from bundled prompts");
    }
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::template::{END_DATE_TOKEN, START_DATE_TOKEN};
    use crate::store::MemoryStore;

    #[test]
    fn bundled_prompts_carry_both_tokens() {
        let upd = seed_update_from(BUNDLED_PROMPTS).unwrap();
        for p in [&upd.events_prompt, &upd.summary_prompt] {
            assert!(p.contains(START_DATE_TOKEN));
            assert!(p.contains(END_DATE_TOKEN));
        }
        assert!(upd.openai_api_key.is_empty());
        assert!(upd.categories.is_empty());
    }

    #[test]
    fn seeding_only_happens_once() {
        let store = MemoryStore::new();
        assert!(seed_store(&store).unwrap());
        store
            .put_config(ConfigUpdate {
                events_prompt: "custom".into(),
                ..ConfigUpdate::default()
            })
            .unwrap();
        assert!(!seed_store(&store).unwrap());
        assert_eq!(store.load_config().unwrap().unwrap().events_prompt, "custom");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(seed_update_from(r#"{"valencia_events":{}}"#).is_err());
    }
}
