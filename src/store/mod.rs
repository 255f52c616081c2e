// src/store/mod.rs
//! Catalog persistence: the singleton configuration plus the two replace-all
//! collections (events, summary).
//!
//! Backends guarantee that a replace is observed as a single step: readers see
//! either the previous collection or the new one, never an empty gap.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::model::{ConfigUpdate, Configuration, Event, Summary};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("encoding: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub trait CatalogStore: Send + Sync {
    fn load_config(&self) -> Result<Option<Configuration>, StoreError>;

    /// Replace the configuration wholesale. Keeps the id, bumps the version.
    fn put_config(&self, update: ConfigUpdate) -> Result<Configuration, StoreError>;

    /// Insert `update` only when no configuration exists. Returns whether it was inserted.
    fn seed_config(&self, update: ConfigUpdate) -> Result<bool, StoreError>;

    /// Swap the whole event collection for `events`, keeping their order.
    fn replace_events(&self, events: Vec<Event>) -> Result<(), StoreError>;

    fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    fn event_by_id(&self, id: &str) -> Result<Option<Event>, StoreError>;

    fn events_on(&self, date: &str) -> Result<Vec<Event>, StoreError>;

    /// Swap the summary collection for the single `summary`.
    fn replace_summary(&self, summary: Summary) -> Result<(), StoreError>;

    fn summaries(&self) -> Result<Vec<Summary>, StoreError>;
}

pub type SharedStore = Arc<dyn CatalogStore>;

/// Stamp ids/timestamps, bound text lengths, then replace the event collection.
/// Returns the records as persisted.
pub fn replace_all_events(
    store: &dyn CatalogStore,
    mut events: Vec<Event>,
) -> Result<Vec<Event>, StoreError> {
    let now = Utc::now();
    for ev in events.iter_mut() {
        if ev.stamp(now) {
            warn!(title = %ev.title, "event description truncated");
        }
    }
    store.replace_events(events.clone())?;
    Ok(events)
}

pub fn replace_all_summary(
    store: &dyn CatalogStore,
    mut summary: Summary,
) -> Result<Summary, StoreError> {
    if summary.stamp(Utc::now()) {
        warn!("summary text truncated");
    }
    store.replace_summary(summary.clone())?;
    Ok(summary)
}
