// src/store/memory.rs
//! In-process backend. One lock per collection; a replace holds the write lock
//! for the whole swap.

use std::sync::RwLock;

use super::{CatalogStore, StoreError};
use crate::model::{ConfigUpdate, Configuration, Event, Summary};

#[derive(Debug, Default)]
pub struct MemoryStore {
    config: RwLock<Option<Configuration>>,
    events: RwLock<Vec<Event>>,
    summary: RwLock<Option<Summary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryStore {
    fn load_config(&self) -> Result<Option<Configuration>, StoreError> {
        let g = self.config.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.clone())
    }

    fn put_config(&self, update: ConfigUpdate) -> Result<Configuration, StoreError> {
        let mut g = self.config.write().map_err(|_| StoreError::Poisoned)?;
        let next = Configuration::from_update(update, g.as_ref());
        *g = Some(next.clone());
        Ok(next)
    }

    fn seed_config(&self, update: ConfigUpdate) -> Result<bool, StoreError> {
        let mut g = self.config.write().map_err(|_| StoreError::Poisoned)?;
        if g.is_some() {
            return Ok(false);
        }
        *g = Some(Configuration::from_update(update, None));
        Ok(true)
    }

    fn replace_events(&self, events: Vec<Event>) -> Result<(), StoreError> {
        let mut g = self.events.write().map_err(|_| StoreError::Poisoned)?;
        *g = events;
        Ok(())
    }

    fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let g = self.events.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.clone())
    }

    fn event_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let g = self.events.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.iter().find(|e| e.id == id).cloned())
    }

    fn events_on(&self, date: &str) -> Result<Vec<Event>, StoreError> {
        let g = self.events.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.iter().filter(|e| e.date == date).cloned().collect())
    }

    fn replace_summary(&self, summary: Summary) -> Result<(), StoreError> {
        let mut g = self.summary.write().map_err(|_| StoreError::Poisoned)?;
        *g = Some(summary);
        Ok(())
    }

    fn summaries(&self) -> Result<Vec<Summary>, StoreError> {
        let g = self.summary.read().map_err(|_| StoreError::Poisoned)?;
        Ok(g.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[test]
    fn replace_events_swaps_whole_collection() {
        contract::replace_events_swaps_whole_collection(&MemoryStore::new());
    }

    #[test]
    fn events_keep_order_and_filter_by_date() {
        contract::events_keep_order_and_filter_by_date(&MemoryStore::new());
    }

    #[test]
    fn summary_is_singleton() {
        contract::summary_is_singleton(&MemoryStore::new());
    }

    #[test]
    fn concurrent_replace_is_never_observed_half_done() {
        contract::concurrent_replace_is_never_observed_half_done(&MemoryStore::new());
    }

    #[test]
    fn config_replace_and_seed() {
        contract::config_replace_and_seed(&MemoryStore::new());
    }
}
