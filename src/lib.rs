// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod store;

pub use crate::api::{router, AppState};
pub use crate::config::Settings;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::SharedSecretPolicy;
use crate::store::{MemoryStore, SharedStore, SqliteStore};

/// Sentinel `db_path` selecting the in-process store.
pub const MEMORY_DB_PATH: &str = ":memory:";

/// Open the configured store, seed prompts on first run, and wire the pipeline.
pub fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let store = open_store(&settings.storage.db_path)?;
    config::prompts::seed_store(store.as_ref())?;

    let invoker = chat::build_invoker(&settings.ai).context("building chat invoker")?;
    info!(
        provider = invoker.provider_name(),
        model = %settings.ai.model,
        "chat invoker ready"
    );
    let policy = Arc::new(SharedSecretPolicy::new(&settings.admin));
    Ok(AppState::new(store, invoker, policy))
}

/// Convenience for tests and embedding: state plus router in one step.
pub fn app(settings: &Settings) -> anyhow::Result<axum::Router> {
    Ok(router(build_state(settings)?))
}

fn open_store(db_path: &str) -> anyhow::Result<SharedStore> {
    if db_path == MEMORY_DB_PATH {
        info!("using in-memory catalog store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    if let Some(dir) = Path::new(db_path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display()))?;
    }
    let store = SqliteStore::open(db_path).with_context(|| format!("opening database {db_path}"))?;
    info!(path = %db_path, "sqlite catalog store opened");
    Ok(Arc::new(store))
}
