//! Event catalog service, binary entrypoint.
//! Loads settings, opens the store, and serves the Axum router.

use event_catalog::metrics::Metrics;
use event_catalog::{build_state, router, Settings};
use shuttle_axum::ShuttleAxum;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` filters (default `event_catalog=info,warn`); `LOG_FORMAT=json` switches
/// to structured output. A subscriber installed by the runtime wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("event_catalog=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if let Err(e) = installed {
        // the runtime's subscriber stays in charge and receives this line
        debug!(error = %e, "tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::load()?;
    let state = build_state(&settings)?;
    let mut app = router(state);

    match Metrics::init() {
        Ok(metrics) => app = app.merge(metrics.router()),
        Err(e) => warn!(error = %e, "prometheus recorder unavailable; /metrics disabled"),
    }

    info!(db = %settings.storage.db_path, "event catalog ready");
    Ok(app.into())
}
