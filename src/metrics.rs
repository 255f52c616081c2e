use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

// The global recorder can only be installed once per process.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (first call only) and describe pipeline series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe_counter!("pipeline_runs_total", "Pipeline runs by mode and outcome");
                describe_counter!("events_persisted_total", "Events written by replace-all");
                describe_counter!(
                    "envelope_fallback_total",
                    "Replies parsed raw because no envelope text was found"
                );
                describe_histogram!("chat_invoke_ms", "Chat provider call latency in milliseconds");
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
