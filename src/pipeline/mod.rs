// src/pipeline/mod.rs
//! # AI ingestion pipeline
//! Prompt template + dates → chat call → envelope → fences → typed records →
//! replace-all persistence.
//!
//! ```text
//! Idle → ConfigLoaded → PromptRendered → RawReplyReceived → TextExtracted
//!      → FencesStripped → Parsed → Persisted
//! ```
//! Any stage after `Idle` may end in a failure; nothing is retried and nothing is
//! persisted unless parsing succeeded for the whole reply. The one soft path is
//! envelope extraction: when it finds nothing, the raw reply is parsed instead.

pub mod envelope;
pub mod fence;
pub mod parse;
pub mod template;

use std::fmt;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chat::{ChatError, SharedInvoker};
use crate::model::{Configuration, Event, Summary};
use crate::store::{self, SharedStore, StoreError};
use parse::ParseError;

/// Credential value that defers to `$OPENAI_API_KEY`.
pub const ENV_CREDENTIAL: &str = "ENV";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Events,
    Summary,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Events => "events",
            Mode::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ConfigLoaded,
    PromptRendered,
    RawReplyReceived,
    TextExtracted,
    FencesStripped,
    Parsed,
    Persisted,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("admin configuration not found")]
    ConfigMissing,
    #[error("provider credential not configured")]
    CredentialMissing,
    #[error("chat provider call failed: {0}")]
    Provider(#[source] ChatError),
    #[error("invalid response from AI: {0}")]
    InvalidAiResponse(#[source] ParseError),
    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ConfigMissing => "config_missing",
            PipelineError::CredentialMissing => "credential_missing",
            PipelineError::Provider(_) => "provider_error",
            PipelineError::InvalidAiResponse(_) => "invalid_ai_response",
            PipelineError::Persistence(_) => "persistence_error",
        }
    }
}

/// Terminal failure: the last stage reached and why the run stopped there.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {:?})", self.error, self.stage)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Optional request dates. Blank or missing values fall back to the stored range.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateOverride {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl DateOverride {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: Some(start.into()),
            end_date: Some(end.into()),
        }
    }

    fn resolve(&self, cfg: &Configuration) -> (String, String) {
        let pick = |v: &Option<String>, fallback: &str| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        (
            pick(&self.start_date, &cfg.start_date),
            pick(&self.end_date, &cfg.end_date),
        )
    }
}

struct Run {
    mode: Mode,
    stage: Stage,
    started: Instant,
}

impl Run {
    fn start(mode: Mode) -> Self {
        Self {
            mode,
            stage: Stage::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(mode = self.mode.as_str(), from = ?self.stage, to = ?next, "pipeline stage");
        self.stage = next;
    }

    fn fail(&self, error: PipelineError) -> PipelineFailure {
        warn!(
            mode = self.mode.as_str(),
            stage = ?self.stage,
            kind = error.kind(),
            error = %error,
            "pipeline failed"
        );
        counter!("pipeline_runs_total", "mode" => self.mode.as_str(), "outcome" => error.kind())
            .increment(1);
        PipelineFailure {
            stage: self.stage,
            error,
        }
    }

    fn succeed(&mut self) {
        self.advance(Stage::Persisted);
        counter!("pipeline_runs_total", "mode" => self.mode.as_str(), "outcome" => "persisted")
            .increment(1);
        info!(
            mode = self.mode.as_str(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "pipeline persisted"
        );
    }
}

#[derive(Clone)]
pub struct Pipeline {
    store: SharedStore,
    invoker: SharedInvoker,
}

impl Pipeline {
    pub fn new(store: SharedStore, invoker: SharedInvoker) -> Self {
        Self { store, invoker }
    }

    /// Generate the event catalog for the date range and replace the stored one.
    pub async fn generate_events(&self, dates: &DateOverride) -> Result<Vec<Event>, PipelineFailure> {
        let mut run = Run::start(Mode::Events);
        let events = self
            .fetch_and_parse(&mut run, dates, parse::parse_events)
            .await?;

        let persisted = store::replace_all_events(self.store.as_ref(), events)
            .map_err(|e| run.fail(PipelineError::Persistence(e)))?;
        counter!("events_persisted_total").increment(persisted.len() as u64);
        run.succeed();
        Ok(persisted)
    }

    /// Generate the summary for the date range and replace the stored one.
    pub async fn generate_summary(&self, dates: &DateOverride) -> Result<Summary, PipelineFailure> {
        let mut run = Run::start(Mode::Summary);
        let summary = self
            .fetch_and_parse(&mut run, dates, parse::parse_summary)
            .await?;

        let persisted = store::replace_all_summary(self.store.as_ref(), summary)
            .map_err(|e| run.fail(PipelineError::Persistence(e)))?;
        run.succeed();
        Ok(persisted)
    }

    /// Every stage up to and including `Parsed`.
    async fn fetch_and_parse<T>(
        &self,
        run: &mut Run,
        dates: &DateOverride,
        parse: fn(&str) -> Result<T, ParseError>,
    ) -> Result<T, PipelineFailure> {
        let cfg = self
            .store
            .load_config()
            .map_err(|e| run.fail(PipelineError::Persistence(e)))?
            .ok_or_else(|| run.fail(PipelineError::ConfigMissing))?;
        let credential =
            resolve_credential(&cfg.openai_api_key, |k| std::env::var(k).ok())
                .ok_or_else(|| run.fail(PipelineError::CredentialMissing))?;
        run.advance(Stage::ConfigLoaded);

        let (start, end) = dates.resolve(&cfg);
        let tpl = match run.mode {
            Mode::Events => &cfg.events_prompt,
            Mode::Summary => &cfg.summary_prompt,
        };
        let prompt = template::render(tpl, &start, &end);
        info!(
            mode = run.mode.as_str(),
            %start,
            %end,
            prompt_id = %digest(&prompt),
            prompt_len = prompt.len(),
            provider = self.invoker.provider_name(),
            "prompt rendered"
        );
        run.advance(Stage::PromptRendered);

        let t0 = Instant::now();
        let raw = self.invoker.invoke(&credential, &prompt).await;
        histogram!("chat_invoke_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        let raw = raw.map_err(|e| run.fail(PipelineError::Provider(e)))?;
        run.advance(Stage::RawReplyReceived);

        let text = match envelope::extract_text(&raw) {
            Some(t) => t,
            None => {
                debug!(mode = run.mode.as_str(), "no envelope found, using raw reply");
                counter!("envelope_fallback_total").increment(1);
                raw
            }
        };
        run.advance(Stage::TextExtracted);

        let cleaned = fence::strip_fences(&text);
        run.advance(Stage::FencesStripped);

        let parsed = match parse(&cleaned) {
            Ok(v) => v,
            Err(e) => {
                // operator diagnostics only; never persisted
                warn!(
                    mode = run.mode.as_str(),
                    preview = %preview(&cleaned),
                    "unparsable AI reply"
                );
                return Err(run.fail(PipelineError::InvalidAiResponse(e)));
            }
        };
        run.advance(Stage::Parsed);
        Ok(parsed)
    }
}

/// Non-blank credential; `ENV` reads `$OPENAI_API_KEY` through `lookup`.
pub fn resolve_credential<F>(configured: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let configured = configured.trim();
    let key = if configured.eq_ignore_ascii_case(ENV_CREDENTIAL) {
        lookup(ENV_OPENAI_API_KEY)?.trim().to_string()
    } else {
        configured.to_string()
    };
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Short stable id for log lines (first 6 bytes of SHA-256, hex).
pub(crate) fn digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let out = Sha256::digest(text.as_bytes());
    out.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigUpdate;

    #[test]
    fn credential_resolution() {
        let none = |_: &str| None;
        assert_eq!(resolve_credential("sk-1", none).as_deref(), Some("sk-1"));
        assert_eq!(resolve_credential("  ", none), None);
        assert_eq!(resolve_credential("env", none), None);
        assert_eq!(
            resolve_credential("ENV", |k| (k == ENV_OPENAI_API_KEY).then(|| "sk-env".to_string()))
                .as_deref(),
            Some("sk-env")
        );
        assert_eq!(resolve_credential("ENV", |_| Some(" ".to_string())), None);
    }

    #[test]
    fn request_dates_override_stored_range() {
        let cfg = Configuration::from_update(
            ConfigUpdate {
                start_date: "2025-01-01".into(),
                end_date: "2025-01-31".into(),
                ..ConfigUpdate::default()
            },
            None,
        );
        assert_eq!(
            DateOverride::new("2024-02-01", "2024-02-29").resolve(&cfg),
            ("2024-02-01".to_string(), "2024-02-29".to_string())
        );
        let partial = DateOverride {
            start_date: Some(" ".into()),
            end_date: Some("2025-01-10".into()),
        };
        assert_eq!(
            partial.resolve(&cfg),
            ("2025-01-01".to_string(), "2025-01-10".to_string())
        );
        assert_eq!(
            DateOverride::default().resolve(&cfg),
            ("2025-01-01".to_string(), "2025-01-31".to_string())
        );
    }

    #[test]
    fn digest_is_short_and_stable() {
        assert_eq!(digest("abc"), digest("abc"));
        assert_eq!(digest("abc").len(), 12);
        assert_ne!(digest("abc"), digest("abd"));
    }

    #[test]
    fn preview_is_bounded() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(PREVIEW_CHARS + 1);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
    }
}
