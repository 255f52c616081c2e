// src/chat.rs
//! Chat invoker: the single outbound call of the ingestion pipeline.
//!
//! The invoker returns the provider's raw reply body untouched; unwrapping the
//! envelope is the pipeline's job, so any client returning plain text works too.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::settings::AiSettings;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },
    #[error("{0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait ChatInvoker: Send + Sync {
    /// Send `prompt` as a single user turn, authenticated with `credential`.
    async fn invoke(&self, credential: &str, prompt: &str) -> Result<String, ChatError>;
    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub type SharedInvoker = Arc<dyn ChatInvoker>;

/// Factory:
/// * `test_mode == "mock"` → [`MockInvoker`] replying with an empty event list
/// * `test_mode == "error"` → [`FailingInvoker`]
/// * otherwise the OpenAI Responses client
pub fn build_invoker(settings: &AiSettings) -> Result<SharedInvoker, ChatError> {
    match settings.test_mode.as_deref() {
        Some("mock") => Ok(Arc::new(MockInvoker::new(MockInvoker::EMPTY_ENVELOPE))),
        Some("error") => Ok(Arc::new(FailingInvoker)),
        _ => Ok(Arc::new(OpenAiInvoker::new(settings)?)),
    }
}

/// OpenAI Responses API (`POST {base_url}/responses`).
pub struct OpenAiInvoker {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiInvoker {
    pub fn new(settings: &AiSettings) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("event-catalog/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ChatInvoker for OpenAiInvoker {
    async fn invoke(&self, credential: &str, prompt: &str) -> Result<String, ChatError> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a str,
        }

        let resp = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(credential)
            .json(&Req {
                model: &self.model,
                input: prompt,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Replies with a fixed body. Used by `AI_TEST_MODE=mock` and tests.
#[derive(Debug, Clone)]
pub struct MockInvoker {
    reply: String,
}

impl MockInvoker {
    pub const EMPTY_ENVELOPE: &'static str =
        r#"{"output":[{"type":"message","content":[{"type":"output_text","text":"[]"}]}]}"#;

    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait::async_trait]
impl ChatInvoker for MockInvoker {
    async fn invoke(&self, _credential: &str, _prompt: &str) -> Result<String, ChatError> {
        Ok(self.reply.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Always fails. Used by `AI_TEST_MODE=error`.
pub struct FailingInvoker;

#[async_trait::async_trait]
impl ChatInvoker for FailingInvoker {
    async fn invoke(&self, _credential: &str, _prompt: &str) -> Result<String, ChatError> {
        Err(ChatError::Unavailable("provider disabled (test mode)".to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_honours_test_mode() {
        let mut s = AiSettings {
            test_mode: Some("mock".into()),
            ..AiSettings::default()
        };
        let mock = build_invoker(&s).unwrap();
        assert_eq!(mock.provider_name(), "mock");
        assert_eq!(
            mock.invoke("k", "p").await.unwrap(),
            MockInvoker::EMPTY_ENVELOPE
        );

        s.test_mode = Some("error".into());
        let failing = build_invoker(&s).unwrap();
        assert!(failing.invoke("k", "p").await.is_err());

        s.test_mode = None;
        assert_eq!(build_invoker(&s).unwrap().provider_name(), "openai");
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_http_error() {
        let s = AiSettings {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            ..AiSettings::default()
        };
        let inv = OpenAiInvoker::new(&s).unwrap();
        let err = inv.invoke("sk-test", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Http(_)));
    }
}
