// src/error.rs
//! HTTP-facing error taxonomy. Bodies are `{"error": <category>, "detail": <message>}`;
//! internal payloads and provider text never leave the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::{PipelineError, PipelineFailure};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid events file")]
    InvalidUpload,
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) | ApiError::InvalidUpload => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(f) => match f.error {
                PipelineError::ConfigMissing
                | PipelineError::CredentialMissing
                | PipelineError::InvalidAiResponse(_) => StatusCode::BAD_REQUEST,
                PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
                PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "auth_failure",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::InvalidUpload => "invalid_events_file",
            ApiError::Pipeline(f) => f.error.kind(),
            ApiError::Store(_) => "persistence_error",
        }
    }

    /// Short operator-facing message; never includes underlying error text.
    fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized => "Invalid credentials or token".to_string(),
            ApiError::NotFound(what) => format!("{what} not found"),
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::InvalidUpload => "Invalid events file".to_string(),
            ApiError::Pipeline(f) => match f.error {
                PipelineError::ConfigMissing => "Admin config not found".to_string(),
                PipelineError::CredentialMissing => "OpenAI API key not configured".to_string(),
                PipelineError::Provider(_) => "AI provider call failed".to_string(),
                PipelineError::InvalidAiResponse(_) => "Invalid response from AI".to_string(),
                PipelineError::Persistence(_) => "Storage failure".to_string(),
            },
            ApiError::Store(_) => "Storage failure".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(e) = &self {
            tracing::error!(error = %e, "store error");
        }
        let body = ErrorBody {
            error: self.category(),
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::ParseError;
    use crate::pipeline::Stage;

    fn failure(error: PipelineError, stage: Stage) -> ApiError {
        ApiError::Pipeline(PipelineFailure { stage, error })
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            failure(PipelineError::ConfigMissing, Stage::Idle).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            failure(PipelineError::InvalidAiResponse(ParseError::Empty), Stage::FencesStripped)
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            failure(
                PipelineError::Persistence(StoreError::Poisoned),
                Stage::Parsed
            )
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn categories_name_the_problem() {
        assert_eq!(
            failure(PipelineError::CredentialMissing, Stage::Idle).category(),
            "credential_missing"
        );
        assert_eq!(ApiError::InvalidUpload.category(), "invalid_events_file");
        assert_eq!(
            ApiError::Store(StoreError::Poisoned).category(),
            "persistence_error"
        );
    }
}
