// src/api.rs
//! HTTP surface: public catalog reads under `/api`, operator endpoints under
//! `/api/admin` (bearer token checked through [`crate::auth::AdminPolicy`]).

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::request::Parts,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::auth::{bearer_token, SharedPolicy};
use crate::chat::SharedInvoker;
use crate::error::ApiError;
use crate::model::{ConfigUpdate, Configuration, Event, Summary};
use crate::pipeline::parse::parse_events;
use crate::pipeline::{DateOverride, Pipeline};
use crate::store::{self, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub pipeline: Pipeline,
    pub policy: SharedPolicy,
}

impl AppState {
    pub fn new(store: SharedStore, invoker: SharedInvoker, policy: SharedPolicy) -> Self {
        Self {
            pipeline: Pipeline::new(store.clone(), invoker),
            store,
            policy,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/login", post(login))
        .route("/config", get(get_config).put(put_config))
        .route("/generate-events", post(generate_events))
        .route("/generate-summary", post(generate_summary))
        .route("/upload-events", post(upload_events));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(get_event))
        .route("/api/events/date/{date}", get(events_on_date))
        .route("/api/summaries", get(list_summaries))
        .route("/api/summaries/latest", get(latest_summary))
        .nest("/api/admin", admin)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Extractor guard for operator endpoints.
pub struct Admin;

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers) {
            Some(token) if state.policy.authorize(token) => Ok(Admin),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

fn json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidRequest(format!("malformed JSON body: {e}")))
}

fn check_date(field: &str, value: Option<&str>) -> Result<(), ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if NaiveDate::parse_from_str(v, "%Y-%m-%d").is_err() => Err(
            ApiError::InvalidRequest(format!("{field} must be an ISO date (YYYY-MM-DD)")),
        ),
        _ => Ok(()),
    }
}

// ---- public ----

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now().to_rfc3339() }))
}

async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.store.list_events()?))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    state
        .store
        .event_by_id(&id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Event"))
}

async fn events_on_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.store.events_on(&date)?))
}

async fn list_summaries(State(state): State<AppState>) -> Result<Json<Vec<Summary>>, ApiError> {
    Ok(Json(state.store.summaries()?))
}

async fn latest_summary(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    state
        .store
        .summaries()?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(ApiError::NotFound("Summary"))
}

// ---- admin ----

#[derive(Debug, Deserialize)]
struct LoginReq {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResp {
    token: String,
}

async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<LoginResp>, ApiError> {
    let req: LoginReq = serde_json::from_slice(&body).map_err(|_| ApiError::Unauthorized)?;
    match state.policy.login(&req.username, &req.password) {
        Some(token) => Ok(Json(LoginResp { token })),
        None => {
            warn!(username = %req.username, "admin login rejected");
            Err(ApiError::Unauthorized)
        }
    }
}

async fn get_config(_: Admin, State(state): State<AppState>) -> Result<Json<Configuration>, ApiError> {
    state
        .store
        .load_config()?
        .map(Json)
        .ok_or(ApiError::NotFound("Admin config"))
}

async fn put_config(
    _: Admin,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Configuration>, ApiError> {
    let update: ConfigUpdate = json_body(&body)?;
    check_date("startDate", Some(update.start_date.as_str()))?;
    check_date("endDate", Some(update.end_date.as_str()))?;
    let stored = state.store.put_config(update)?;
    info!(
        version = stored.version,
        categories = stored.categories.len(),
        key_len = stored.openai_api_key.len(),
        "admin config replaced"
    );
    Ok(Json(stored))
}

fn date_override(body: &Bytes) -> Result<DateOverride, ApiError> {
    let dates: DateOverride = json_body(body)?;
    check_date("start_date", dates.start_date.as_deref())?;
    check_date("end_date", dates.end_date.as_deref())?;
    Ok(dates)
}

async fn generate_events(
    _: Admin,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let dates = date_override(&body)?;
    let events = state.pipeline.generate_events(&dates).await?;
    Ok(Json(json!({
        "message": format!("Generated {} events", events.len()),
        "count": events.len(),
        "events": events,
    })))
}

async fn generate_summary(
    _: Admin,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let dates = date_override(&body)?;
    let summary = state.pipeline.generate_summary(&dates).await?;
    Ok(Json(json!({
        "message": "Summary generated",
        "summary": summary,
    })))
}

async fn upload_events(
    _: Admin,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let text = std::str::from_utf8(&body).map_err(|_| ApiError::InvalidUpload)?;
    let events = parse_events(text).map_err(|e| {
        warn!(error = %e, "rejected events upload");
        ApiError::InvalidUpload
    })?;
    let persisted = store::replace_all_events(state.store.as_ref(), events)?;
    info!(count = persisted.len(), "events uploaded");
    Ok(Json(json!({
        "message": "Events uploaded",
        "count": persisted.len(),
    })))
}
