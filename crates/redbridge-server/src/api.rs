//! REST handlers and wire types.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use redbridge_core::actions::Action;
use redbridge_core::agent::AgentKind;
use redbridge_core::game::GameSnapshot;
use redbridge_core::replay::{Replay, ReplayError};
use redbridge_core::session::SessionMeta;

use crate::AppState;
use crate::registry::RegistryError;

pub const CONTROL_TOKEN_HEADER: &str = "x-control-token";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized,
    Full(String),
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            RegistryError::BadToken => ApiError::Unauthorized,
            RegistryError::Full { .. } => ApiError::Full(e.to_string()),
            RegistryError::Driver(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ReplayError> for ApiError {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "control token rejected".to_string())
            }
            ApiError::Full(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub agent_kind: AgentKind,
    pub wait_frames: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub control_token: String,
    pub meta: SessionMeta,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionMeta>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    pub meta: SessionMeta,
    pub step: u64,
    pub snapshot: GameSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub action: Action,
    pub wait_frames: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub step: u64,
    pub snapshot: GameSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SwitchAgentRequest {
    pub agent_kind: AgentKind,
}

#[derive(Debug, Serialize)]
pub struct SwitchAgentResponse {
    pub control_token: String,
}

#[derive(Debug, Serialize)]
pub struct CloseSessionResponse {
    pub replay_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct PokeRequest {
    pub addr: u16,
    pub value: u8,
}

#[derive(Debug, Serialize)]
pub struct ReplayListResponse {
    pub replays: Vec<String>,
}

pub async fn healthz() -> &'static str {
    "ok\n"
}

pub async fn readyz() -> StatusCode {
    StatusCode::OK
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let created = state
        .registry
        .create_session(req.agent_kind, req.wait_frames)
        .await?;
    Ok(Json(CreateSessionResponse {
        session_id: created.meta.session_id.clone(),
        control_token: created.control_token,
        meta: created.meta,
    }))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.registry.list().await,
    })
}

pub async fn session_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let meta = state.registry.meta(&id).await?;
    let latest = state.registry.latest(&id).await?;
    Ok(Json(SessionDetailResponse {
        meta,
        step: latest.step,
        snapshot: latest.snapshot,
    }))
}

pub async fn step_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let token = control_token(&headers)?;
    let outcome = state
        .registry
        .step(&id, token, req.action, req.wait_frames)
        .await?;
    Ok(Json(StepResponse {
        step: outcome.step,
        snapshot: outcome.snapshot,
    }))
}

pub async fn switch_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SwitchAgentRequest>,
) -> Result<Json<SwitchAgentResponse>, ApiError> {
    let token = control_token(&headers)?;
    let control_token = state
        .registry
        .switch_agent(&id, token, req.agent_kind)
        .await?;
    Ok(Json(SwitchAgentResponse { control_token }))
}

pub async fn session_frame(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let latest = state.registry.latest(&id).await?;
    Ok((
        [(header::CONTENT_TYPE, "image/png")],
        latest.frame_png,
    )
        .into_response())
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CloseSessionResponse>, ApiError> {
    let token = control_token(&headers)?;
    let replay_path = state.registry.close(&id, token).await?;
    Ok(Json(CloseSessionResponse {
        replay_available: replay_path.is_some(),
    }))
}

pub async fn poke_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PokeRequest>,
) -> Result<StatusCode, ApiError> {
    state.registry.poke(&id, req.addr, req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_replays(
    State(state): State<AppState>,
) -> Result<Json<ReplayListResponse>, ApiError> {
    let replays = state.replays.list()?;
    Ok(Json(ReplayListResponse { replays }))
}

pub async fn get_replay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Replay>, ApiError> {
    Ok(Json(state.replays.load(&id)?))
}

fn control_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(CONTROL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)
}
