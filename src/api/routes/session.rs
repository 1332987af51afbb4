//! Live call session endpoints.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::session::CallMachine;

#[derive(Clone)]
pub struct SessionApiState {
    pub machine: Arc<CallMachine>,
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

pub fn router(state: SessionApiState) -> Router {
    Router::new()
        .route("/status", get(session_status))
        .route("/transcript", get(transcript))
        .route("/text", post(send_text))
        .route("/mute", post(set_muted))
        .with_state(state)
}

async fn session_status(State(state): State<SessionApiState>) -> Json<Value> {
    let session = state.machine.status_handle().get().await;
    Json(json!({
        "status": session.status.as_str(),
        "duration_seconds": session.duration_seconds(),
        "last_error": session.last_error,
    }))
}

async fn transcript(State(state): State<SessionApiState>) -> Json<Value> {
    let segments = state.machine.transcript().snapshot();
    Json(json!({ "segments": segments }))
}

async fn send_text(
    State(state): State<SessionApiState>,
    Json(request): Json<SendTextRequest>,
) -> ApiResult<Json<Value>> {
    state.machine.send_text(&request.message).await?;
    Ok(Json(json!({ "success": true })))
}

async fn set_muted(
    State(state): State<SessionApiState>,
    Json(request): Json<MuteRequest>,
) -> ApiResult<Json<Value>> {
    state.machine.set_muted(request.muted).await?;
    Ok(Json(json!({ "success": true, "muted": request.muted })))
}
