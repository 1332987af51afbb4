//! Onboarding flow endpoints.
//!
//! The embedding UI drives the funnel through these routes; all gating and
//! state transitions live in the `OnboardingFlow` controller.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::error::ApiResult;
use crate::flow::{ContactInfo, DemoRequest, FlowStep, OnboardingFlow};

#[derive(Clone)]
pub struct FlowApiState {
    pub flow: Arc<OnboardingFlow>,
}

pub fn router(state: FlowApiState) -> Router {
    Router::new()
        .route("/", get(flow_state))
        .route("/lead", post(submit_lead))
        .route("/widget/open", post(open_widget_form))
        .route("/widget/cancel", post(cancel_widget_form))
        .route("/widget", post(submit_widget_form))
        .route("/widget/hangup", post(hang_up))
        .route("/call", post(request_call))
        .with_state(state)
}

async fn flow_state(State(state): State<FlowApiState>) -> Json<Value> {
    let snapshot = state.flow.snapshot().await;
    Json(json!({
        "step": snapshot.step.as_str(),
        "message": snapshot.message,
    }))
}

async fn submit_lead(
    State(state): State<FlowApiState>,
    Json(contact): Json<ContactInfo>,
) -> ApiResult<Json<Value>> {
    state.flow.submit_lead(contact).await?;
    Ok(Json(json!({
        "success": true,
        "step": state.flow.step().await.as_str(),
    })))
}

async fn open_widget_form(State(state): State<FlowApiState>) -> ApiResult<Json<Value>> {
    state.flow.open_widget_form().await?;
    Ok(Json(json!({ "success": true, "step": FlowStep::WidgetForm.as_str() })))
}

async fn cancel_widget_form(State(state): State<FlowApiState>) -> ApiResult<Json<Value>> {
    state.flow.cancel_widget_form().await?;
    Ok(Json(json!({ "success": true, "step": FlowStep::Menu.as_str() })))
}

async fn submit_widget_form(
    State(state): State<FlowApiState>,
    Json(request): Json<DemoRequest>,
) -> ApiResult<Json<Value>> {
    info!("Widget demo requested for {}", request.website_url);
    state.flow.submit_widget_form(request).await?;
    Ok(Json(json!({
        "success": true,
        "step": state.flow.step().await.as_str(),
    })))
}

async fn hang_up(State(state): State<FlowApiState>) -> ApiResult<Json<Value>> {
    state.flow.hang_up().await?;
    Ok(Json(json!({ "success": true, "step": FlowStep::Menu.as_str() })))
}

/// Kick off the outbound-call path. The controller holds the Calling step
/// for its minimum display duration, so the work runs in the background and
/// the response returns immediately.
async fn request_call(State(state): State<FlowApiState>) -> ApiResult<Json<Value>> {
    let flow = state.flow.clone();
    tokio::spawn(async move {
        if let Err(e) = flow.request_call().await {
            error!("Outbound call request failed: {e:#}");
        }
    });

    // Small delay so the returned snapshot reflects the transition.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    let snapshot = state.flow.snapshot().await;
    Ok(Json(json!({
        "success": true,
        "step": snapshot.step.as_str(),
        "message": snapshot.message,
    })))
}
