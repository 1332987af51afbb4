//! REST API server for callflow.
//!
//! Provides HTTP endpoints for:
//! - Onboarding flow control (lead capture, demo selection)
//! - Live call session control (status, transcript, text, mute)
//! - Call history

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::flow::OnboardingFlow;
use crate::session::CallMachine;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use routes::flow::FlowApiState;
use routes::session::SessionApiState;

pub struct ApiServer {
    port: u16,
    flow_state: FlowApiState,
    session_state: SessionApiState,
}

impl ApiServer {
    pub fn new(flow: Arc<OnboardingFlow>, machine: Arc<CallMachine>, config: &Config) -> Self {
        Self {
            port: config.api.port,
            flow_state: FlowApiState { flow },
            session_state: SessionApiState { machine },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            .nest("/flow", routes::flow::router(self.flow_state))
            .nest("/session", routes::session::router(self.session_state))
            .nest("/calls", routes::calls::router())
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                    - Service info");
        info!("  GET  /version             - Version info");
        info!("  GET  /flow                - Current flow step");
        info!("  POST /flow/lead           - Submit contact info");
        info!("  POST /flow/widget/open    - Open the widget demo form");
        info!("  POST /flow/widget/cancel  - Cancel the form, back to menu");
        info!("  POST /flow/widget         - Provision agent and start the call");
        info!("  POST /flow/widget/hangup  - End the call, back to menu");
        info!("  POST /flow/call           - Request an outbound call");
        info!("  GET  /session/status      - Call session status");
        info!("  GET  /session/transcript  - Live transcript");
        info!("  POST /session/text        - Send a text message");
        info!("  POST /session/mute        - Toggle local mute");
        info!("  GET  /calls               - Call history");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "callflow",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "callflow"
    }))
}
