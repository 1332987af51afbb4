use crate::api::ApiServer;
use crate::config::Config;
use crate::flow::{FlowOptions, OnboardingFlow};
use crate::provision::{HttpProvisioningClient, ProvisioningClient, WebhookLeadNotifier};
use crate::reconnect::ReconnectManager;
use crate::session::{
    CallMachine, LoopbackConnector, MediaConnector, SessionStatusHandle, SideEffects,
};
use crate::store::SessionStore;
use crate::transcript::TranscriptLog;
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting callflow service");

    let config = Config::load()?;

    let store = Arc::new(SessionStore::open_default()?);
    let provisioning: Arc<dyn ProvisioningClient> =
        Arc::new(HttpProvisioningClient::new(&config.backend.base_url));
    let lead_notifier = Arc::new(WebhookLeadNotifier::new(&config.backend.lead_webhook_url));
    let connector = build_connector(&config)?;

    let effects = Arc::new(SideEffects::new(store.clone(), provisioning.clone()).with_history(true));
    let machine = Arc::new(CallMachine::new(
        connector,
        effects,
        SessionStatusHandle::default(),
        TranscriptLog::new(),
    ));

    // Rejoin an interrupted call before the UI comes up; failure just lands
    // us in the normal idle state.
    let reconnect = ReconnectManager::new(
        store.clone(),
        provisioning.clone(),
        machine.clone(),
        Duration::from_secs(config.session.resume_timeout_seconds),
    );
    match reconnect.resume_if_needed().await {
        Ok(true) => info!("Resumed a previously interrupted call"),
        Ok(false) => {}
        Err(e) => warn!("Resume attempt failed: {e:#}"),
    }

    let flow = Arc::new(OnboardingFlow::new(
        store,
        provisioning,
        lead_notifier,
        machine.clone(),
        FlowOptions::from_config(&config),
    ));

    let api_server = ApiServer::new(flow, machine, &config);

    info!("callflow is ready!");
    api_server.start().await
}

fn build_connector(config: &Config) -> Result<Arc<dyn MediaConnector>> {
    match config.session.connector.as_str() {
        "loopback" => Ok(Arc::new(LoopbackConnector::new())),
        other => bail!("Unknown media connector: {other}"),
    }
}
