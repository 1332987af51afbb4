//! Automatic call resumption after a restart or transient drop.
//!
//! If a persisted call identity exists while no session is live, one resume
//! request is issued against the backend. The attempt is bounded by a hard
//! timeout, and any failure clears the persisted identity so the user lands
//! back in the normal idle state rather than a stuck spinner.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::provision::ProvisioningClient;
use crate::session::{CallMachine, SessionStatus};
use crate::store::SessionStore;

pub struct ReconnectManager {
    store: Arc<SessionStore>,
    provisioning: Arc<dyn ProvisioningClient>,
    machine: Arc<CallMachine>,
    resume_timeout: Duration,
}

impl ReconnectManager {
    pub fn new(
        store: Arc<SessionStore>,
        provisioning: Arc<dyn ProvisioningClient>,
        machine: Arc<CallMachine>,
        resume_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provisioning,
            machine,
            resume_timeout,
        }
    }

    /// Attempt to rejoin a previously interrupted call.
    ///
    /// Issues at most one resume request. Returns true if a session was
    /// re-established; false means there was nothing to resume or the
    /// attempt failed and the persisted identity was cleared.
    pub async fn resume_if_needed(&self) -> Result<bool> {
        let Some(call) = self.store.call() else {
            debug!("No persisted call identity; nothing to resume");
            return Ok(false);
        };

        // A call may already be active (e.g. a second init); leave it alone.
        if self.machine.status_handle().status().await != SessionStatus::Disconnected
            || !self.machine.is_idle().await
        {
            debug!("Session already live; skipping resume");
            return Ok(false);
        }

        let Some(agent) = self.store.agent() else {
            warn!("Persisted call {} has no agent handle; clearing", call.call_id);
            self.clear_persisted();
            return Ok(false);
        };

        info!("Attempting to resume call {}", call.call_id);

        let identity = match timeout(
            self.resume_timeout,
            self.provisioning.resume_call(&agent, &call.call_id),
        )
        .await
        {
            Ok(Ok(identity)) => identity,
            Ok(Err(e)) => {
                warn!("Resume request failed: {e:#}");
                self.clear_persisted();
                return Ok(false);
            }
            Err(_) => {
                warn!(
                    "Resume request timed out after {}s",
                    self.resume_timeout.as_secs()
                );
                self.clear_persisted();
                return Ok(false);
            }
        };

        // Keep audio muted until the user re-engages.
        self.machine.set_resume_muted();

        let agent_name = self.store.demo().map(|d| d.agent_name);
        if let Err(e) = self.machine.start(identity, agent_name).await {
            warn!("Failed to rejoin resumed call: {e:#}");
            self.clear_persisted();
            return Ok(false);
        }

        info!("Call {} resumed", call.call_id);
        Ok(true)
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.clear_call() {
            warn!("Failed to clear persisted call identity: {e:#}");
        }
    }
}
