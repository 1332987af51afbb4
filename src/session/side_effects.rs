//! Coordinated actions on call lifecycle transitions.
//!
//! Everything here is a consequence of a status change the machine has
//! already decided on; failures are logged and never reverse a transition.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{self, calls::CallRepository};
use crate::provision::{EndCallRequest, ProvisioningClient};
use crate::session::CallIdentity;
use crate::store::{PersistedCall, SessionStore};

pub struct SideEffects {
    store: Arc<SessionStore>,
    provisioning: Arc<dyn ProvisioningClient>,
    record_history: bool,
}

impl SideEffects {
    pub fn new(store: Arc<SessionStore>, provisioning: Arc<dyn ProvisioningClient>) -> Self {
        Self {
            store,
            provisioning,
            record_history: false,
        }
    }

    /// Enable SQLite call-history writes (disabled in tests).
    pub fn with_history(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    /// A call was requested and the session opened: persist the identity so
    /// an interrupted call can be resumed after a restart.
    pub async fn call_started(&self, identity: &CallIdentity, agent_name: Option<&str>) {
        if let Err(e) = self.store.save_call(&PersistedCall {
            call_id: identity.call_id.clone(),
            call_session_id: identity.call_session_id.clone(),
        }) {
            warn!("Failed to persist call identity: {e:#}");
        }

        if self.record_history {
            match db::init_db() {
                Ok(conn) => {
                    if let Err(e) = CallRepository::insert(
                        &conn,
                        &identity.call_id,
                        &identity.call_session_id,
                        agent_name,
                    ) {
                        warn!("Failed to record call start: {e:#}");
                    }
                }
                Err(e) => warn!("Call history unavailable: {e:#}"),
            }
        }
    }

    /// The session reached Connected.
    pub async fn call_connected(&self, identity: &CallIdentity) {
        debug!("Call {} connected", identity.call_id);

        if self.record_history {
            if let Ok(conn) = db::init_db() {
                if let Err(e) = CallRepository::mark_connected(&conn, &identity.call_id) {
                    warn!("Failed to record call connection: {e:#}");
                }
            }
        }
    }

    /// The call was stopped: notify the backend, store the transcript in the
    /// history, and forget the persisted identity.
    pub async fn call_ended(&self, identity: &CallIdentity, transcript_text: &str) {
        if let Some(agent) = self.store.agent() {
            let request = EndCallRequest {
                call_session_id: identity.call_session_id.clone(),
                call_id: identity.call_id.clone(),
                schema_name: agent.schema_name,
            };
            if let Err(e) = self.provisioning.end_call_session(&request).await {
                warn!("End-call notification failed (ignored): {e:#}");
            }
        } else {
            debug!("No agent handle persisted; skipping end-call notification");
        }

        if self.record_history {
            if let Ok(conn) = db::init_db() {
                if let Err(e) = CallRepository::complete(&conn, &identity.call_id, transcript_text)
                {
                    warn!("Failed to record call end: {e:#}");
                }
            }
        }

        match self.store.clear_call() {
            Ok(true) => info!("Cleared persisted identity for call {}", identity.call_id),
            Ok(false) => {}
            Err(e) => warn!("Failed to clear persisted call identity: {e:#}"),
        }
    }
}
