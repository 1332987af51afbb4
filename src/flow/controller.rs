//! Onboarding flow controller.
//!
//! One parameterized state machine for the whole funnel: contact capture
//! gates the menu, the menu routes to the widget path or the outbound-call
//! path, and re-entering the menu always clears in-progress call state.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::provision::{
    CreateRoomRequest, LeadNotifier, ProvisioningClient, StartDemoRequest, TriggerCallRequest,
};
use crate::session::CallMachine;
use crate::store::SessionStore;

use super::validate::{validate_contact, validate_demo};
use super::{ContactInfo, DemoConfig, DemoRequest, FlowStep};

const TRY_AGAIN_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub default_agent_name: String,
    pub default_personality: String,
    pub room_provider: String,
    /// Minimum time the Calling step stays visible after a successful
    /// outbound request, so the user can read the status message.
    pub calling_success_display: Duration,
    pub calling_failure_display: Duration,
}

impl FlowOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_agent_name: config.agent.default_name.clone(),
            default_personality: config.agent.default_personality.clone(),
            room_provider: config.agent.provider.clone(),
            calling_success_display: Duration::from_millis(
                config.session.calling_success_display_ms,
            ),
            calling_failure_display: Duration::from_millis(
                config.session.calling_failure_display_ms,
            ),
        }
    }
}

/// Current flow state as rendered by the UI.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub step: FlowStep,
    pub message: Option<String>,
}

struct FlowState {
    step: FlowStep,
    message: Option<String>,
}

pub struct OnboardingFlow {
    store: Arc<SessionStore>,
    provisioning: Arc<dyn ProvisioningClient>,
    lead_notifier: Arc<dyn LeadNotifier>,
    machine: Arc<CallMachine>,
    options: FlowOptions,
    state: Mutex<FlowState>,
}

impl OnboardingFlow {
    pub fn new(
        store: Arc<SessionStore>,
        provisioning: Arc<dyn ProvisioningClient>,
        lead_notifier: Arc<dyn LeadNotifier>,
        machine: Arc<CallMachine>,
        options: FlowOptions,
    ) -> Self {
        // Lead capture is permanently skippable once a contact is persisted:
        // cold starts land on the menu, never back on the lead form.
        let initial = if store.lead_complete() {
            FlowStep::Menu
        } else {
            FlowStep::Lead
        };

        Self {
            store,
            provisioning,
            lead_notifier,
            machine,
            options,
            state: Mutex::new(FlowState {
                step: initial,
                message: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let state = self.state.lock().await;
        FlowSnapshot {
            step: state.step,
            message: state.message.clone(),
        }
    }

    pub async fn step(&self) -> FlowStep {
        self.state.lock().await.step
    }

    async fn set_state(&self, step: FlowStep, message: Option<String>) {
        let mut state = self.state.lock().await;
        state.step = step;
        state.message = message;
    }

    async fn require_step(&self, expected: FlowStep) -> Result<()> {
        let current = self.state.lock().await.step;
        if current != expected {
            bail!(
                "Operation requires step {} (currently {})",
                expected.as_str(),
                current.as_str()
            );
        }
        Ok(())
    }

    /// Capture and persist the visitor's contact, then unlock the menu.
    pub async fn submit_lead(&self, contact: ContactInfo) -> Result<()> {
        self.require_step(FlowStep::Lead).await?;
        validate_contact(&contact)?;

        self.store
            .save_contact(&contact)
            .context("Failed to persist contact")?;

        // Best-effort; a webhook outage never blocks the visitor.
        if let Err(e) = self.lead_notifier.notify(&contact).await {
            warn!("Lead webhook failed (ignored): {e:#}");
        }

        info!("Lead captured for {}", contact.email);
        self.set_state(FlowStep::Menu, None).await;
        Ok(())
    }

    pub async fn open_widget_form(&self) -> Result<()> {
        self.require_step(FlowStep::Menu).await?;
        self.set_state(FlowStep::WidgetForm, None).await;
        Ok(())
    }

    pub async fn cancel_widget_form(&self) -> Result<()> {
        self.require_step(FlowStep::WidgetForm).await?;
        self.return_to_menu().await;
        Ok(())
    }

    /// Provision an agent for the submitted website, obtain join credentials,
    /// and start the live call.
    pub async fn submit_widget_form(&self, request: DemoRequest) -> Result<()> {
        self.require_step(FlowStep::WidgetForm).await?;
        validate_demo(&request)?;

        let demo = self.fill_defaults(request);
        self.store
            .save_demo(&demo)
            .context("Failed to persist demo config")?;

        match self.provision_and_start(&demo).await {
            Ok(()) => {
                self.set_state(FlowStep::WidgetActive, None).await;
                Ok(())
            }
            Err(e) => {
                error!("Failed to start widget demo: {e:#}");
                // Back to the form: stable and re-triable, never a dead end.
                self.set_state(FlowStep::WidgetForm, Some(TRY_AGAIN_MESSAGE.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// End the live call and return to the menu.
    pub async fn hang_up(&self) -> Result<()> {
        if let Err(e) = self.machine.stop().await {
            warn!("Hang-up stop failed: {e:#}");
        }
        self.set_state(FlowStep::Menu, None).await;
        Ok(())
    }

    /// Request an outbound call to the captured lead phone number.
    ///
    /// Holds the Calling step for a minimum display duration after the
    /// request resolves, then returns to the menu regardless of outcome.
    pub async fn request_call(&self) -> Result<()> {
        self.require_step(FlowStep::Menu).await?;
        let Some(contact) = self.store.contact() else {
            bail!("No contact captured");
        };

        self.set_state(
            FlowStep::Calling,
            Some(format!("Calling {}...", contact.phone)),
        )
        .await;

        let agent = self.store.agent();
        let request = TriggerCallRequest {
            phone_number: contact.phone.clone(),
            agent_code: agent.as_ref().map(|a| a.agent_code.clone()),
            schema_name: agent.map(|a| a.schema_name),
            name: Some(contact.name),
            email: Some(contact.email),
        };

        let display = match self.provisioning.trigger_call(&request).await {
            Ok(()) => {
                self.set_message("Call initiated! Check your phone.").await;
                self.options.calling_success_display
            }
            Err(e) => {
                warn!("Failed to trigger outbound call: {e:#}");
                self.set_message("Failed to initiate call. Please try again.")
                    .await;
                self.options.calling_failure_display
            }
        };

        tokio::time::sleep(display).await;
        self.return_to_menu().await;
        Ok(())
    }

    async fn set_message(&self, message: &str) {
        self.state.lock().await.message = Some(message.to_string());
    }

    async fn return_to_menu(&self) {
        // Re-entering the menu always clears in-progress call state.
        if let Err(e) = self.machine.stop().await {
            warn!("Failed to clear call state on menu return: {e:#}");
        }
        self.set_state(FlowStep::Menu, None).await;
    }

    fn fill_defaults(&self, request: DemoRequest) -> DemoConfig {
        let agent_name = request
            .agent_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.options.default_agent_name.clone());
        let company_name = request
            .company_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| request.website_url.clone());
        let personality = request
            .personality
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.options.default_personality.clone());

        DemoConfig {
            company_name,
            agent_name,
            website_url: request.website_url,
            personality,
        }
    }

    async fn provision_and_start(&self, demo: &DemoConfig) -> Result<()> {
        let agent = self
            .provisioning
            .start_demo(&StartDemoRequest {
                company_name: demo.company_name.clone(),
                agent_name: demo.agent_name.clone(),
                company_website: demo.website_url.clone(),
                agent_personality: demo.personality.clone(),
            })
            .await
            .context("Agent provisioning failed")?;

        self.store
            .save_agent(&agent)
            .context("Failed to persist agent handle")?;

        let contact = self.store.contact();
        let identity = self
            .provisioning
            .create_room(&CreateRoomRequest {
                agent_code: agent.agent_code.clone(),
                schema_name: agent.schema_name.clone(),
                provider: self.options.room_provider.clone(),
                name: contact.as_ref().map(|c| c.name.clone()),
                email: contact.as_ref().map(|c| c.email.clone()),
                phone: contact.as_ref().map(|c| c.phone.clone()),
            })
            .await
            .context("Room creation failed")?;

        self.machine
            .start(identity, Some(demo.agent_name.clone()))
            .await
    }
}
