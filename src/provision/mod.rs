//! Client for the provisioning backend.
//!
//! The backend creates agent configurations and joinable call rooms and is
//! treated as an external collaborator with a fixed request/response
//! contract.

mod client;
mod lead;

pub use client::{
    AgentHandle, CreateRoomRequest, EndCallRequest, HttpProvisioningClient, ProvisioningClient,
    StartDemoRequest, TriggerCallRequest,
};
pub use lead::{LeadNotifier, WebhookLeadNotifier};
