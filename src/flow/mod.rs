//! Gated onboarding flow: contact capture, demo selection, and the live call
//! experience.

mod controller;
mod validate;

pub use controller::{FlowOptions, FlowSnapshot, OnboardingFlow};
pub use validate::{validate_contact, validate_demo, ValidationError};

use serde::{Deserialize, Serialize};

/// Step of the onboarding flow. Linear and gated: everything past `Lead`
/// requires a captured contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Lead,
    Menu,
    WidgetForm,
    WidgetActive,
    Calling,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Menu => "menu",
            Self::WidgetForm => "widget_form",
            Self::WidgetActive => "widget_active",
            Self::Calling => "calling",
        }
    }
}

/// Visitor contact details, captured once and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    /// Full phone number including country code.
    pub phone: String,
    pub company: Option<String>,
}

/// User-supplied demo configuration handed to the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    pub company_name: String,
    pub agent_name: String,
    pub website_url: String,
    pub personality: String,
}

/// Raw widget-form submission; unset fields are filled from config defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoRequest {
    pub company_name: Option<String>,
    pub agent_name: Option<String>,
    pub website_url: String,
    pub personality: Option<String>,
}
