//! Durable client-side session state.
//!
//! One JSON file under the data dir holding everything the service must
//! remember across a restart: the captured contact, the demo configuration,
//! the provisioned agent handle, and the identity of a call that was not
//! cleanly ended. Reads and writes happen only through explicit `load`/`save`
//! operations invoked at well-defined points (startup, successful submits,
//! call start/stop).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::flow::{ContactInfo, DemoConfig};
use crate::global;
use crate::provision::AgentHandle;

/// Identity of a call that may still be resumable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCall {
    pub call_id: String,
    pub call_session_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct PersistedState {
    lead_complete: bool,
    contact: Option<ContactInfo>,
    demo: Option<DemoConfig>,
    agent: Option<AgentHandle>,
    call: Option<PersistedCall>,
}

pub struct SessionStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl SessionStore {
    /// Open the store at the default data-dir location.
    pub fn open_default() -> Result<Self> {
        Self::open(global::session_state_file()?)
    }

    /// Open the store at an explicit path, loading existing state if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content =
                std::fs::read_to_string(&path).context("Failed to read session state file")?;
            serde_json::from_str(&content).context("Failed to parse session state file")?
        } else {
            PersistedState::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn save_locked(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let content =
            serde_json::to_string_pretty(state).context("Failed to serialize session state")?;
        std::fs::write(&self.path, content).context("Failed to write session state file")?;
        Ok(())
    }

    /// Whether the lead capture step has been completed.
    pub fn lead_complete(&self) -> bool {
        self.state.lock().unwrap().lead_complete
    }

    pub fn contact(&self) -> Option<ContactInfo> {
        self.state.lock().unwrap().contact.clone()
    }

    pub fn save_contact(&self, contact: &ContactInfo) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.contact = Some(contact.clone());
        state.lead_complete = true;
        self.save_locked(&state)
    }

    pub fn demo(&self) -> Option<DemoConfig> {
        self.state.lock().unwrap().demo.clone()
    }

    pub fn save_demo(&self, demo: &DemoConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.demo = Some(demo.clone());
        self.save_locked(&state)
    }

    pub fn agent(&self) -> Option<AgentHandle> {
        self.state.lock().unwrap().agent.clone()
    }

    pub fn save_agent(&self, agent: &AgentHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.agent = Some(agent.clone());
        self.save_locked(&state)
    }

    pub fn call(&self) -> Option<PersistedCall> {
        self.state.lock().unwrap().call.clone()
    }

    pub fn save_call(&self, call: &PersistedCall) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.call = Some(call.clone());
        self.save_locked(&state)
    }

    /// Forget the persisted call identity. Returns true if there was one.
    pub fn clear_call(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let had_call = state.call.take().is_some();
        if had_call {
            self.save_locked(&state)?;
        }
        Ok(had_call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Asha".to_string(),
            email: "a@b.com".to_string(),
            phone: "5551234567".to_string(),
            company: Some("Acme".to_string()),
        }
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("state.json")).unwrap();
        assert!(!store.lead_complete());
        assert!(store.contact().is_none());
        assert!(store.call().is_none());
    }

    #[test]
    fn test_contact_round_trips_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = SessionStore::open(&path).unwrap();
        store.save_contact(&contact()).unwrap();

        let reopened = SessionStore::open(&path).unwrap();
        assert!(reopened.lead_complete());
        assert_eq!(reopened.contact().unwrap().name, "Asha");
    }

    #[test]
    fn test_clear_call_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("state.json")).unwrap();
        store
            .save_call(&PersistedCall {
                call_id: "c1".to_string(),
                call_session_id: "s1".to_string(),
            })
            .unwrap();

        assert!(store.clear_call().unwrap());
        assert!(!store.clear_call().unwrap());
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(SessionStore::open(&path).is_err());
    }
}
