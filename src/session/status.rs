//! Session status types and shared state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Connection status of the real-time call session.
///
/// The single authoritative value; mutated only by events emitted from the
/// underlying media session. `Disconnected` is both the initial state and the
/// only rest state after a clean stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Listening,
    Speaking,
    Disconnecting,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Listening => "listening",
            Self::Speaking => "speaking",
            Self::Disconnecting => "disconnecting",
        }
    }

    /// Whether a live session exists in this status.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

/// Current session state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            started_at: None,
            last_error: None,
        }
    }
}

impl SessionState {
    /// Seconds since the session connected.
    pub fn duration_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = chrono::Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}

/// Thread-safe handle for sharing session state between the call machine and
/// API handlers.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.lock().await.status
    }

    /// Set the status, returning the previous value.
    pub async fn set(&self, status: SessionStatus) -> SessionStatus {
        let mut state = self.inner.lock().await;
        let previous = state.status;
        state.status = status;
        if status == SessionStatus::Connected && previous != SessionStatus::Connected {
            state.started_at = Some(chrono::Utc::now());
        }
        if status == SessionStatus::Disconnected {
            state.started_at = None;
        }
        previous
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.status = SessionStatus::Disconnected;
        state.started_at = None;
        state.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(SessionStatus::Disconnected.as_str(), "disconnected");
        assert_eq!(SessionStatus::Connecting.as_str(), "connecting");
        assert_eq!(SessionStatus::Connected.as_str(), "connected");
        assert_eq!(SessionStatus::Listening.as_str(), "listening");
        assert_eq!(SessionStatus::Speaking.as_str(), "speaking");
        assert_eq!(SessionStatus::Disconnecting.as_str(), "disconnecting");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SessionStatus::Listening).unwrap();
        assert_eq!(json, "\"listening\"");

        let parsed: SessionStatus = serde_json::from_str("\"speaking\"").unwrap();
        assert_eq!(parsed, SessionStatus::Speaking);
    }

    #[test]
    fn test_default_state_is_disconnected() {
        let state = SessionState::default();
        assert_eq!(state.status, SessionStatus::Disconnected);
        assert!(state.started_at.is_none());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_set_returns_previous() {
        let handle = SessionStatusHandle::default();
        let previous = handle.set(SessionStatus::Connecting).await;
        assert_eq!(previous, SessionStatus::Disconnected);
        assert_eq!(handle.status().await, SessionStatus::Connecting);
    }

    #[tokio::test]
    async fn test_connected_stamps_start_time() {
        let handle = SessionStatusHandle::default();
        handle.set(SessionStatus::Connecting).await;
        handle.set(SessionStatus::Connected).await;
        assert!(handle.get().await.started_at.is_some());

        handle.set(SessionStatus::Disconnected).await;
        assert!(handle.get().await.started_at.is_none());
    }

    #[tokio::test]
    async fn test_set_error_returns_to_rest_state() {
        let handle = SessionStatusHandle::default();
        handle.set(SessionStatus::Connecting).await;
        handle.set_error("join failed".to_string()).await;

        let state = handle.get().await;
        assert_eq!(state.status, SessionStatus::Disconnected);
        assert_eq!(state.last_error, Some("join failed".to_string()));
    }
}
