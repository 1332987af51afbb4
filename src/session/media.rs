//! Boundary to the external real-time media SDK.
//!
//! The wire protocol itself is delegated entirely to the session
//! implementation behind these traits. Events are pushed over an mpsc channel
//! handed to the connector at join time, so handlers are registered exactly
//! once per session lifetime.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::transcript::TranscriptSegment;
use super::status::SessionStatus;

/// Join credentials for one call room. Some backends hand out a single join
/// URL, others a server URL plus access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinAddress {
    Url(String),
    Token { url: String, token: String },
}

/// Identity of one provisioned call, owned by the call machine for the
/// duration of the call. The id pair is additionally persisted so an
/// interrupted call can be resumed after a restart.
#[derive(Debug, Clone)]
pub struct CallIdentity {
    pub call_id: String,
    pub call_session_id: String,
    pub join: JoinAddress,
}

/// Event re-emitted by the underlying session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Status(SessionStatus),
    Transcript(Vec<TranscriptSegment>),
}

/// A live media session. All operations are asynchronous; callers must never
/// assume the status has changed just because a call resolved — status
/// changes arrive as separate events.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Forward a text message over the session's data channel.
    async fn send_text(&self, message: &str) -> Result<()>;

    /// Mute or unmute local audio. Observable side effect only.
    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Request a graceful leave. The session stops emitting events afterward.
    async fn close(&self) -> Result<()>;
}

/// Factory opening sessions against a join address.
#[async_trait]
pub trait MediaConnector: Send + Sync {
    async fn connect(
        &self,
        join: &JoinAddress,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn MediaSession>>;
}
