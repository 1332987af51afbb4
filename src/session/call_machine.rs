//! Call session lifecycle orchestrator.
//!
//! Single point of control for the one underlying media session a tab may
//! hold. Status is never set synchronously from a call site: it is always
//! derived from events emitted by the session, pumped through one task
//! subscribed exactly once per session lifetime. A per-call epoch reconciles
//! late async results against the current desired state instead of a
//! cancellation primitive.

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::transcript::TranscriptLog;

use super::media::{CallIdentity, MediaConnector, MediaSession, SessionEvent};
use super::side_effects::SideEffects;
use super::status::{SessionStatus, SessionStatusHandle};

struct Inner {
    session: Option<Arc<dyn MediaSession>>,
    identity: Option<CallIdentity>,
    agent_name: Option<String>,
    /// Logical mutual exclusion: a start() is in flight.
    starting: bool,
    /// Incremented on every stop; events carrying an older epoch are stale.
    epoch: u64,
}

pub struct CallMachine {
    connector: Arc<dyn MediaConnector>,
    effects: Arc<SideEffects>,
    status: SessionStatusHandle,
    transcript: TranscriptLog,
    inner: Arc<Mutex<Inner>>,
    resume_muted: Arc<AtomicBool>,
}

impl CallMachine {
    pub fn new(
        connector: Arc<dyn MediaConnector>,
        effects: Arc<SideEffects>,
        status: SessionStatusHandle,
        transcript: TranscriptLog,
    ) -> Self {
        Self {
            connector,
            effects,
            status,
            transcript,
            inner: Arc::new(Mutex::new(Inner {
                session: None,
                identity: None,
                agent_name: None,
                starting: false,
                epoch: 0,
            })),
            resume_muted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status_handle(&self) -> SessionStatusHandle {
        self.status.clone()
    }

    pub fn transcript(&self) -> TranscriptLog {
        self.transcript.clone()
    }

    /// Keep local audio muted until the session reaches Listening. Set by the
    /// reconnection path so a resumed call does not blast audio before the
    /// user re-engages.
    pub fn set_resume_muted(&self) {
        self.resume_muted.store(true, Ordering::SeqCst);
    }

    /// Whether no call is active and no start is in flight.
    pub async fn is_idle(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.session.is_none() && !inner.starting
    }

    /// Open a session against the identity's join address.
    ///
    /// Rejected if a call is already active or another start is in flight.
    /// On failure the status stays Disconnected and the error surfaces to the
    /// caller.
    pub async fn start(&self, identity: CallIdentity, agent_name: Option<String>) -> Result<()> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.starting || inner.session.is_some() {
                bail!("Call already in progress");
            }
            inner.starting = true;
            inner.epoch
        };

        info!("Starting call {}", identity.call_id);

        let (tx, rx) = mpsc::channel::<SessionEvent>(64);
        let connected = self.connector.connect(&identity.join, tx).await;

        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch {
            inner.starting = false;
        }

        let session: Arc<dyn MediaSession> = match connected {
            Ok(session) => Arc::from(session),
            Err(e) => {
                drop(inner);
                self.status.set_error(e.to_string()).await;
                return Err(e).context("Failed to join call session");
            }
        };

        if inner.epoch != epoch {
            // stop() ran while the connect was in flight; this join is a late
            // event now.
            drop(inner);
            debug!("Discarding join for stopped call {}", identity.call_id);
            let _ = session.close().await;
            return Ok(());
        }

        inner.session = Some(session.clone());
        inner.identity = Some(identity.clone());
        inner.agent_name = agent_name.clone();
        drop(inner);

        if self.resume_muted.load(Ordering::SeqCst) {
            if let Err(e) = session.set_muted(true).await {
                warn!("Failed to mute resumed session: {e:#}");
            }
        }

        self.effects
            .call_started(&identity, agent_name.as_deref())
            .await;
        self.spawn_event_pump(rx, epoch);

        Ok(())
    }

    /// Stop the active call. Idempotent; safe while a start is in flight.
    pub async fn stop(&self) -> Result<()> {
        let (session, identity) = {
            let mut inner = self.inner.lock().await;
            let session = inner.session.take();
            let identity = inner.identity.take();
            inner.agent_name = None;

            if session.is_none() && !inner.starting {
                debug!("stop() with no active call; nothing to do");
                return Ok(());
            }

            inner.epoch += 1;
            inner.starting = false;
            (session, identity)
        };

        self.status.set(SessionStatus::Disconnecting).await;
        self.resume_muted.store(false, Ordering::SeqCst);

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                warn!("Graceful leave failed: {e:#}");
            }
        }

        if let Some(identity) = &identity {
            let transcript_text = self.transcript.rendered_text();
            self.effects.call_ended(identity, &transcript_text).await;
        }

        self.transcript.clear();
        self.status.set(SessionStatus::Disconnected).await;

        if let Some(identity) = identity {
            info!("Call {} stopped", identity.call_id);
        }
        Ok(())
    }

    /// Forward a text message to the session's data channel. Fails silently
    /// when there is no live session.
    pub async fn send_text(&self, message: &str) -> Result<()> {
        if self.status.status().await == SessionStatus::Disconnected {
            warn!("Dropping text message: no live session");
            return Ok(());
        }

        let session = self.inner.lock().await.session.clone();
        match session {
            Some(session) => session.send_text(message).await,
            None => {
                warn!("Dropping text message: no live session");
                Ok(())
            }
        }
    }

    /// Mute or unmute local audio. No status change.
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        let session = self.inner.lock().await.session.clone();
        match session {
            Some(session) => session.set_muted(muted).await,
            None => {
                warn!("Ignoring mute toggle: no live session");
                Ok(())
            }
        }
    }

    fn spawn_event_pump(&self, mut rx: mpsc::Receiver<SessionEvent>, epoch: u64) {
        let inner = self.inner.clone();
        let status = self.status.clone();
        let transcript = self.transcript.clone();
        let effects = self.effects.clone();
        let resume_muted = self.resume_muted.clone();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let (current_epoch, session, identity) = {
                    let inner = inner.lock().await;
                    (inner.epoch, inner.session.clone(), inner.identity.clone())
                };
                if current_epoch != epoch {
                    debug!("Ignoring late session event from a stopped call");
                    break;
                }

                match event {
                    SessionEvent::Status(next) => {
                        let previous = status.set(next).await;
                        if previous != next {
                            debug!("Session status: {} -> {}", previous.as_str(), next.as_str());
                        }

                        if next == SessionStatus::Connected && previous != SessionStatus::Connected
                        {
                            if let Some(identity) = &identity {
                                effects.call_connected(identity).await;
                            }
                        }

                        if next == SessionStatus::Listening
                            && resume_muted.swap(false, Ordering::SeqCst)
                        {
                            if let Some(session) = &session {
                                if let Err(e) = session.set_muted(false).await {
                                    warn!("Failed to unmute resumed session: {e:#}");
                                }
                            }
                        }
                    }
                    // Transcript events are independent of status; render them
                    // even for a still-connecting session.
                    SessionEvent::Transcript(batch) => transcript.merge(batch),
                }
            }
            debug!("Session event pump ended");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{
        AgentHandle, CreateRoomRequest, EndCallRequest, ProvisioningClient, StartDemoRequest,
        TriggerCallRequest,
    };
    use crate::session::media::JoinAddress;
    use crate::store::SessionStore;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct NullProvisioning;

    #[async_trait]
    impl ProvisioningClient for NullProvisioning {
        async fn start_demo(&self, _req: &StartDemoRequest) -> Result<AgentHandle> {
            Ok(AgentHandle {
                agent_code: "a".to_string(),
                schema_name: "s".to_string(),
            })
        }
        async fn create_room(&self, _req: &CreateRoomRequest) -> Result<CallIdentity> {
            Ok(identity())
        }
        async fn resume_call(
            &self,
            _agent: &AgentHandle,
            _prior_call_id: &str,
        ) -> Result<CallIdentity> {
            Ok(identity())
        }
        async fn end_call_session(&self, _req: &EndCallRequest) -> Result<()> {
            Ok(())
        }
        async fn trigger_call(&self, _req: &TriggerCallRequest) -> Result<()> {
            Ok(())
        }
    }

    /// Connector that blocks in connect() until released, so tests can
    /// interleave stop() with an in-flight join.
    struct GatedConnector {
        gate: Arc<Notify>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MediaConnector for GatedConnector {
        async fn connect(
            &self,
            _join: &JoinAddress,
            _events: mpsc::Sender<SessionEvent>,
        ) -> Result<Box<dyn MediaSession>> {
            self.gate.notified().await;
            Ok(Box::new(GatedSession {
                closed: self.closed.clone(),
            }))
        }
    }

    struct GatedSession {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MediaSession for GatedSession {
        async fn send_text(&self, _message: &str) -> Result<()> {
            Ok(())
        }
        async fn set_muted(&self, _muted: bool) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn identity() -> CallIdentity {
        CallIdentity {
            call_id: "c1".to_string(),
            call_session_id: "s1".to_string(),
            join: JoinAddress::Url("loopback://test".to_string()),
        }
    }

    fn machine_with(connector: Arc<dyn MediaConnector>, dir: &tempfile::TempDir) -> CallMachine {
        let store = Arc::new(SessionStore::open(dir.path().join("state.json")).unwrap());
        let effects = Arc::new(SideEffects::new(store, Arc::new(NullProvisioning)));
        CallMachine::new(
            connector,
            effects,
            SessionStatusHandle::default(),
            TranscriptLog::new(),
        )
    }

    #[tokio::test]
    async fn test_stop_during_connect_discards_late_join() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let closed = Arc::new(AtomicBool::new(false));
        let machine = Arc::new(machine_with(
            Arc::new(GatedConnector {
                gate: gate.clone(),
                closed: closed.clone(),
            }),
            &dir,
        ));

        let started = {
            let machine = machine.clone();
            tokio::spawn(async move { machine.start(identity(), None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        machine.stop().await.unwrap();
        gate.notify_one();

        // The late join resolves without error, but the session it produced
        // is closed immediately and never becomes current.
        started.await.unwrap().unwrap();
        assert!(machine.is_idle().await);
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(
            machine.status_handle().status().await,
            SessionStatus::Disconnected
        );
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_connect_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let closed = Arc::new(AtomicBool::new(false));
        let machine = Arc::new(machine_with(
            Arc::new(GatedConnector {
                gate: gate.clone(),
                closed,
            }),
            &dir,
        ));

        let started = {
            let machine = machine.clone();
            tokio::spawn(async move { machine.start(identity(), None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = machine.start(identity(), None).await;
        assert!(result.is_err());

        gate.notify_one();
        started.await.unwrap().unwrap();
        machine.stop().await.unwrap();
    }
}
