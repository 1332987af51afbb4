//! In-process media connector for local demos and tests.
//!
//! Joins instantly, walks the Connecting → Connected → Listening sequence,
//! and echoes any text sent on the data channel back as an interim-then-final
//! agent segment. Useful for exercising the full call lifecycle without a
//! real media backend.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transcript::{Speaker, TranscriptSegment};
use super::media::{JoinAddress, MediaConnector, MediaSession, SessionEvent};
use super::status::SessionStatus;

pub struct LoopbackConnector {
    /// Delay between emitted status transitions.
    step_delay: Duration,
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(20),
        }
    }
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaConnector for LoopbackConnector {
    async fn connect(
        &self,
        join: &JoinAddress,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn MediaSession>> {
        if let JoinAddress::Url(url) = join {
            if url.is_empty() {
                bail!("Empty join URL");
            }
        }

        debug!("Loopback session joining {:?}", join);

        let closed = Arc::new(AtomicBool::new(false));
        let session = LoopbackSession {
            events: events.clone(),
            closed: closed.clone(),
        };

        let step_delay = self.step_delay;
        tokio::spawn(async move {
            for status in [
                SessionStatus::Connecting,
                SessionStatus::Connected,
                SessionStatus::Listening,
            ] {
                if closed.load(Ordering::SeqCst) {
                    return;
                }
                if events.send(SessionEvent::Status(status)).await.is_err() {
                    return;
                }
                tokio::time::sleep(step_delay).await;
            }
        });

        Ok(Box::new(session))
    }
}

struct LoopbackSession {
    events: mpsc::Sender<SessionEvent>,
    closed: Arc<AtomicBool>,
}

impl LoopbackSession {
    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl MediaSession for LoopbackSession {
    async fn send_text(&self, message: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("Session closed");
        }

        let user_segment = TranscriptSegment {
            id: uuid::Uuid::new_v4().to_string(),
            text: message.to_string(),
            is_final: true,
            timestamp: Self::now_ms(),
            speaker: Speaker::User,
        };
        let _ = self
            .events
            .send(SessionEvent::Transcript(vec![user_segment]))
            .await;

        // Echo back as an agent utterance, revised once before finalizing.
        let events = self.events.clone();
        let closed = self.closed.clone();
        let reply = format!("You said: {message}");
        tokio::spawn(async move {
            let id = uuid::Uuid::new_v4().to_string();
            let timestamp = LoopbackSession::now_ms();

            let _ = events
                .send(SessionEvent::Status(SessionStatus::Speaking))
                .await;
            let interim = TranscriptSegment {
                id: id.clone(),
                text: reply.chars().take(reply.len() / 2).collect(),
                is_final: false,
                timestamp,
                speaker: Speaker::Agent,
            };
            let _ = events.send(SessionEvent::Transcript(vec![interim])).await;

            tokio::time::sleep(Duration::from_millis(10)).await;
            if closed.load(Ordering::SeqCst) {
                return;
            }

            let done = TranscriptSegment {
                id,
                text: reply,
                is_final: true,
                timestamp,
                speaker: Speaker::Agent,
            };
            let _ = events.send(SessionEvent::Transcript(vec![done])).await;
            let _ = events
                .send(SessionEvent::Status(SessionStatus::Listening))
                .await;
        });

        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        debug!("Loopback session muted: {}", muted);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join() -> JoinAddress {
        JoinAddress::Url("loopback://demo".to_string())
    }

    #[tokio::test]
    async fn test_connect_emits_status_sequence() {
        let (tx, mut rx) = mpsc::channel(16);
        let connector = LoopbackConnector::new();
        let _session = connector.connect(&join(), tx).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            match rx.recv().await.unwrap() {
                SessionEvent::Status(s) => seen.push(s),
                SessionEvent::Transcript(_) => panic!("unexpected transcript"),
            }
        }
        assert_eq!(
            seen,
            vec![
                SessionStatus::Connecting,
                SessionStatus::Connected,
                SessionStatus::Listening,
            ]
        );
    }

    #[tokio::test]
    async fn test_send_text_echoes_final_agent_segment() {
        let (tx, mut rx) = mpsc::channel(32);
        let connector = LoopbackConnector::new();
        let session = connector.connect(&join(), tx).await.unwrap();

        session.send_text("hello").await.unwrap();

        let mut agent_final = None;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(1), rx.recv()).await
        {
            if let SessionEvent::Transcript(batch) = event {
                for seg in batch {
                    if seg.speaker == Speaker::Agent && seg.is_final {
                        agent_final = Some(seg);
                    }
                }
            }
            if agent_final.is_some() {
                break;
            }
        }
        assert_eq!(agent_final.unwrap().text, "You said: hello");
    }

    #[tokio::test]
    async fn test_send_text_after_close_fails() {
        let (tx, _rx) = mpsc::channel(16);
        let connector = LoopbackConnector::new();
        let session = connector.connect(&join(), tx).await.unwrap();

        session.close().await.unwrap();
        assert!(session.send_text("late").await.is_err());
    }
}
