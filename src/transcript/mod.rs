//! Live transcript aggregation.
//!
//! Streaming speech-to-text emits segments that are revised until finalized,
//! and revisions can arrive out of order relative to other speakers. The log
//! merges each incoming batch by segment id, then stable-sorts the whole
//! collection by timestamp so reading order always holds.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// One unit of streaming speech-to-text output.
///
/// Segments sharing an `id` are successive revisions of the same utterance;
/// a segment is immutable once `is_final` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: String,
    pub text: String,
    pub is_final: bool,
    /// Milliseconds since the epoch, as first reported by the source.
    pub timestamp: i64,
    pub speaker: Speaker,
}

/// Shared, ordered transcript for the active call.
#[derive(Clone, Default)]
pub struct TranscriptLog {
    inner: Arc<Mutex<Vec<TranscriptSegment>>>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of incoming segments.
    ///
    /// Known ids are revised in place (text and finality only; the original
    /// timestamp and speaker are kept), unknown ids are inserted. After the
    /// batch the collection is re-sorted by timestamp; the sort is stable so
    /// equal timestamps keep their relative order.
    pub fn merge(&self, batch: Vec<TranscriptSegment>) {
        if batch.is_empty() {
            return;
        }
        let mut segments = self.inner.lock().unwrap();
        for incoming in batch {
            match segments.iter_mut().find(|s| s.id == incoming.id) {
                Some(existing) => {
                    existing.text = incoming.text;
                    existing.is_final = incoming.is_final;
                }
                None => segments.push(incoming),
            }
        }
        segments.sort_by_key(|s| s.timestamp);
    }

    pub fn snapshot(&self) -> Vec<TranscriptSegment> {
        self.inner.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Drop all segments. Called when a call ends.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Render the transcript as plain text, one line per segment.
    pub fn rendered_text(&self) -> String {
        let segments = self.inner.lock().unwrap();
        segments
            .iter()
            .map(|s| {
                let who = match s.speaker {
                    Speaker::User => "You",
                    Speaker::Agent => "Agent",
                };
                format!("{}: {}", who, s.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, text: &str, is_final: bool, timestamp: i64, speaker: Speaker) -> TranscriptSegment {
        TranscriptSegment {
            id: id.to_string(),
            text: text.to_string(),
            is_final,
            timestamp,
            speaker,
        }
    }

    #[test]
    fn test_merge_orders_by_timestamp() {
        let log = TranscriptLog::new();
        log.merge(vec![
            seg("a", "hel", false, 1, Speaker::User),
            seg("b", "hi", true, 0, Speaker::Agent),
        ]);
        log.merge(vec![seg("a", "hello", true, 1, Speaker::User)]);

        let segments = log.snapshot();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, "b");
        assert_eq!(segments[0].text, "hi");
        assert_eq!(segments[1].id, "a");
        assert_eq!(segments[1].text, "hello");
        assert!(segments[1].is_final);
    }

    #[test]
    fn test_revision_keeps_count_and_position_fields() {
        let log = TranscriptLog::new();
        log.merge(vec![seg("a", "draft", false, 42, Speaker::Agent)]);
        log.merge(vec![seg("a", "final text", true, 99, Speaker::User)]);

        let segments = log.snapshot();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "final text");
        // Revisions never move a segment or change who said it.
        assert_eq!(segments[0].timestamp, 42);
        assert_eq!(segments[0].speaker, Speaker::Agent);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let log = TranscriptLog::new();
        log.merge(vec![
            seg("x", "first", true, 5, Speaker::User),
            seg("y", "second", true, 5, Speaker::Agent),
        ]);
        log.merge(vec![seg("z", "third", true, 5, Speaker::User)]);

        let ids: Vec<_> = log.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_one_entry_per_id_across_many_batches() {
        let log = TranscriptLog::new();
        for i in 0..10 {
            log.merge(vec![
                seg("a", &format!("rev {i}"), i == 9, 1, Speaker::User),
                seg(&format!("b{i}"), "other", true, i, Speaker::Agent),
            ]);
        }
        let segments = log.snapshot();
        assert_eq!(segments.len(), 11);
        assert_eq!(segments.iter().filter(|s| s.id == "a").count(), 1);
        assert!(segments.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_clear_empties_the_log() {
        let log = TranscriptLog::new();
        log.merge(vec![seg("a", "hello", true, 1, Speaker::User)]);
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_rendered_text_labels_speakers() {
        let log = TranscriptLog::new();
        log.merge(vec![
            seg("a", "hello", true, 1, Speaker::User),
            seg("b", "hi there", true, 2, Speaker::Agent),
        ]);
        assert_eq!(log.rendered_text(), "You: hello\nAgent: hi there");
    }
}
