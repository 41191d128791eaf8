//! The FCC-precedence playout queue (§4.6 `PlayoutQueue`).
//!
//! Grounded on `app_core/audio/playout_queue.py`'s `AudioPlayoutQueue`: a
//! priority queue ordered by `(precedence, severity, urgency,
//! origin_timestamp, queue_id)`, smallest tuple first, with preemption of a
//! currently-playing lower-priority item and unlimited re-queueing of
//! interrupted items (Open Question in §9, resolved unlimited in
//! `SPEC_FULL.md`).

use crate::playout_item::{PlayoutEvent, PlayoutItem, PlayoutStatus};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::SystemTime;
use thiserror::Error;

/// Bound on the number of completed/failed/interrupted events retained for
/// `recent_events` (§4.6: "bounded (100) completed history").
const EVENT_HISTORY_CAPACITY: usize = 100;

/// Errors raised by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// `mark_completed`/`requeue_interrupted` referenced a `queue_id` that is
    /// not the item currently checked out as in-flight.
    #[error("queue_id {0} is not the in-flight item")]
    NotFound(u64),
}

/// Point-in-time queue depth and in-flight status, for the status snapshot.
#[derive(Debug, Clone)]
pub struct QueueStatus {
    /// Items waiting, excluding any in-flight item.
    pub pending_count: usize,
    /// `queue_id` of the item currently checked out via `dequeue`, if any.
    pub in_flight_queue_id: Option<u64>,
    /// Highest-priority pending item's event code, for quick inspection.
    pub next_event_code: Option<String>,
    /// Number of completed/failed/interrupted events retained.
    pub history_len: usize,
}

/// A bounded-priority queue of [`PlayoutItem`]s plus a short completed-event
/// history. Not internally synchronized; callers (`station-playout`) own the
/// locking (§4.6: "all state mutations under a single re-entrant lock").
pub struct PlayoutQueue {
    heap: BinaryHeap<Reverse<PlayoutItem>>,
    current_item: Option<PlayoutItem>,
    next_id: u64,
    history: Vec<PlayoutEvent>,
}

impl Default for PlayoutQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayoutQueue {
    /// Construct an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            current_item: None,
            next_id: 1,
            history: Vec::new(),
        }
    }

    /// Assign the next monotonically increasing `queue_id`.
    pub fn next_queue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert `item`. If `check_preempt` and an item is currently in-flight,
    /// returns whether `item` should preempt it; otherwise returns `false`.
    pub fn enqueue(&mut self, item: PlayoutItem, check_preempt: bool) -> bool {
        let preempt = check_preempt
            && self
                .current_item
                .as_ref()
                .is_some_and(|current| item.should_preempt(current));
        self.heap.push(Reverse(item));
        preempt
    }

    /// Pop the highest-priority pending item and mark it in-flight (the
    /// queue's `current_item`).
    pub fn dequeue(&mut self) -> Option<PlayoutItem> {
        let item = self.heap.pop().map(|Reverse(item)| item)?;
        self.current_item = Some(item.clone());
        Some(item)
    }

    /// Peek at the highest-priority pending item without removing it.
    pub fn peek(&self) -> Option<&PlayoutItem> {
        self.heap.peek().map(|Reverse(item)| item)
    }

    /// The item currently checked out via [`Self::dequeue`], if any.
    pub fn current_item(&self) -> Option<&PlayoutItem> {
        self.current_item.as_ref()
    }

    /// Clear `current_item` if it matches `queue_id`, record a terminal
    /// history event, and return. Fails if `queue_id` is not in-flight.
    pub fn mark_completed(&mut self, queue_id: u64, success: bool, error: Option<String>, latency_ms: f64) -> Result<(), QueueError> {
        let item = self.take_current(queue_id)?;
        let status = if success { PlayoutStatus::Completed } else { PlayoutStatus::Failed };
        self.push_history(PlayoutEvent::local(&item, status, Some(latency_ms), error));
        Ok(())
    }

    /// Re-enqueue the in-flight item as a fresh copy with a new `queue_id`,
    /// preserving priority and `origin_timestamp`, annotated with
    /// `{requeued: "true", original_queue_id, reason, requeued_at}`. Records
    /// an `Interrupted` history event for the original `queue_id`. No limit
    /// is placed on how many times an item may be re-queued (§9 Open
    /// Question, resolved).
    pub fn requeue_interrupted(&mut self, queue_id: u64, reason: impl Into<String>) -> Result<PlayoutItem, QueueError> {
        let original = self.take_current(queue_id)?;
        self.push_history(PlayoutEvent::local(&original, PlayoutStatus::Interrupted, None, None));

        let requeued_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let mut metadata = original.metadata.clone();
        metadata.insert("requeued".to_string(), "true".to_string());
        metadata.insert("original_queue_id".to_string(), original.queue_id.to_string());
        metadata.insert("reason".to_string(), reason.into());
        metadata.insert("requeued_at".to_string(), requeued_at.to_string());

        let fresh = PlayoutItem {
            queue_id: self.next_queue_id(),
            metadata,
            ..original
        };
        self.heap.push(Reverse(fresh.clone()));
        Ok(fresh)
    }

    fn take_current(&mut self, queue_id: u64) -> Result<PlayoutItem, QueueError> {
        match self.current_item.take() {
            Some(item) if item.queue_id == queue_id => Ok(item),
            Some(other) => {
                self.current_item = Some(other);
                Err(QueueError::NotFound(queue_id))
            }
            None => Err(QueueError::NotFound(queue_id)),
        }
    }

    fn push_history(&mut self, event: PlayoutEvent) {
        if self.history.len() >= EVENT_HISTORY_CAPACITY {
            self.history.remove(0);
        }
        self.history.push(event);
    }

    /// The most recent completed/failed/interrupted events, oldest first,
    /// bounded to `EVENT_HISTORY_CAPACITY` entries.
    pub fn recent_events(&self) -> &[PlayoutEvent] {
        &self.history
    }

    /// Discard all pending items and the in-flight slot, without recording
    /// history events. Returns the number of pending items discarded.
    pub fn clear(&mut self) -> usize {
        let cleared = self.heap.len();
        self.heap.clear();
        self.current_item = None;
        cleared
    }

    /// A snapshot of all pending items, in no particular external order
    /// (internal heap order), for introspection only.
    pub fn snapshot(&self) -> Vec<PlayoutItem> {
        self.heap.iter().map(|Reverse(item)| item.clone()).collect()
    }

    /// Current depth and in-flight summary.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending_count: self.heap.len(),
            in_flight_queue_id: self.current_item.as_ref().map(|i| i.queue_id),
            next_event_code: self.peek().map(|i| i.event_code.clone()),
            history_len: self.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::{Precedence, Severity, Urgency};
    use std::collections::HashMap;

    fn item(queue: &mut PlayoutQueue, precedence: Precedence, code: &str) -> PlayoutItem {
        PlayoutItem {
            queue_id: queue.next_queue_id(),
            precedence,
            severity: Severity::UNKNOWN,
            urgency: Urgency::UNKNOWN,
            origin_timestamp: SystemTime::now(),
            event_code: code.into(),
            event_name: code.into(),
            same_header: None,
            audio_path: format!("{code}.wav").into(),
            eom_path: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn dequeue_returns_highest_priority_first() {
        let mut q = PlayoutQueue::new();
        let local = item(&mut q, Precedence::LOCAL, "LOC");
        q.enqueue(local, false);
        let presidential = item(&mut q, Precedence::PRESIDENTIAL, "EAN");
        q.enqueue(presidential, false);

        let first = q.dequeue().unwrap();
        assert_eq!(first.event_code, "EAN");
    }

    #[test]
    fn enqueue_reports_preemption_against_current_item() {
        let mut q = PlayoutQueue::new();
        let local = item(&mut q, Precedence::LOCAL, "LOC");
        q.enqueue(local, false);
        q.dequeue();

        let presidential = item(&mut q, Precedence::PRESIDENTIAL, "EAN");
        assert!(q.enqueue(presidential, true));
    }

    #[test]
    fn enqueue_does_not_report_preemption_for_lower_priority() {
        let mut q = PlayoutQueue::new();
        let state = item(&mut q, Precedence::STATE, "SPW");
        q.enqueue(state, false);
        q.dequeue();

        let national = item(&mut q, Precedence::NATIONAL, "ADR");
        assert!(!q.enqueue(national, true));
    }

    #[test]
    fn requeue_interrupted_gets_a_fresh_id_and_metadata() {
        let mut q = PlayoutQueue::new();
        let local = item(&mut q, Precedence::LOCAL, "LOC");
        let original_id = local.queue_id;
        q.enqueue(local, false);
        q.dequeue();

        let requeued = q.requeue_interrupted(original_id, "preempted").unwrap();
        assert_ne!(requeued.queue_id, original_id);
        assert_eq!(requeued.metadata.get("requeued").map(String::as_str), Some("true"));
        assert_eq!(
            requeued.metadata.get("original_queue_id").map(String::as_str),
            Some(original_id.to_string()).as_deref()
        );
        assert_eq!(q.status().pending_count, 1);
        assert_eq!(q.recent_events().len(), 1);
        assert_eq!(q.recent_events()[0].status, PlayoutStatus::Interrupted);
    }

    #[test]
    fn mark_completed_rejects_wrong_queue_id() {
        let mut q = PlayoutQueue::new();
        let local = item(&mut q, Precedence::LOCAL, "LOC");
        q.enqueue(local, false);
        q.dequeue();

        assert!(q.mark_completed(999, true, None, 10.0).is_err());
    }

    #[test]
    fn history_is_bounded() {
        let mut q = PlayoutQueue::new();
        for i in 0..150 {
            let it = item(&mut q, Precedence::LOCAL, "LOC");
            let id = it.queue_id;
            q.enqueue(it, false);
            q.dequeue();
            q.mark_completed(id, true, None, i as f64).unwrap();
        }
        assert_eq!(q.recent_events().len(), EVENT_HISTORY_CAPACITY);
    }

    #[test]
    fn clear_discards_pending_items_and_current() {
        let mut q = PlayoutQueue::new();
        let a = item(&mut q, Precedence::LOCAL, "A");
        let b = item(&mut q, Precedence::LOCAL, "B");
        q.enqueue(a, false);
        q.enqueue(b, false);
        q.dequeue();

        let cleared = q.clear();
        assert_eq!(cleared, 1);
        assert!(q.current_item().is_none());
        assert_eq!(q.status().pending_count, 0);
    }
}
