//! Playout items and lifecycle events (§3 `PlayoutItem`/`PlayoutEvent`).

use crate::precedence::{Precedence, Severity, Urgency};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

/// An alert queued for playout.
///
/// `queue_id` is assigned by the owning [`crate::PlayoutQueue`] and is
/// strictly increasing within that queue instance. The priority tuple
/// `(precedence, severity, urgency, origin_timestamp, queue_id)` totally
/// orders all items, smallest first (§3 invariant).
#[derive(Debug, Clone)]
pub struct PlayoutItem {
    /// Monotonically increasing id assigned at enqueue time.
    pub queue_id: u64,
    /// FCC precedence class.
    pub precedence: Precedence,
    /// CAP severity.
    pub severity: Severity,
    /// CAP urgency.
    pub urgency: Urgency,
    /// Time the originating event occurred (not enqueue time).
    pub origin_timestamp: SystemTime,
    /// Three-letter event code.
    pub event_code: String,
    /// Human-readable event name.
    pub event_name: String,
    /// Opaque SAME header string, if any.
    pub same_header: Option<String>,
    /// Path to the main audio file to play.
    pub audio_path: PathBuf,
    /// Optional end-of-message audio to play after the main segment.
    pub eom_path: Option<PathBuf>,
    /// Free-form metadata (requeue annotations live here).
    pub metadata: HashMap<String, String>,
}

impl PlayoutItem {
    /// The `(precedence, severity, urgency, origin_timestamp)` tuple, without
    /// `queue_id`, used by the preemption predicate (§4.6: "compare priority
    /// tuples ignoring `queue_id`"). `SystemTime` does not implement `Ord`
    /// infallibly across all platforms in every edge case, so we compare via
    /// duration-since-epoch, falling back to the epoch (oldest) on error —
    /// this can only make a malformed timestamp lose priority, never win it.
    fn priority_key(&self) -> (Precedence, Severity, Urgency, u128) {
        let ts = self
            .origin_timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        (self.precedence, self.severity, self.urgency, ts)
    }

    /// The full `(precedence, severity, urgency, origin_timestamp, queue_id)`
    /// tuple used for total ordering within the queue's heap.
    fn sort_key(&self) -> (Precedence, Severity, Urgency, u128, u64) {
        let (p, s, u, ts) = self.priority_key();
        (p, s, u, ts, self.queue_id)
    }

    /// `true` iff this item should preempt `current` (§4.6 `should_preempt`):
    /// a Presidential-equivalent item always preempts; otherwise the
    /// priority tuple is compared with `queue_id` excluded.
    pub fn should_preempt(&self, current: &PlayoutItem) -> bool {
        if self.precedence == Precedence::PRESIDENTIAL {
            return true;
        }
        self.priority_key() < current.priority_key()
    }
}

impl PartialEq for PlayoutItem {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for PlayoutItem {}

impl PartialOrd for PlayoutItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlayoutItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Terminal/transient state of a playout attempt (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutStatus {
    /// Dequeued, not yet playing.
    Pending,
    /// Player subprocess active.
    Playing,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully (missing file, non-zero exit).
    Failed,
    /// Preempted by a higher-priority item; not a failure.
    Interrupted,
}

/// A single lifecycle transition of a playout attempt, for logging/status.
#[derive(Debug, Clone)]
pub struct PlayoutEvent {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// Transition status.
    pub status: PlayoutStatus,
    /// `queue_id` of the item this event refers to.
    pub queue_id: u64,
    /// Event code, copied from the item for convenient logging.
    pub event_code: String,
    /// Playout target; `"local_audio"` unless routed to a rebroadcast
    /// consumer (carried over from the original implementation, see
    /// `SPEC_FULL.md`).
    pub target: String,
    /// Elapsed time for terminal states, in milliseconds.
    pub latency_ms: Option<f64>,
    /// Error message for `Failed` events.
    pub error: Option<String>,
}

impl PlayoutEvent {
    /// Construct an event with `target = "local_audio"`.
    pub fn local(item: &PlayoutItem, status: PlayoutStatus, latency_ms: Option<f64>, error: Option<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            status,
            queue_id: item.queue_id,
            event_code: item.event_code.clone(),
            target: "local_audio".to_string(),
            latency_ms,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn item(queue_id: u64, precedence: Precedence, origin_offset_s: u64) -> PlayoutItem {
        PlayoutItem {
            queue_id,
            precedence,
            severity: Severity::UNKNOWN,
            urgency: Urgency::UNKNOWN,
            origin_timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(origin_offset_s),
            event_code: "TOR".into(),
            event_name: "Tornado Warning".into(),
            same_header: None,
            audio_path: "alert.wav".into(),
            eom_path: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn lower_precedence_value_sorts_first() {
        let presidential = item(1, Precedence::PRESIDENTIAL, 10);
        let local = item(2, Precedence::LOCAL, 0);
        assert!(presidential < local);
    }

    #[test]
    fn ties_break_on_origin_timestamp_then_queue_id() {
        let older = item(5, Precedence::LOCAL, 0);
        let newer = item(1, Precedence::LOCAL, 10);
        assert!(older < newer);

        let a = item(1, Precedence::LOCAL, 100);
        let b = item(2, Precedence::LOCAL, 100);
        assert!(a < b);
    }

    #[test]
    fn presidential_candidate_always_preempts() {
        let current = item(1, Precedence::PRESIDENTIAL, 0);
        let candidate = item(2, Precedence::PRESIDENTIAL, 100);
        assert!(candidate.should_preempt(&current));
    }

    #[test]
    fn equal_priority_ignoring_queue_id_does_not_preempt() {
        let current = item(1, Precedence::LOCAL, 0);
        let candidate = item(2, Precedence::LOCAL, 0);
        assert!(!candidate.should_preempt(&current));
    }

    #[test]
    fn strictly_higher_priority_candidate_preempts() {
        let current = item(1, Precedence::LOCAL, 0);
        let lower = item(2, Precedence::STATE, 0);
        assert!(!lower.should_preempt(&current));

        let higher = item(3, Precedence::NATIONWIDE_TEST, 0);
        assert!(higher.should_preempt(&current));
    }
}
