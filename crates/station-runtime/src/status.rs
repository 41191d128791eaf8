//! The unified status/metrics snapshot (§6.3), the one surface analytics and
//! web layers are permitted to observe the core through.

use std::collections::HashMap;

use station_core::{PlayoutEvent, PlayoutItem, PlayoutStatus, SourceKind, SourceStatus, sanitize_db};
use station_decoder::DecoderStatus;
use station_playout::WorkerStatus;
use station_sources::{AdapterHandle, IngestController};

/// Number of recently-completed playout events retained in the snapshot.
const RECENT_COMPLETED_LEN: usize = 10;
/// Number of recent worker events retained in the snapshot.
const RECENT_WORKER_EVENTS_LEN: usize = 20;

/// Sanitised per-source metrics (§6.3: timestamp, peak_db, rms_db,
/// sample_rate, channels, frames_captured, silence_detected,
/// buffer_utilisation, metadata).
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Unix timestamp the underlying metrics sample was taken.
    pub timestamp: f64,
    /// Peak level, dBFS, sanitised to `[-120, 120]`.
    pub peak_db: f32,
    /// RMS level, dBFS, sanitised to `[-120, 120]`.
    pub rms_db: f32,
    /// Configured sample rate.
    pub sample_rate_hz: u32,
    /// Configured channel count.
    pub channels: u16,
    /// Total frames captured since the source last started.
    pub frames_captured: u64,
    /// Whether the silence state machine currently considers this silent.
    pub silence_detected: bool,
    /// Internal queue fill fraction, `[0, 1]`.
    pub buffer_utilisation: f32,
    /// Opaque kind-specific metadata.
    pub metadata: HashMap<String, String>,
}

/// One configured source's status (§6.3).
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    /// Source name.
    pub name: String,
    /// Source kind.
    pub kind: SourceKind,
    /// Current lifecycle status.
    pub status: SourceStatus,
    /// Whether this source participates in selection/auto-start.
    pub enabled: bool,
    /// Selection priority; lower wins.
    pub priority: u32,
    /// Sanitised metrics snapshot.
    pub metrics: MetricsSnapshot,
    /// Last recorded error, if any.
    pub error_message: Option<String>,
}

impl SourceSnapshot {
    fn from_adapter(adapter: &AdapterHandle) -> Self {
        let state = adapter.source_state();
        let raw_metrics = adapter.metrics();
        Self {
            name: adapter.name().to_string(),
            kind: adapter.kind(),
            status: adapter.status(),
            enabled: adapter.enabled(),
            priority: adapter.priority(),
            error_message: state.last_error,
            metrics: MetricsSnapshot {
                timestamp: raw_metrics.timestamp,
                peak_db: sanitize_db(raw_metrics.peak_db),
                rms_db: sanitize_db(raw_metrics.rms_db),
                sample_rate_hz: adapter.sample_rate_hz(),
                channels: adapter.channels(),
                frames_captured: raw_metrics.frames_captured,
                silence_detected: raw_metrics.silence_detected,
                buffer_utilisation: raw_metrics.buffer_utilisation,
                metadata: raw_metrics.metadata,
            },
        }
    }
}

/// Broadcast bus status (§6.3: name, subscribers, published, dropped).
#[derive(Debug, Clone)]
pub struct BusSnapshot {
    /// Bus name.
    pub name: String,
    /// Number of currently-registered subscribers.
    pub subscribers: usize,
    /// Total chunks published since construction.
    pub published: u64,
    /// Total per-subscriber drops due to a full queue.
    pub dropped: u64,
}

/// A short description of a queued item, for the `current_item`/`next_item`
/// fields of [`PlayoutQueueSnapshot`].
#[derive(Debug, Clone)]
pub struct PlayoutItemSummary {
    /// Assigned `queue_id`.
    pub queue_id: u64,
    /// Three-letter event code.
    pub event_code: String,
    /// FCC precedence class, as its raw ordinal (lower = higher priority).
    pub precedence: u32,
}

impl From<&PlayoutItem> for PlayoutItemSummary {
    fn from(item: &PlayoutItem) -> Self {
        Self {
            queue_id: item.queue_id,
            event_code: item.event_code.clone(),
            precedence: item.precedence.0,
        }
    }
}

/// Playout queue status (§6.3: size, current_item, next_item,
/// completed_count, recent completed).
#[derive(Debug, Clone)]
pub struct PlayoutQueueSnapshot {
    /// Pending items, excluding any in-flight item.
    pub size: usize,
    /// The item currently checked out for playback, if any.
    pub current_item: Option<PlayoutItemSummary>,
    /// The highest-priority pending item, if any.
    pub next_item: Option<PlayoutItemSummary>,
    /// Count of `Completed` events retained in the bounded history.
    pub completed_count: usize,
    /// The most recent `Completed` events, oldest first.
    pub recent_completed: Vec<PlayoutEvent>,
}

/// Playout worker status (§6.3: running, has_player, has_gpio,
/// current_playback, last N events).
#[derive(Debug, Clone)]
pub struct PlayoutWorkerSnapshot {
    /// Whether the worker thread is running.
    pub running: bool,
    /// Whether a player command is configured.
    pub has_player: bool,
    /// Whether a non-noop GPIO controller is attached.
    pub has_gpio: bool,
    /// Whether a player subprocess is currently alive.
    pub current_playback: bool,
    /// The most recent events emitted by the worker, oldest first.
    pub recent_events: Vec<PlayoutEvent>,
}

impl PlayoutWorkerSnapshot {
    fn from_parts(status: WorkerStatus, recent_events: Vec<PlayoutEvent>) -> Self {
        Self {
            running: status.running,
            has_player: status.has_player,
            has_gpio: status.has_gpio,
            current_playback: status.current_playback,
            recent_events,
        }
    }
}

/// A single immutable snapshot of the whole core (§6.3). Every numeric field
/// that can carry `NaN`/`±∞` has already been sanitised at this boundary.
#[derive(Debug, Clone)]
pub struct StationStatus {
    /// Per-source status, in registry insertion order.
    pub sources: Vec<SourceSnapshot>,
    /// The shared broadcast bus's status.
    pub bus: BusSnapshot,
    /// The decoder task's status, unchanged from `station-decoder` (§4.5).
    pub decoder: DecoderStatus,
    /// The playout queue's status.
    pub playout_queue: PlayoutQueueSnapshot,
    /// The playout worker's status.
    pub playout_worker: PlayoutWorkerSnapshot,
}

pub(crate) fn source_snapshots(ingest: &IngestController) -> Vec<SourceSnapshot> {
    ingest
        .names()
        .into_iter()
        .filter_map(|name| ingest.get(name))
        .map(SourceSnapshot::from_adapter)
        .collect()
}

pub(crate) fn bus_snapshot(ingest: &IngestController) -> BusSnapshot {
    let stats = ingest.broadcast_bus().stats();
    BusSnapshot {
        name: stats.name,
        subscribers: stats.subscriber_ids.len(),
        published: stats.published_chunks,
        dropped: stats.dropped_chunks,
    }
}

pub(crate) fn playout_queue_snapshot(queue: &station_core::PlayoutQueue) -> PlayoutQueueSnapshot {
    let status = queue.status();
    let recent_completed: Vec<PlayoutEvent> = queue
        .recent_events()
        .iter()
        .filter(|e| e.status == PlayoutStatus::Completed)
        .rev()
        .take(RECENT_COMPLETED_LEN)
        .rev()
        .cloned()
        .collect();
    PlayoutQueueSnapshot {
        size: status.pending_count,
        current_item: queue.current_item().map(PlayoutItemSummary::from),
        next_item: queue.peek().map(PlayoutItemSummary::from),
        completed_count: queue.recent_events().iter().filter(|e| e.status == PlayoutStatus::Completed).count(),
        recent_completed,
    }
}

pub(crate) fn playout_worker_snapshot(worker: &station_playout::PlayoutWorker) -> PlayoutWorkerSnapshot {
    PlayoutWorkerSnapshot::from_parts(worker.status(), worker.recent_events(RECENT_WORKER_EVENTS_LEN))
}
