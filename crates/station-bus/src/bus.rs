//! The [`BroadcastBus`] itself (§4.3).
//!
//! Grounded on the original implementation's `BroadcastQueue`: publishers
//! write once, each subscriber holds an independent bounded queue, and a
//! full subscriber queue drops its oldest entry rather than blocking the
//! publisher or the other subscribers.

use crate::error::SubscribeError;
use station_core::AudioChunk;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use tracing::{debug, info, warn};

/// Default per-subscriber queue depth before oldest chunks are dropped.
pub const DEFAULT_QUEUE_DEPTH: usize = 100;

struct SubscriberQueue {
    chunks: Mutex<VecDeque<Arc<AudioChunk>>>,
    not_empty: Condvar,
    capacity: usize,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            chunks: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Push a chunk, dropping the oldest entry if at capacity.
    /// Returns `true` if a drop occurred.
    fn push(&self, chunk: Arc<AudioChunk>) -> bool {
        let mut queue = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = if queue.len() >= self.capacity {
            queue.pop_front();
            true
        } else {
            false
        };
        queue.push_back(chunk);
        self.not_empty.notify_one();
        dropped
    }

    fn len(&self) -> usize {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Snapshot of publish/drop counters for the status surface.
#[derive(Debug, Clone)]
pub struct BusStats {
    /// Name of this bus (usually the owning source's name).
    pub name: String,
    /// Currently subscribed consumer ids.
    pub subscriber_ids: Vec<String>,
    /// Total chunks published since construction.
    pub published_chunks: u64,
    /// Total per-subscriber drops due to a full queue, summed across all subscribers.
    pub dropped_chunks: u64,
    /// Configured per-subscriber queue capacity.
    pub queue_capacity: usize,
}

/// Multi-consumer fan-out for [`AudioChunk`]s.
///
/// Internally synchronized; safe to share via `Arc` across the capture
/// thread and any number of subscriber readers.
pub struct BroadcastBus {
    name: String,
    capacity: usize,
    subscribers: Mutex<HashMap<String, Arc<SubscriberQueue>>>,
    published: std::sync::atomic::AtomicU64,
    dropped: std::sync::atomic::AtomicU64,
}

impl BroadcastBus {
    /// Construct a bus with [`DEFAULT_QUEUE_DEPTH`] per-subscriber capacity.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_capacity(name, DEFAULT_QUEUE_DEPTH)
    }

    /// Construct a bus with an explicit per-subscriber queue capacity.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        let name = name.into();
        info!(bus = %name, capacity, "broadcast bus initialised");
        Arc::new(Self {
            name,
            capacity,
            subscribers: Mutex::new(HashMap::new()),
            published: std::sync::atomic::AtomicU64::new(0),
            dropped: std::sync::atomic::AtomicU64::new(0),
        })
    }

    /// Subscribe under `subscriber_id`. Fails if `subscriber_id` is already
    /// registered (§4.2); the caller must [`BroadcastBus::unsubscribe`] first
    /// to re-register under the same id.
    pub fn subscribe(self: &Arc<Self>, subscriber_id: impl Into<String>) -> Result<SubscriberHandle, SubscribeError> {
        let subscriber_id = subscriber_id.into();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if subscribers.contains_key(&subscriber_id) {
            return Err(SubscribeError::Duplicate { id: subscriber_id });
        }
        let queue = Arc::new(SubscriberQueue::new(self.capacity));
        subscribers.insert(subscriber_id.clone(), queue.clone());
        info!(bus = %self.name, subscriber = %subscriber_id, total = subscribers.len(), "subscriber added");
        Ok(SubscriberHandle {
            queue,
            bus: self.clone(),
            id: subscriber_id,
        })
    }

    /// Remove a subscriber. Returns `true` if it was present.
    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let removed = subscribers.remove(subscriber_id).is_some();
        if removed {
            info!(bus = %self.name, subscriber = %subscriber_id, remaining = subscribers.len(), "subscriber removed");
        }
        removed
    }

    /// Fan a chunk out to every current subscriber. Each subscriber receives
    /// its own `Arc` clone; no audio data is copied per subscriber.
    pub fn publish(&self, chunk: Arc<AudioChunk>) -> usize {
        if chunk.frames() == 0 {
            return 0;
        }

        let subscribers: Vec<_> = {
            let guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.values().cloned().collect()
        };

        self.published.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let mut delivered = 0;
        for queue in &subscribers {
            if queue.push(chunk.clone()) {
                self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                debug!(bus = %self.name, "subscriber queue full, dropped oldest chunk");
            }
            delivered += 1;
        }
        delivered
    }

    /// Current publish/drop counters and subscriber roster.
    pub fn stats(&self) -> BusStats {
        let subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        BusStats {
            name: self.name.clone(),
            subscriber_ids: subscribers.keys().cloned().collect(),
            published_chunks: self.published.load(std::sync::atomic::Ordering::Relaxed),
            dropped_chunks: self.dropped.load(std::sync::atomic::Ordering::Relaxed),
            queue_capacity: self.capacity,
        }
    }
}

/// A live subscription handle returned by [`BroadcastBus::subscribe`].
///
/// Dropping this handle does not unsubscribe; callers own that decision
/// explicitly via [`BroadcastBus::unsubscribe`] (or through
/// [`crate::SubscriberAdapter::unsubscribe`]).
pub struct SubscriberHandle {
    queue: Arc<SubscriberQueue>,
    bus: Arc<BroadcastBus>,
    id: String,
}

impl SubscriberHandle {
    pub(crate) fn recv_timeout(&self, timeout: std::time::Duration) -> Option<Arc<AudioChunk>> {
        let mut guard = self.queue.chunks.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(chunk) = guard.pop_front() {
                return Some(chunk);
            }
            let (next_guard, result) = self
                .queue
                .not_empty
                .wait_timeout(guard, timeout)
                .unwrap_or_else(|e| e.into_inner());
            guard = next_guard;
            if result.timed_out() {
                return guard.pop_front();
            }
        }
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn unsubscribe(&self) {
        self.bus.unsubscribe(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_core::AudioChunk;

    fn chunk(value: f32, frames: usize) -> Arc<AudioChunk> {
        Arc::new(AudioChunk::new(vec![value; frames], 48_000, 1))
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let bus = BroadcastBus::new("test");
        let a = bus.subscribe("a").unwrap();
        let b = bus.subscribe("b").unwrap();

        let delivered = bus.publish(chunk(0.5, 10));
        assert_eq!(delivered, 2);
        assert_eq!(a.queue_len(), 1);
        assert_eq!(b.queue_len(), 1);
    }

    #[test]
    fn empty_chunk_is_not_published() {
        let bus = BroadcastBus::new("test");
        let _a = bus.subscribe("a").unwrap();
        let delivered = bus.publish(chunk(0.0, 0));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let bus = BroadcastBus::with_capacity("test", 2);
        let a = bus.subscribe("a").unwrap();
        bus.publish(chunk(0.1, 1));
        bus.publish(chunk(0.2, 1));
        bus.publish(chunk(0.3, 1));

        assert_eq!(a.queue_len(), 2);
        assert_eq!(bus.stats().dropped_chunks, 1);
    }

    #[test]
    fn resubscribing_under_the_same_id_is_rejected() {
        let bus = BroadcastBus::new("test");
        let first = bus.subscribe("a").unwrap();

        let err = bus.subscribe("a").unwrap_err();
        assert!(matches!(err, SubscribeError::Duplicate { id } if id == "a"));
        drop(first);
    }

    #[test]
    fn resubscribing_after_unsubscribe_succeeds() {
        let bus = BroadcastBus::new("test");
        let first = bus.subscribe("a").unwrap();
        bus.unsubscribe(first.id());

        assert!(bus.subscribe("a").is_ok());
    }

    #[test]
    fn unsubscribe_removes_the_subscriber() {
        let bus = BroadcastBus::new("test");
        let a = bus.subscribe("a").unwrap();
        assert!(bus.unsubscribe(a.id()));
        assert_eq!(bus.publish(chunk(0.1, 1)), 0);
    }
}
