//! Pull-side buffering on top of a [`crate::BroadcastBus`] subscription.
//!
//! Grounded on the original implementation's `BroadcastAudioAdapter`: chunks
//! arrive independently-sized from the bus and are consolidated into a flat
//! sample buffer on read, trimmed to a bounded window, with rate-limited
//! underrun logging so a stalled source doesn't flood the log.

use crate::bus::{BroadcastBus, SubscriberHandle};
use crate::error::SubscribeError;
use station_core::AudioChunk;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default timeout for a single blocking read from the subscriber queue.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Seconds of audio retained in the consolidated buffer before trimming.
const MAX_BUFFER_SECONDS: u64 = 5;

/// Qualitative read-continuity rating derived from the underrun rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberHealth {
    /// Underrun rate below 1%.
    Good,
    /// Underrun rate between 1% and 5%.
    Degraded,
    /// Underrun rate at or above 5%.
    Poor,
}

/// Read-continuity statistics for the status surface.
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Subscriber id this adapter was registered under.
    pub subscriber_id: String,
    /// Chunks currently queued on the bus side, not yet consolidated.
    pub queued_chunks: usize,
    /// Samples currently held in the consolidated buffer.
    pub buffered_samples: usize,
    /// `buffered_samples` expressed in seconds at `sample_rate`.
    pub buffered_seconds: f64,
    /// Total `read_samples`/`get_chunk` calls made.
    pub total_reads: u64,
    /// Total reads that returned `None` due to insufficient data.
    pub underrun_count: u64,
    /// `underrun_count / total_reads * 100`.
    pub underrun_rate_percent: f64,
    /// Qualitative rating derived from `underrun_rate_percent`.
    pub health: SubscriberHealth,
}

/// A list of chunks with a running sample counter (§3, §4.3, §9): appending
/// a chunk is an `Arc` clone, never a copy; samples are only concatenated
/// into a contiguous buffer when a read or a trim requires it.
struct Buffer {
    chunks: VecDeque<Arc<AudioChunk>>,
    /// Samples already consumed from the front chunk.
    front_offset: usize,
    /// Total unconsumed samples across every chunk. Invariant:
    /// `total_samples == chunks.iter().map(|c| c.samples().len()).sum::<usize>() - front_offset`.
    total_samples: usize,
    channels: u16,
}

impl Buffer {
    fn new(channels: u16) -> Self {
        Self {
            chunks: VecDeque::new(),
            front_offset: 0,
            total_samples: 0,
            channels,
        }
    }

    fn push(&mut self, chunk: Arc<AudioChunk>) {
        self.total_samples += chunk.samples().len();
        self.chunks.push_back(chunk);
    }

    fn len(&self) -> usize {
        self.total_samples
    }

    /// Remove and return the first `n` samples as a contiguous buffer.
    /// Panics if `n > self.len()`; callers check `len()` first.
    fn consume(&mut self, n: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let chunk = self.chunks.front().expect("caller checked total_samples >= n");
            let available = &chunk.samples()[self.front_offset..];
            let take = available.len().min(n - out.len());
            out.extend_from_slice(&available[..take]);
            self.front_offset += take;
            self.total_samples -= take;
            if self.front_offset == chunk.samples().len() {
                self.chunks.pop_front();
                self.front_offset = 0;
            }
        }
        out
    }

    /// Copy up to `n` samples from the front without consuming them.
    fn peek(&self, n: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(n.min(self.total_samples));
        for (index, chunk) in self.chunks.iter().enumerate() {
            if out.len() >= n {
                break;
            }
            let start = if index == 0 { self.front_offset } else { 0 };
            let available = &chunk.samples()[start..];
            let take = available.len().min(n - out.len());
            out.extend_from_slice(&available[..take]);
        }
        out
    }

    /// Drop samples from the front until at most `max_samples` remain,
    /// without materialising the dropped data (§4.3: trim is a chunk-list
    /// operation, not a copy).
    fn trim(&mut self, max_samples: usize) {
        while self.total_samples > max_samples {
            let excess = self.total_samples - max_samples;
            let chunk = self.chunks.front().expect("total_samples > 0");
            let remaining_in_chunk = chunk.samples().len() - self.front_offset;
            let drop = remaining_in_chunk.min(excess);
            self.front_offset += drop;
            self.total_samples -= drop;
            if self.front_offset == chunk.samples().len() {
                self.chunks.pop_front();
                self.front_offset = 0;
            }
        }
    }
}

/// Non-destructive pull-side reader over a [`BroadcastBus`] subscription.
pub struct SubscriberAdapter {
    handle: SubscriberHandle,
    sample_rate: u32,
    read_timeout: Duration,
    buffer: Mutex<Buffer>,
    total_reads: AtomicU64,
    underrun_count: AtomicU64,
    last_underrun_log: Mutex<Instant>,
}

impl SubscriberAdapter {
    /// Subscribe to `bus` under `subscriber_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::Duplicate`] if `subscriber_id` is already
    /// registered on `bus`.
    pub fn new(bus: &Arc<BroadcastBus>, subscriber_id: impl Into<String>, sample_rate: u32, channels: u16) -> Result<Self, SubscribeError> {
        Self::with_read_timeout(bus, subscriber_id, sample_rate, channels, DEFAULT_READ_TIMEOUT)
    }

    /// Subscribe with an explicit per-read timeout (minimum 100ms, mirroring
    /// the original implementation's floor).
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::Duplicate`] if `subscriber_id` is already
    /// registered on `bus`.
    pub fn with_read_timeout(
        bus: &Arc<BroadcastBus>,
        subscriber_id: impl Into<String>,
        sample_rate: u32,
        channels: u16,
        read_timeout: Duration,
    ) -> Result<Self, SubscribeError> {
        let subscriber_id = subscriber_id.into();
        let handle = bus.subscribe(subscriber_id)?;
        Ok(Self {
            handle,
            sample_rate,
            read_timeout: read_timeout.max(Duration::from_millis(100)),
            buffer: Mutex::new(Buffer::new(channels)),
            total_reads: AtomicU64::new(0),
            underrun_count: AtomicU64::new(0),
            last_underrun_log: Mutex::new(Instant::now()),
        })
    }

    fn max_buffer_samples(&self) -> usize {
        self.sample_rate as usize * MAX_BUFFER_SECONDS as usize
    }

    /// Block (up to the configured read timeout, repeated as needed) until
    /// `num_samples` interleaved samples are available, then return and
    /// consume them. Returns `None` on underrun.
    pub fn read_samples(&self, num_samples: usize) -> Option<Vec<f32>> {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());

        while buffer.len() < num_samples {
            match self.handle.recv_timeout(self.read_timeout) {
                Some(chunk) => {
                    buffer.push(chunk);
                    let max = self.max_buffer_samples();
                    buffer.trim(max);
                }
                None => {
                    self.record_underrun(buffer.len(), num_samples);
                    return None;
                }
            }
        }

        Some(buffer.consume(num_samples))
    }

    /// Pull a standard 100ms chunk, consuming it from the buffer.
    pub fn get_chunk(&self, timeout: Duration) -> Option<Arc<AudioChunk>> {
        let channels = self.buffer.lock().unwrap_or_else(|e| e.into_inner()).channels;
        let chunk_samples = (self.sample_rate as f64 * 0.1) as usize * channels.max(1) as usize;

        self.total_reads.fetch_add(1, Ordering::Relaxed);
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());

        while buffer.len() < chunk_samples {
            match self.handle.recv_timeout(timeout) {
                Some(chunk) => {
                    buffer.push(chunk);
                    let max = self.max_buffer_samples();
                    buffer.trim(max);
                }
                None => return None,
            }
        }

        let samples = buffer.consume(chunk_samples);
        Some(Arc::new(AudioChunk::new(samples, self.sample_rate, channels)))
    }

    /// Return up to `num_samples` from the buffer without consuming them.
    /// Used for retaining audio alongside a detected alert (§4.5).
    pub fn get_recent(&self, num_samples: usize) -> Option<Vec<f32>> {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.len() == 0 {
            return None;
        }
        Some(buffer.peek(num_samples))
    }

    fn record_underrun(&self, have: usize, want: usize) {
        let count = self.underrun_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut last = self.last_underrun_log.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if count <= 10 || count % 50 == 0 || now.duration_since(*last) >= Duration::from_secs(10) {
            warn!(
                subscriber = self.handle.id(),
                underrun = count,
                buffered = have,
                wanted = want,
                "audio underrun on subscriber queue"
            );
            *last = now;
        } else {
            debug!(subscriber = self.handle.id(), underrun = count, "audio underrun (throttled)");
        }
    }

    /// Current read-continuity statistics.
    pub fn stats(&self) -> SubscriberStats {
        let buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let total_reads = self.total_reads.load(Ordering::Relaxed);
        let underrun_count = self.underrun_count.load(Ordering::Relaxed);
        let underrun_rate_percent = if total_reads > 0 {
            underrun_count as f64 / total_reads as f64 * 100.0
        } else {
            0.0
        };
        let health = if underrun_rate_percent < 1.0 {
            SubscriberHealth::Good
        } else if underrun_rate_percent < 5.0 {
            SubscriberHealth::Degraded
        } else {
            SubscriberHealth::Poor
        };
        SubscriberStats {
            subscriber_id: self.handle.id().to_string(),
            queued_chunks: self.handle.queue_len(),
            buffered_samples: buffer.len(),
            buffered_seconds: buffer.len() as f64 / self.sample_rate.max(1) as f64,
            total_reads,
            underrun_count,
            underrun_rate_percent,
            health,
        }
    }

    /// Remove this adapter's subscription from the bus.
    pub fn unsubscribe(&self) {
        self.handle.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BroadcastBus;

    #[test]
    fn read_samples_consolidates_across_chunk_boundaries() {
        let bus = BroadcastBus::new("test");
        let adapter = SubscriberAdapter::new(&bus, "reader", 1000, 1).unwrap();

        bus.publish(Arc::new(AudioChunk::new(vec![1.0; 5], 1000, 1)));
        bus.publish(Arc::new(AudioChunk::new(vec![2.0; 5], 1000, 1)));

        let samples = adapter.read_samples(8).unwrap();
        assert_eq!(samples.len(), 8);
        assert_eq!(&samples[..5], &[1.0; 5]);
        assert_eq!(&samples[5..], &[2.0; 3]);
    }

    #[test]
    fn read_samples_returns_none_on_underrun() {
        let bus = BroadcastBus::new("test");
        let adapter = SubscriberAdapter::with_read_timeout(&bus, "reader", 1000, 1, Duration::from_millis(50)).unwrap();
        assert!(adapter.read_samples(100).is_none());
        assert_eq!(adapter.stats().underrun_count, 1);
    }

    #[test]
    fn get_recent_does_not_consume_the_buffer() {
        let bus = BroadcastBus::new("test");
        let adapter = SubscriberAdapter::new(&bus, "reader", 1000, 1).unwrap();
        bus.publish(Arc::new(AudioChunk::new(vec![1.0; 5], 1000, 1)));
        adapter.read_samples(1).unwrap();

        let recent = adapter.get_recent(10).unwrap();
        assert_eq!(recent.len(), 4);
        assert_eq!(adapter.stats().buffered_samples, 4);
    }

    #[test]
    fn health_ratings_follow_underrun_rate_thresholds() {
        let bus = BroadcastBus::new("test");
        let adapter = SubscriberAdapter::new(&bus, "reader", 1000, 1).unwrap();
        assert_eq!(adapter.stats().health, SubscriberHealth::Good);
    }

    #[test]
    fn buffer_trims_whole_and_partial_chunks_from_the_front() {
        let mut buffer = Buffer::new(1);
        buffer.push(Arc::new(AudioChunk::new(vec![1.0; 3], 1000, 1)));
        buffer.push(Arc::new(AudioChunk::new(vec![2.0; 3], 1000, 1)));
        buffer.push(Arc::new(AudioChunk::new(vec![3.0; 3], 1000, 1)));

        buffer.trim(4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.consume(4), vec![2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn buffer_peek_spans_multiple_chunks_without_consuming() {
        let mut buffer = Buffer::new(1);
        buffer.push(Arc::new(AudioChunk::new(vec![1.0; 2], 1000, 1)));
        buffer.push(Arc::new(AudioChunk::new(vec![2.0; 2], 1000, 1)));

        assert_eq!(buffer.peek(3), vec![1.0, 1.0, 2.0]);
        assert_eq!(buffer.len(), 4);
    }
}
