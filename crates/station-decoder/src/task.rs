//! `ContinuousDecoderTask` (§4.5): drives a [`SameDecoder`] over a live
//! [`station_bus::SubscriberAdapter`], dispatching alerts through a bounded
//! worker pool and enforcing a watchdog on stalled audio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use station_bus::SubscriberAdapter;
use station_core::AlertEvent;

use crate::decoder::SameDecoder;
use crate::status::DecoderStatus;

/// Default number of worker threads dispatching alert callbacks (§5).
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// Default watchdog timeout before `ensure_running` is requested (§4.5).
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

const ALERT_QUEUE_DEPTH: usize = 64;
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Construction-time configuration for a [`ContinuousDecoderTask`].
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Samples pulled from the subscriber per read (10 ms worth at the
    /// decoder's sample rate is recommended, §4.5 step 1a).
    pub block_size_samples: usize,
    /// Number of worker threads dispatching alert callbacks.
    pub max_workers: usize,
    /// Time since last activity before the watchdog fires.
    pub watchdog_timeout: Duration,
    /// When set, alerts whose `location_codes` do not overlap this set are
    /// logged but not forwarded to the callback (§4.5 filtering contract).
    pub location_filter: Option<Vec<String>>,
}

impl DecoderConfig {
    /// Defaults: 2 workers, 60 s watchdog, no location filtering.
    pub fn new(block_size_samples: usize) -> Self {
        Self {
            block_size_samples,
            max_workers: DEFAULT_MAX_WORKERS,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
            location_filter: None,
        }
    }
}

struct TaskState {
    running: bool,
    samples_processed: u64,
    alerts_detected: u64,
    start_time: Option<Instant>,
    last_activity: Option<Instant>,
    restart_count: u32,
    decoder_synced: bool,
    decoder_in_message: bool,
}

impl TaskState {
    fn new() -> Self {
        Self {
            running: false,
            samples_processed: 0,
            alerts_detected: 0,
            start_time: None,
            last_activity: None,
            restart_count: 0,
            decoder_synced: false,
            decoder_in_message: false,
        }
    }
}

/// Owns the decoder worker thread, the bounded alert-callback pool, and the
/// watchdog that requests a source restart after prolonged silence.
pub struct ContinuousDecoderTask {
    subscriber: Arc<SubscriberAdapter>,
    decoder: Option<Box<dyn SameDecoder>>,
    config: DecoderConfig,
    callback: Arc<dyn Fn(AlertEvent) + Send + Sync>,
    on_watchdog: Arc<dyn Fn() + Send + Sync>,
    state: Arc<Mutex<TaskState>>,
    stop_flag: Arc<AtomicBool>,
    main_thread: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    alert_tx: Option<SyncSender<AlertEvent>>,
}

impl ContinuousDecoderTask {
    /// Build a task over `subscriber`, driving `decoder`, dispatching
    /// recognised alerts to `callback`, and invoking `on_watchdog` when the
    /// watchdog trips (the caller is expected to bind this to
    /// `ingest_controller.ensure_running(active_source, "decoder watchdog")`).
    pub fn new(
        subscriber: Arc<SubscriberAdapter>,
        decoder: Box<dyn SameDecoder>,
        callback: Arc<dyn Fn(AlertEvent) + Send + Sync>,
        on_watchdog: Arc<dyn Fn() + Send + Sync>,
        config: DecoderConfig,
    ) -> Self {
        Self {
            subscriber,
            decoder: Some(decoder),
            config,
            callback,
            on_watchdog,
            state: Arc::new(Mutex::new(TaskState::new())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            main_thread: None,
            workers: Vec::new(),
            alert_tx: None,
        }
    }

    /// Start the decode loop and the alert-callback worker pool. Returns
    /// `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.main_thread.is_some() {
            return false;
        }
        let Some(mut decoder) = self.decoder.take() else {
            return false;
        };

        self.stop_flag.store(false, Ordering::SeqCst);
        {
            let mut state = self.lock_state();
            state.running = true;
            state.start_time = Some(Instant::now());
            state.last_activity = None;
        }

        let (tx, rx) = mpsc::sync_channel::<AlertEvent>(ALERT_QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));
        self.workers = (0..self.config.max_workers.max(1))
            .map(|i| spawn_worker(i, Arc::clone(&rx), Arc::clone(&self.callback)))
            .collect();
        self.alert_tx = Some(tx.clone());

        let subscriber = Arc::clone(&self.subscriber);
        let state = Arc::clone(&self.state);
        let stop_flag = Arc::clone(&self.stop_flag);
        let on_watchdog = Arc::clone(&self.on_watchdog);
        let config = self.config.clone();
        let filter = config.location_filter.clone();

        let handle = std::thread::Builder::new()
            .name("decoder-task".into())
            .spawn(move || {
                let mut last_watchdog_fire = Instant::now();
                while !stop_flag.load(Ordering::SeqCst) {
                    match subscriber.read_samples(config.block_size_samples) {
                        Some(samples) => {
                            let events = decoder.feed(&samples);
                            let now = Instant::now();
                            {
                                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                                guard.samples_processed += samples.len() as u64;
                                guard.last_activity = Some(now);
                                guard.decoder_synced = decoder.is_synced();
                                guard.decoder_in_message = decoder.in_message();
                                guard.alerts_detected += events.len() as u64;
                            }
                            for event in events {
                                dispatch(&event, filter.as_deref(), &tx);
                            }
                        }
                        None => {
                            // Underrun; the blocking read already waited out
                            // its timeout, so loop straight back (§4.5 1a).
                        }
                    }

                    let time_since_activity = {
                        let guard = state.lock().unwrap_or_else(|e| e.into_inner());
                        guard
                            .last_activity
                            .map(|t| Instant::now().duration_since(t))
                            .unwrap_or_else(|| Instant::now().duration_since(guard.start_time.unwrap_or_else(Instant::now)))
                    };
                    if time_since_activity >= config.watchdog_timeout
                        && Instant::now().duration_since(last_watchdog_fire) >= config.watchdog_timeout
                    {
                        tracing::warn!(
                            seconds = time_since_activity.as_secs_f64(),
                            "decoder watchdog tripped, requesting source restart"
                        );
                        state.lock().unwrap_or_else(|e| e.into_inner()).restart_count += 1;
                        (on_watchdog)();
                        last_watchdog_fire = Instant::now();
                    }
                }
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                guard.running = false;
            });

        match handle {
            Ok(h) => {
                self.main_thread = Some(h);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn decoder task thread");
                self.lock_state().running = false;
                false
            }
        }
    }

    /// Stop the decode loop and join the worker pool with [`STOP_JOIN_TIMEOUT`].
    /// Returns `false` if not running.
    pub fn stop(&mut self) -> bool {
        let Some(handle) = self.main_thread.take() else {
            return false;
        };
        self.stop_flag.store(true, Ordering::SeqCst);
        let joined = join_with_timeout(handle, STOP_JOIN_TIMEOUT);
        if !joined {
            tracing::warn!("decoder task did not stop within the timeout");
        }

        self.alert_tx = None; // dropping every sender unblocks worker recv()
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }

        self.subscriber.unsubscribe();
        self.lock_state().running = false;
        true
    }

    /// Current progress snapshot (§4.5).
    pub fn status(&self) -> DecoderStatus {
        let guard = self.lock_state();
        let runtime = guard
            .start_time
            .map(|t| Instant::now().duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        let time_since_activity = guard
            .last_activity
            .map(|t| Instant::now().duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        let samples_per_second = if runtime > 0.0 {
            guard.samples_processed as f64 / runtime
        } else {
            0.0
        };
        DecoderStatus {
            running: guard.running,
            audio_flowing: guard.last_activity.is_some_and(|t| Instant::now().duration_since(t) < Duration::from_secs(2)),
            samples_processed: guard.samples_processed,
            samples_per_second,
            runtime_seconds: runtime,
            decoder_synced: guard.decoder_synced,
            decoder_in_message: guard.decoder_in_message,
            alerts_detected: guard.alerts_detected,
            last_activity: guard.last_activity.and_then(|t| instant_to_unix(t, runtime)),
            time_since_activity,
            restart_count: guard.restart_count,
            watchdog_timeout: self.config.watchdog_timeout.as_secs_f64(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Best-effort conversion of a monotonic `last_activity` instant to a
/// seconds-since-epoch timestamp for the status surface.
fn instant_to_unix(last_activity: Instant, _runtime_seconds: f64) -> Option<f64> {
    let now_instant = Instant::now();
    let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs_f64();
    let age = now_instant.duration_since(last_activity).as_secs_f64();
    Some(now_unix - age)
}

fn dispatch(event: &AlertEvent, filter: Option<&[String]>, tx: &SyncSender<AlertEvent>) {
    match filter {
        Some(allowed) if !event.matches_any(allowed) => {
            tracing::info!(
                event_code = %event.event_code,
                codes = ?event.location_codes,
                "alert filtered out: no configured location code matched"
            );
        }
        _ => {
            if tx.try_send(event.clone()).is_err() {
                tracing::warn!(event_code = %event.event_code, "alert callback pool saturated, dropping dispatch");
            }
        }
    }
}

fn spawn_worker(
    index: usize,
    rx: Arc<Mutex<Receiver<AlertEvent>>>,
    callback: Arc<dyn Fn(AlertEvent) + Send + Sync>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("decoder-alert-worker-{index}"))
        .spawn(move || {
            loop {
                let event = {
                    let guard = rx.lock().unwrap_or_else(|e| e.into_inner());
                    guard.recv()
                };
                match event {
                    Ok(event) => callback(event),
                    Err(_) => break, // sender dropped, pool shutting down
                }
            }
        })
        .expect("failed to spawn decoder alert worker")
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    // std::thread has no native join-with-timeout; poll is_finished, which
    // is adequate here since the decode loop checks its stop flag every
    // iteration and iterations are bounded by the subscriber read timeout.
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    let _ = handle.join();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_decoder::ToneBurstDecoder;
    use station_bus::BroadcastBus;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    fn push_samples(bus: &Arc<BroadcastBus>, samples: Vec<f32>) {
        bus.publish(Arc::new(station_core::AudioChunk::new(samples, 16_000, 1)));
    }

    #[test]
    fn delivers_an_alert_through_the_worker_pool() {
        let bus = BroadcastBus::new("decoder-test");
        let subscriber = Arc::new(SubscriberAdapter::with_read_timeout(&bus, "decoder", 16_000, 1, Duration::from_millis(50)).unwrap());
        push_samples(&bus, vec![0.95_f32; 256]);

        let received = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let callback: Arc<dyn Fn(AlertEvent) + Send + Sync> = Arc::new(move |event| {
            received_clone.lock().unwrap().push(event.event_code);
        });
        let watchdog_calls = Arc::new(AtomicUsize::new(0));
        let watchdog_calls_clone = Arc::clone(&watchdog_calls);
        let on_watchdog: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            watchdog_calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let decoder = Box::new(ToneBurstDecoder::new("wx1", "RWT", vec![]));
        let mut config = DecoderConfig::new(64);
        config.watchdog_timeout = Duration::from_secs(60);
        let mut task = ContinuousDecoderTask::new(subscriber, decoder, callback, on_watchdog, config);

        assert!(task.start());
        std::thread::sleep(Duration::from_millis(200));
        task.stop();

        assert_eq!(received.lock().unwrap().as_slice(), ["RWT"]);
    }

    #[test]
    fn filtered_events_are_not_forwarded() {
        let bus = BroadcastBus::new("decoder-test-filter");
        let subscriber = Arc::new(SubscriberAdapter::with_read_timeout(&bus, "decoder", 16_000, 1, Duration::from_millis(50)).unwrap());
        push_samples(&bus, vec![0.95_f32; 256]);

        let received = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let callback: Arc<dyn Fn(AlertEvent) + Send + Sync> = Arc::new(move |event| {
            received_clone.lock().unwrap().push(event.event_code);
        });
        let on_watchdog: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {});

        let decoder = Box::new(ToneBurstDecoder::new("wx1", "RWT", vec!["012057".into()]));
        let mut config = DecoderConfig::new(64);
        config.location_filter = Some(vec!["099999".into()]);
        let mut task = ContinuousDecoderTask::new(subscriber, decoder, callback, on_watchdog, config);

        assert!(task.start());
        std::thread::sleep(Duration::from_millis(200));
        task.stop();

        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn double_start_is_rejected() {
        let bus = BroadcastBus::new("decoder-test-double-start");
        let subscriber = Arc::new(SubscriberAdapter::new(&bus, "decoder", 16_000, 1).unwrap());
        let decoder = Box::new(ToneBurstDecoder::new("wx1", "RWT", vec![]));
        let callback: Arc<dyn Fn(AlertEvent) + Send + Sync> = Arc::new(|_| {});
        let on_watchdog: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {});
        let mut task = ContinuousDecoderTask::new(subscriber, decoder, callback, on_watchdog, DecoderConfig::new(64));

        assert!(task.start());
        assert!(!task.start());
        task.stop();
    }
}
