//! `PlayoutWorker` (§4.7): the single background thread that drains the
//! playout queue and drives the player subprocess, with preemption.
//!
//! Grounded on `app_core/audio/output_service.py`'s `AudioOutputService`.

use std::path::Path;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use station_core::{PlayoutEvent, PlayoutItem, PlayoutQueue, PlayoutStatus};

use crate::gpio::GpioController;
use crate::player;

const DEQUEUE_WAIT: Duration = Duration::from_millis(1000);
const EVENT_HISTORY_CAPACITY: usize = 500;
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A registered event listener, invoked for every [`PlayoutEvent`] the
/// worker emits (§4.7: "multiple listeners allowed").
pub type EventListener = Box<dyn Fn(&PlayoutEvent) + Send + Sync>;

/// Point-in-time summary of the worker, for the status surface (§6.3).
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    /// Whether the worker thread is running.
    pub running: bool,
    /// Whether a player command is configured.
    pub has_player: bool,
    /// Whether a non-noop GPIO controller is attached.
    pub has_gpio: bool,
    /// Whether a player subprocess is currently alive.
    pub current_playback: bool,
}

struct SharedState {
    events: Vec<PlayoutEvent>,
    listeners: Vec<EventListener>,
}

/// Drains `queue`, invoking the configured player subprocess per segment and
/// the [`GpioController`] around each playout item. Owns at most one live
/// player process at a time (§5 ordering guarantee).
pub struct PlayoutWorker {
    queue: Arc<Mutex<PlayoutQueue>>,
    player_cmd: Option<Vec<String>>,
    gpio: Arc<dyn GpioController>,
    shared: Arc<Mutex<SharedState>>,
    current_process: Arc<Mutex<Option<Child>>>,
    running: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    interrupt_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlayoutWorker {
    /// Build a worker over `queue`. `player_cmd` is the operator-supplied
    /// argv (§6.2); `None` disables actual playback (segments are always
    /// treated as missing-file failures), which is useful for headless
    /// testing of queue/event plumbing alone.
    pub fn new(queue: Arc<Mutex<PlayoutQueue>>, player_cmd: Option<Vec<String>>, gpio: Arc<dyn GpioController>) -> Self {
        Self {
            queue,
            player_cmd,
            gpio,
            shared: Arc::new(Mutex::new(SharedState {
                events: Vec::new(),
                listeners: Vec::new(),
            })),
            current_process: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            interrupt_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Register a callback invoked for every emitted [`PlayoutEvent`].
    pub fn register_event_listener(&self, listener: EventListener) {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).listeners.push(listener);
    }

    /// The most recent `limit` playout events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<PlayoutEvent> {
        let shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        let start = shared.events.len().saturating_sub(limit);
        shared.events[start..].to_vec()
    }

    /// Current status summary (§6.3).
    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            running: self.running.load(Ordering::SeqCst),
            has_player: self.player_cmd.is_some(),
            has_gpio: true,
            current_playback: self.current_process.lock().unwrap_or_else(|e| e.into_inner()).is_some(),
        }
    }

    /// Start the background worker thread. Returns `false` if already
    /// running.
    pub fn start(&mut self) -> bool {
        if self.thread.is_some() {
            return false;
        }
        self.stop_flag.store(false, Ordering::SeqCst);
        self.interrupt_flag.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let queue = Arc::clone(&self.queue);
        let player_cmd = self.player_cmd.clone();
        let gpio = Arc::clone(&self.gpio);
        let shared = Arc::clone(&self.shared);
        let current_process = Arc::clone(&self.current_process);
        let running = Arc::clone(&self.running);
        let stop_flag = Arc::clone(&self.stop_flag);
        let interrupt_flag = Arc::clone(&self.interrupt_flag);

        let handle = std::thread::Builder::new()
            .name("playout-worker".into())
            .spawn(move || {
                run(WorkerCtx {
                    queue,
                    player_cmd,
                    gpio,
                    shared,
                    current_process,
                    stop_flag,
                    interrupt_flag,
                });
                running.store(false, Ordering::SeqCst);
            });

        match handle {
            Ok(h) => {
                self.thread = Some(h);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn playout worker thread");
                self.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Request shutdown, interrupt any in-flight playback, and join the
    /// worker thread with `timeout` (default [`DEFAULT_STOP_TIMEOUT`]).
    pub fn stop(&mut self, timeout: Option<Duration>) -> bool {
        let Some(handle) = self.thread.take() else {
            return false;
        };
        self.stop_flag.store(true, Ordering::SeqCst);
        self.interrupt_current();

        let timeout = timeout.unwrap_or(DEFAULT_STOP_TIMEOUT);
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!("playout worker did not stop within the timeout");
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        let _ = handle.join();
        true
    }

    fn interrupt_current(&self) {
        self.interrupt_flag.store(true, Ordering::SeqCst);
        let mut guard = self.current_process.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(child) = guard.as_mut() {
            player::terminate(child);
        }
        *guard = None;
    }
}

struct WorkerCtx {
    queue: Arc<Mutex<PlayoutQueue>>,
    player_cmd: Option<Vec<String>>,
    gpio: Arc<dyn GpioController>,
    shared: Arc<Mutex<SharedState>>,
    current_process: Arc<Mutex<Option<Child>>>,
    stop_flag: Arc<AtomicBool>,
    interrupt_flag: Arc<AtomicBool>,
}

fn run(ctx: WorkerCtx) {
    tracing::info!("playout worker started");
    while !ctx.stop_flag.load(Ordering::SeqCst) {
        // Step 1: a higher-priority item waiting against one already
        // in-flight pre-empts it before we even try to dequeue.
        {
            let queue = ctx.queue.lock().unwrap_or_else(|e| e.into_inner());
            if let (Some(next), Some(current)) = (queue.peek(), queue.current_item()) {
                if next.should_preempt(current) {
                    tracing::warn!(event_code = %next.event_code, "higher-priority alert detected, interrupting current playback");
                    ctx.interrupt_flag.store(true, Ordering::SeqCst);
                }
            }
        }

        let item = {
            let mut queue = ctx.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.dequeue()
        };
        let Some(item) = item else {
            std::thread::sleep(Duration::from_millis(50).min(DEQUEUE_WAIT));
            continue;
        };

        emit(&ctx.shared, PlayoutEvent::local(&item, PlayoutStatus::Pending, None, None));
        ctx.interrupt_flag.store(false, Ordering::SeqCst);
        play_item(&ctx, item);
    }
    tracing::info!("playout worker stopped");
}

fn play_item(ctx: &WorkerCtx, item: PlayoutItem) {
    let start = Instant::now();

    if let Err(e) = ctx.gpio.activate() {
        tracing::warn!(error = %e, "GPIO activation failed");
    }
    emit(&ctx.shared, PlayoutEvent::local(&item, PlayoutStatus::Playing, None, None));

    let mut segments = vec![item.audio_path.as_path()];
    if let Some(eom) = item.eom_path.as_deref() {
        segments.push(eom);
    }

    let mut play_success = true;
    let mut error_msg: Option<String> = None;
    for segment in segments {
        if ctx.interrupt_flag.load(Ordering::SeqCst) {
            break;
        }
        match play_segment(ctx, segment) {
            Ok(()) => {}
            Err(e) => {
                if !ctx.interrupt_flag.load(Ordering::SeqCst) {
                    error_msg = Some(e.to_string());
                }
                play_success = false;
                break;
            }
        }
    }

    if let Err(e) = ctx.gpio.deactivate() {
        tracing::warn!(error = %e, "GPIO deactivation failed");
    }

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    let interrupted = ctx.interrupt_flag.load(Ordering::SeqCst);

    let mut queue = ctx.queue.lock().unwrap_or_else(|e| e.into_inner());
    let status = if interrupted {
        match queue.requeue_interrupted(item.queue_id, "preempted") {
            Ok(requeued) => {
                tracing::info!(alert = %item.event_code, new_queue_id = requeued.queue_id, "re-queued interrupted alert");
            }
            Err(e) => tracing::error!(error = %e, "failed to re-queue interrupted alert"),
        }
        ctx.interrupt_flag.store(false, Ordering::SeqCst);
        PlayoutStatus::Interrupted
    } else if play_success {
        let _ = queue.mark_completed(item.queue_id, true, None, latency_ms);
        PlayoutStatus::Completed
    } else {
        let _ = queue.mark_completed(item.queue_id, false, error_msg.clone(), latency_ms);
        PlayoutStatus::Failed
    };
    drop(queue);

    tracing::info!(status = ?status, event_code = %item.event_code, latency_ms, "playout finished");
    emit(&ctx.shared, PlayoutEvent::local(&item, status, Some(latency_ms), error_msg));
}

/// Spawn and poll a single segment to completion, interruption, or stop
/// (§4.7 step 5).
fn play_segment(ctx: &WorkerCtx, segment: &Path) -> Result<(), crate::error::PlaybackError> {
    use crate::error::PlaybackError;

    if !segment.exists() {
        return Err(PlaybackError::MissingFile(segment.to_path_buf()));
    }
    let Some(argv) = ctx.player_cmd.as_ref() else {
        return Err(PlaybackError::Spawn(std::io::Error::new(std::io::ErrorKind::NotFound, "no player command configured")));
    };

    let child = player::spawn(argv, segment)?;
    *ctx.current_process.lock().unwrap_or_else(|e| e.into_inner()) = Some(child);

    loop {
        if ctx.stop_flag.load(Ordering::SeqCst) || ctx.interrupt_flag.load(Ordering::SeqCst) {
            terminate_current(ctx);
            return Err(PlaybackError::Interrupted);
        }

        let should_preempt = {
            let queue = ctx.queue.lock().unwrap_or_else(|e| e.into_inner());
            match (queue.peek(), queue.current_item()) {
                (Some(next), Some(current)) => next.should_preempt(current),
                _ => false,
            }
        };
        if should_preempt {
            ctx.interrupt_flag.store(true, Ordering::SeqCst);
            terminate_current(ctx);
            return Err(PlaybackError::Interrupted);
        }

        let exit_status = {
            let mut guard = ctx.current_process.lock().unwrap_or_else(|e| e.into_inner());
            guard.as_mut().and_then(|c| c.try_wait().ok().flatten())
        };
        if let Some(status) = exit_status {
            *ctx.current_process.lock().unwrap_or_else(|e| e.into_inner()) = None;
            return match status.code() {
                Some(0) => Ok(()),
                Some(code) => Err(PlaybackError::PlayerExit(code)),
                None => Err(PlaybackError::PlayerExit(-1)),
            };
        }

        std::thread::sleep(player::POLL_INTERVAL);
    }
}

fn terminate_current(ctx: &WorkerCtx) {
    let mut guard = ctx.current_process.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(child) = guard.as_mut() {
        player::terminate(child);
    }
    *guard = None;
}

fn emit(shared: &Arc<Mutex<SharedState>>, event: PlayoutEvent) {
    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
    if guard.events.len() >= EVENT_HISTORY_CAPACITY {
        guard.events.remove(0);
    }
    guard.events.push(event.clone());
    for listener in &guard.listeners {
        listener(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::NoopGpioController;
    use station_core::precedence::{Precedence, Severity, Urgency};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::SystemTime;

    fn item(queue: &mut PlayoutQueue, precedence: Precedence, code: &str, audio_path: &str) -> PlayoutItem {
        PlayoutItem {
            queue_id: queue.next_queue_id(),
            precedence,
            severity: Severity::UNKNOWN,
            urgency: Urgency::UNKNOWN,
            origin_timestamp: SystemTime::now(),
            event_code: code.into(),
            event_name: code.into(),
            same_header: None,
            audio_path: audio_path.into(),
            eom_path: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn missing_audio_file_is_marked_failed() {
        let mut queue = PlayoutQueue::new();
        let it = item(&mut queue, Precedence::LOCAL, "RWT", "/nonexistent/alert.wav");
        queue.enqueue(it, false);
        let queue = Arc::new(Mutex::new(queue));

        let events = Arc::new(StdMutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let mut worker = PlayoutWorker::new(queue, None, Arc::new(NoopGpioController));
        worker.register_event_listener(Box::new(move |event| {
            events_clone.lock().unwrap().push(event.status);
        }));

        assert!(worker.start());
        std::thread::sleep(Duration::from_millis(300));
        worker.stop(None);

        let statuses = events.lock().unwrap();
        assert_eq!(statuses.as_slice(), [PlayoutStatus::Pending, PlayoutStatus::Playing, PlayoutStatus::Failed]);
    }

    #[test]
    fn double_start_is_rejected() {
        let queue = Arc::new(Mutex::new(PlayoutQueue::new()));
        let mut worker = PlayoutWorker::new(queue, None, Arc::new(NoopGpioController));
        assert!(worker.start());
        assert!(!worker.start());
        worker.stop(None);
    }

    #[test]
    fn status_reports_player_and_gpio_presence() {
        let queue = Arc::new(Mutex::new(PlayoutQueue::new()));
        let worker = PlayoutWorker::new(queue, Some(vec!["aplay".into()]), Arc::new(NoopGpioController));
        let status = worker.status();
        assert!(status.has_player);
        assert!(status.has_gpio);
        assert!(!status.current_playback);
    }
}
