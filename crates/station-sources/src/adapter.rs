//! `SourceAdapter` (§4.1): one capture thread per configured source,
//! publishing normalised float32 PCM to a [`station_bus::BroadcastBus`] and
//! maintaining per-source metrics, waveform and spectrogram snapshots.
//!
//! Grounded on `app_core/audio/ingest.py`'s `AudioSourceAdapter` for the
//! capture-loop shape, metrics cadence, and the waveform/spectrogram ring
//! buffers, and on [`crate::backend::AudioBackend`] for the device-facing
//! half of device-kind sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use station_bus::BroadcastBus;
use station_core::{AudioChunk, AudioMetrics, SourceConfig, SourceKind, SourceState, SourceStatus};

use crate::backend::{AudioBackend, BackendStreamConfig};
use crate::metering::MeteringAndHealth;
use crate::{Error, Result};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);
const IDLE_SLEEP: Duration = Duration::from_millis(1);
const INTERNAL_QUEUE_CAPACITY: usize = 500;

const WAVEFORM_LEN: usize = 2048;
const SPECTROGRAM_FRAMES: usize = 100;
const FFT_SIZE: usize = 1024;
const SPECTROGRAM_BINS: usize = FFT_SIZE / 2;
const DB_FLOOR_FOR_NORMALISATION: f32 = 120.0;

/// Squelch hysteresis parameters for SDR-kind sources (§4.1 edge policy).
const SQUELCH_OPEN_MARGIN_DB: f32 = 2.5;
const SQUELCH_OPEN_MS: u64 = 100;
const SQUELCH_CLOSE_MS: u64 = 500;

/// One kind-specific pull of raw audio, used by the capture loop.
///
/// Implementors own the kind-specific handle (file, device, socket) and
/// translate it into interleaved float32 frames at the adapter's configured
/// rate and channel count. `read` must return quickly: a `None` with
/// `had_activity = false` drives the loop's idle sleep.
trait CaptureSource: Send {
    fn open(&mut self) -> Result<()>;
    fn read(&mut self) -> Result<CaptureRead>;
    fn close(&mut self);
}

enum CaptureRead {
    Chunk(Vec<f32>),
    NoDataIdle,
    NoDataActive,
}

/// Live per-adapter state shared between the capture thread and the public
/// handle. Lock scope is always short: a copy in, a copy out.
struct Shared {
    state: SourceState,
    metrics: AudioMetrics,
    waveform: Vec<f32>,
    spectrogram: Vec<Vec<f32>>,
    internal_queue: std::collections::VecDeque<AudioChunk>,
}

impl Shared {
    fn new(config: &SourceConfig) -> Self {
        Self {
            state: SourceState::default(),
            metrics: AudioMetrics::now(-120.0, -120.0, 0, false, 0.0, HashMap::new()),
            waveform: vec![0.0; WAVEFORM_LEN],
            spectrogram: vec![vec![0.0; SPECTROGRAM_BINS]; SPECTROGRAM_FRAMES],
            internal_queue: std::collections::VecDeque::with_capacity(INTERNAL_QUEUE_CAPACITY.min(64)),
        }
    }
}

/// A single configured audio source's capture thread and public handle.
///
/// Holds no kind-specific I/O itself; the capture loop is parameterised over
/// a [`CaptureSource`] chosen by [`AdapterHandle::new`] from `config.kind`.
pub struct AdapterHandle {
    config: SourceConfig,
    shared: Arc<Mutex<Shared>>,
    metering: Arc<MeteringAndHealth>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    bus: Arc<BroadcastBus>,
    backend: Arc<dyn AudioBackend>,
}

impl AdapterHandle {
    /// Build a stopped adapter for `config`, publishing into `bus` and using
    /// `backend` for device-kind capture.
    pub fn new(config: SourceConfig, bus: Arc<BroadcastBus>, backend: Arc<dyn AudioBackend>) -> Self {
        let metering = Arc::new(MeteringAndHealth::new(config.silence_threshold_db, config.silence_duration_s));
        let shared = Arc::new(Mutex::new(Shared::new(&config)));
        Self {
            config,
            shared,
            metering,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
            bus,
            backend,
        }
    }

    /// Configured name, used as the registry key by [`crate::IngestController`].
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configured priority (lower wins selection, §4.4).
    pub fn priority(&self) -> u32 {
        self.config.priority
    }

    /// Whether this source currently participates in selection/auto-start.
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Source kind, for status reporting (§6.3).
    pub fn kind(&self) -> SourceKind {
        self.config.kind
    }

    /// Configured sample rate, for status reporting (§6.3).
    pub fn sample_rate_hz(&self) -> u32 {
        self.config.sample_rate_hz
    }

    /// Configured channel count, for status reporting (§6.3).
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SourceStatus {
        self.lock().state.status
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Transitions Stopped→Starting→Running; idempotent for non-Stopped.
    pub fn start(&mut self) -> bool {
        if self.status() != SourceStatus::Stopped {
            return false;
        }

        {
            let mut shared = self.lock();
            shared.state.status = SourceStatus::Starting;
            shared.state.start_time = Some(Instant::now());
            shared.state.reconnect_attempts = 0;
            shared.state.last_error = None;
        }

        self.stop_flag.store(false, Ordering::SeqCst);

        let mut source = make_capture_source(&self.config, Arc::clone(&self.backend));
        let shared = Arc::clone(&self.shared);
        let metering = Arc::clone(&self.metering);
        let stop_flag = Arc::clone(&self.stop_flag);
        let bus = Arc::clone(&self.bus);
        let config = self.config.clone();

        let builder = std::thread::Builder::new().name(format!("audio-{}", config.name));
        let handle = builder.spawn(move || {
            if let Err(e) = source.open() {
                let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                guard.state.status = SourceStatus::Error;
                guard.state.last_error = Some(e.to_string());
                tracing::error!(source = %config.name, error = %e, "failed to open capture source");
                return;
            }

            {
                let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                guard.state.status = SourceStatus::Running;
            }

            capture_loop(&config, source.as_mut(), &shared, &metering, &stop_flag, &bus);
            source.close();

            let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
            guard.internal_queue.clear();
            if guard.state.status != SourceStatus::Error {
                guard.state.status = SourceStatus::Stopped;
            }
        });

        match handle {
            Ok(h) => {
                self.thread = Some(h);
                true
            }
            Err(e) => {
                let mut shared = self.lock();
                shared.state.status = SourceStatus::Error;
                shared.state.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Transitions any state→Stopped; blocks until the capture thread exits.
    pub fn stop(&mut self) {
        if self.status() == SourceStatus::Stopped {
            return;
        }
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        let mut shared = self.lock();
        shared.state.status = SourceStatus::Stopped;
        shared.internal_queue.clear();
    }

    /// `stop()` then `start()`, recorded against the restart counter.
    pub fn restart(&mut self, reason: &str) -> bool {
        tracing::info!(source = %self.config.name, reason, "restarting source");
        self.stop();
        let ok = self.start();
        if ok {
            self.lock().state.restart_count += 1;
        }
        ok
    }

    /// Non-blocking copy of the most recent metrics snapshot.
    pub fn metrics(&self) -> AudioMetrics {
        self.lock().metrics.clone()
    }

    /// Non-blocking copy of the waveform ring buffer (most recent 2048 samples).
    pub fn waveform_snapshot(&self) -> [f32; WAVEFORM_LEN] {
        let guard = self.lock();
        let mut out = [0.0_f32; WAVEFORM_LEN];
        out.copy_from_slice(&guard.waveform);
        out
    }

    /// Non-blocking copy of the last 100 FFT frames (waterfall spectrogram).
    pub fn spectrogram_snapshot(&self) -> Vec<Vec<f32>> {
        self.lock().spectrogram.clone()
    }

    /// Legacy pull interface for in-process consumers that do not subscribe
    /// to the broadcast bus.
    pub fn get_audio_chunk(&self, timeout: Duration) -> Option<AudioChunk> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut guard = self.lock();
                if let Some(chunk) = guard.internal_queue.pop_front() {
                    return Some(chunk);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Current runtime status snapshot (§3 `SourceState`).
    pub fn source_state(&self) -> SourceState {
        self.lock().state.clone()
    }

    /// Current health score from this adapter's metering instance.
    pub fn health_score(&self) -> crate::HealthScore {
        self.metering.health_score()
    }
}

#[allow(clippy::too_many_arguments)]
fn capture_loop(
    config: &SourceConfig,
    source: &mut dyn CaptureSource,
    shared: &Arc<Mutex<Shared>>,
    metering: &Arc<MeteringAndHealth>,
    stop_flag: &Arc<AtomicBool>,
    bus: &Arc<BroadcastBus>,
) {
    let mut squelch = SquelchState::new(config);
    let mut reconnect_attempts: u32 = 0;
    let mut last_metrics_update = Instant::now() - Duration::from_secs(1);

    while !stop_flag.load(Ordering::SeqCst) {
        match source.read() {
            Ok(CaptureRead::Chunk(mut samples)) => {
                reconnect_attempts = 0;

                if let Some(squelch) = squelch.as_mut() {
                    squelch.apply(&mut samples, metering.as_ref());
                }

                let chunk = AudioChunk::new(samples, config.sample_rate_hz, config.channels);
                let now = Instant::now();

                let metering_result = metering.process(chunk.samples());
                if let Some(event) = metering_result.silence_event {
                    tracing::debug!(source = %config.name, ?event, "silence state changed");
                }
                if let Some(event) = metering_result.clipping_event {
                    tracing::warn!(source = %config.name, samples_over_threshold = event.samples_over_threshold, "clipping detected");
                }

                {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    guard.state.frames_captured += chunk.frames() as u64;
                    guard.state.last_chunk_time = Some(now);

                    if now.duration_since(last_metrics_update) >= Duration::from_millis(station_core::METRICS_RATE_LIMIT_MS) {
                        update_waveform(&mut guard.waveform, chunk.samples());
                        update_spectrogram(&mut guard.spectrogram, chunk.samples());

                        let utilisation = guard.internal_queue.len() as f32 / INTERNAL_QUEUE_CAPACITY as f32;
                        guard.metrics = AudioMetrics::now(
                            metering_result.peak_db,
                            metering_result.rms_db,
                            guard.state.frames_captured,
                            metering_result.silence_detected,
                            utilisation,
                            HashMap::new(),
                        );
                        last_metrics_update = now;
                    }

                    if guard.internal_queue.len() >= INTERNAL_QUEUE_CAPACITY {
                        guard.internal_queue.pop_front();
                    }
                    guard.internal_queue.push_back(chunk.clone());
                }

                bus.publish(Arc::new(chunk));
            }
            Ok(CaptureRead::NoDataActive) => {
                // Had activity (e.g. partial decode) but no chunk yet; loop
                // immediately instead of sleeping (§4.1 step 2b).
            }
            Ok(CaptureRead::NoDataIdle) => {
                std::thread::sleep(IDLE_SLEEP);
            }
            Err(e) => {
                reconnect_attempts += 1;
                tracing::warn!(source = %config.name, error = %e, attempt = reconnect_attempts, "transient capture error");

                {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    guard.state.status = SourceStatus::Disconnected;
                    guard.state.reconnect_attempts = reconnect_attempts;
                    guard.state.last_error = Some(e.to_string());
                }

                if reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    guard.state.status = SourceStatus::Error;
                    guard.state.last_error = Some(
                        Error::CaptureFailed {
                            source: config.name.clone(),
                            attempts: reconnect_attempts,
                            message: e.to_string(),
                        }
                        .to_string(),
                    );
                    break;
                }

                std::thread::sleep(RECONNECT_BACKOFF);
                source.close();
                if source.open().is_ok() {
                    let mut guard = shared.lock().unwrap_or_else(|e| e.into_inner());
                    guard.state.status = SourceStatus::Running;
                }
            }
        }
    }
}

/// Downsample-or-shift update matching `ingest.py`'s `_update_waveform_buffer`.
fn update_waveform(buffer: &mut [f32], chunk: &[f32]) {
    if chunk.is_empty() {
        return;
    }
    let buffer_size = buffer.len();
    if chunk.len() >= buffer_size {
        let step = (chunk.len() / buffer_size).max(1);
        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = i * step;
            if idx < chunk.len() {
                *slot = chunk[idx];
            }
        }
    } else {
        let shift = chunk.len();
        buffer.copy_within(shift.., 0);
        buffer[buffer_size - shift..].copy_from_slice(chunk);
    }
}

/// Naive DFT magnitude spectrum over the last `FFT_SIZE` samples, Hamming
/// windowed and dB-normalised, matching `_update_spectrogram_buffer`.
///
/// The workspace carries no FFT crate, so this is O(`FFT_SIZE` ×
/// `SPECTROGRAM_BINS`) per update; acceptable at the metrics rate limit
/// (10 Hz) this is called at, not on the audio callback path.
fn update_spectrogram(buffer: &mut Vec<Vec<f32>>, chunk: &[f32]) {
    if chunk.len() < FFT_SIZE {
        return;
    }
    let window = &chunk[chunk.len() - FFT_SIZE..];

    let mut windowed = vec![0.0_f32; FFT_SIZE];
    for (i, sample) in window.iter().enumerate() {
        let hamming = 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE - 1) as f32).cos();
        windowed[i] = sample * hamming;
    }

    let mut frame = vec![0.0_f32; SPECTROGRAM_BINS];
    for (k, slot) in frame.iter_mut().enumerate() {
        let mut re = 0.0_f32;
        let mut im = 0.0_f32;
        for (n, sample) in windowed.iter().enumerate() {
            let angle = -2.0 * std::f32::consts::PI * k as f32 * n as f32 / FFT_SIZE as f32;
            re += sample * angle.cos();
            im += sample * angle.sin();
        }
        let magnitude = (re * re + im * im).sqrt().max(1e-10);
        let magnitude_db = 20.0 * magnitude.log10();
        *slot = ((magnitude_db + DB_FLOOR_FOR_NORMALISATION) / DB_FLOOR_FOR_NORMALISATION).clamp(0.0, 1.0);
    }

    buffer.remove(0);
    buffer.push(frame);
}

/// Carrier-squelch hysteresis for SDR-kind sources (§4.1 edge policy).
struct SquelchState {
    threshold_db: f32,
    open_ms: u64,
    close_ms: u64,
    is_open: bool,
    above_since: Option<Instant>,
    below_since: Option<Instant>,
}

impl SquelchState {
    fn new(config: &SourceConfig) -> Option<Self> {
        if config.kind != SourceKind::Sdr {
            return None;
        }
        Some(Self {
            threshold_db: config.silence_threshold_db,
            open_ms: SQUELCH_OPEN_MS,
            close_ms: SQUELCH_CLOSE_MS,
            is_open: false,
            above_since: None,
            below_since: None,
        })
    }

    /// Zero-fills `samples` in place when squelch is closed; chunks are
    /// still emitted so downstream consumers keep a continuous clock.
    fn apply(&mut self, samples: &mut [f32], metering: &MeteringAndHealth) {
        let rms = {
            let mean_sq = if samples.is_empty() {
                0.0
            } else {
                samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
            };
            mean_sq.sqrt()
        };
        let rms_db = 20.0 * rms.max(1e-10).log10();
        let _ = metering; // squelch decision uses the chunk's own RMS, not the shared meter's history

        let now = Instant::now();
        let open_margin = self.threshold_db + SQUELCH_OPEN_MARGIN_DB;

        if rms_db > open_margin {
            self.below_since = None;
            let since = *self.above_since.get_or_insert(now);
            if !self.is_open && now.duration_since(since).as_millis() as u64 >= self.open_ms {
                self.is_open = true;
            }
        } else {
            self.above_since = None;
        }

        if rms_db < self.threshold_db {
            let since = *self.below_since.get_or_insert(now);
            if self.is_open && now.duration_since(since).as_millis() as u64 >= self.close_ms {
                self.is_open = false;
            }
        } else {
            self.below_since = None;
        }

        if !self.is_open {
            samples.fill(0.0);
        }
    }
}

fn make_capture_source(config: &SourceConfig, backend: Arc<dyn AudioBackend>) -> Box<dyn CaptureSource> {
    match config.kind {
        SourceKind::File => Box::new(FileCaptureSource::new(config)),
        SourceKind::Sdr | SourceKind::Alsa | SourceKind::Pulse => Box::new(DeviceCaptureSource::new(config, backend)),
        SourceKind::Stream => Box::new(StreamCaptureSource::new(config)),
    }
}

/// Loops a configured WAV file, yielding `buffer_frames`-sized chunks.
struct FileCaptureSource {
    path: std::path::PathBuf,
    buffer_frames: usize,
    channels: u16,
    samples: Vec<f32>,
    cursor: usize,
}

impl FileCaptureSource {
    fn new(config: &SourceConfig) -> Self {
        Self {
            path: config.kind_specific.get("path").cloned().unwrap_or_default().into(),
            buffer_frames: config.buffer_frames,
            channels: config.channels,
            samples: Vec::new(),
            cursor: 0,
        }
    }
}

impl CaptureSource for FileCaptureSource {
    fn open(&mut self) -> Result<()> {
        if self.channels == 2 {
            let (stereo, _spec) = crate::wav::read_wav_stereo(&self.path)?;
            self.samples = interleave(&stereo.left, &stereo.right);
        } else {
            let (samples, _spec) = crate::wav::read_wav(&self.path)?;
            self.samples = samples;
        }
        self.cursor = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<CaptureRead> {
        if self.samples.is_empty() {
            return Ok(CaptureRead::NoDataIdle);
        }
        let frame_len = self.buffer_frames * self.channels as usize;
        let mut out = Vec::with_capacity(frame_len);
        while out.len() < frame_len {
            let remaining = self.samples.len() - self.cursor;
            let take = remaining.min(frame_len - out.len());
            out.extend_from_slice(&self.samples[self.cursor..self.cursor + take]);
            self.cursor += take;
            if self.cursor >= self.samples.len() {
                self.cursor = 0; // loop playback
            }
        }
        Ok(CaptureRead::Chunk(out))
    }

    fn close(&mut self) {}
}

fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(left.len() * 2);
    for (l, r) in left.iter().zip(right.iter()) {
        out.push(*l);
        out.push(*r);
    }
    out
}

/// Captures from an `AudioBackend` input device (Alsa/Pulse/Sdr kinds share
/// this path: device selection lives in `kind_specific["device"]`).
struct DeviceCaptureSource {
    backend: Arc<dyn AudioBackend>,
    device_name: Option<String>,
    sample_rate: u32,
    channels: u16,
    buffer_frames: usize,
    stream: Option<crate::backend::StreamHandle>,
    receiver: Option<std::sync::mpsc::Receiver<Vec<f32>>>,
}

impl DeviceCaptureSource {
    fn new(config: &SourceConfig, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            device_name: config.kind_specific.get("device").cloned(),
            sample_rate: config.sample_rate_hz,
            channels: config.channels,
            buffer_frames: config.buffer_frames,
            stream: None,
            receiver: None,
        }
    }
}

impl CaptureSource for DeviceCaptureSource {
    fn open(&mut self) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::sync_channel::<Vec<f32>>(INTERNAL_QUEUE_CAPACITY);
        let stream_config = BackendStreamConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_frames as u32,
            channels: self.channels,
            device_name: self.device_name.clone(),
        };
        let callback = Box::new(move |data: &[f32]| {
            let _ = tx.try_send(data.to_vec());
        });
        let error_callback = Box::new(|err: &str| {
            tracing::warn!(error = err, "device capture stream reported an error");
        });
        let handle = self.backend.build_input_stream(&stream_config, callback, error_callback)?;
        self.stream = Some(handle);
        self.receiver = Some(rx);
        Ok(())
    }

    fn read(&mut self) -> Result<CaptureRead> {
        let Some(rx) = self.receiver.as_ref() else {
            return Ok(CaptureRead::NoDataIdle);
        };
        match rx.recv_timeout(Duration::from_millis(20)) {
            Ok(data) => Ok(CaptureRead::Chunk(data)),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => Ok(CaptureRead::NoDataIdle),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => Err(Error::Stream("input stream disconnected".into())),
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.receiver = None;
    }
}

/// Reads raw interleaved float32 PCM from a `host:port` TCP endpoint
/// (`kind_specific["url"]`). Out-of-band metadata parsing for real Icecast
/// transports is a source-kind specific concern left for a future adapter.
struct StreamCaptureSource {
    url: String,
    channels: u16,
    buffer_frames: usize,
    socket: Option<std::net::TcpStream>,
}

impl StreamCaptureSource {
    fn new(config: &SourceConfig) -> Self {
        Self {
            url: config.kind_specific.get("url").cloned().unwrap_or_default(),
            channels: config.channels,
            buffer_frames: config.buffer_frames,
            socket: None,
        }
    }
}

impl CaptureSource for StreamCaptureSource {
    fn open(&mut self) -> Result<()> {
        let addr = self
            .url
            .strip_prefix("tcp://")
            .unwrap_or(&self.url)
            .to_string();
        let stream = std::net::TcpStream::connect(&addr).map_err(Error::Io)?;
        stream.set_read_timeout(Some(Duration::from_millis(50))).map_err(Error::Io)?;
        self.socket = Some(stream);
        Ok(())
    }

    fn read(&mut self) -> Result<CaptureRead> {
        use std::io::Read;
        let Some(socket) = self.socket.as_mut() else {
            return Ok(CaptureRead::NoDataIdle);
        };
        let frame_len = self.buffer_frames * self.channels as usize;
        let mut raw = vec![0_u8; frame_len * 4];
        match socket.read(&mut raw) {
            Ok(0) => Err(Error::Stream("stream source closed the connection".into())),
            Ok(n) if n < 4 => Ok(CaptureRead::NoDataActive),
            Ok(n) => {
                let usable = n - (n % 4);
                let samples = raw[..usable].chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect();
                Ok(CaptureRead::Chunk(samples))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                Ok(CaptureRead::NoDataIdle)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sdr_config() -> SourceConfig {
        SourceConfig {
            name: "wx1".into(),
            kind: SourceKind::Sdr,
            enabled: true,
            priority: 1,
            sample_rate_hz: 48_000,
            channels: 1,
            buffer_frames: 512,
            silence_threshold_db: -60.0,
            silence_duration_s: 1.0,
            kind_specific: HashMap::new(),
        }
    }

    #[test]
    fn waveform_shift_preserves_tail_order() {
        let mut buf = vec![0.0; 8];
        update_waveform(&mut buf, &[1.0, 2.0, 3.0]);
        assert_eq!(buf, vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn waveform_downsamples_when_chunk_exceeds_buffer() {
        let mut buf = vec![0.0; 4];
        let chunk: Vec<f32> = (0..16).map(|i| i as f32).collect();
        update_waveform(&mut buf, &chunk);
        assert_eq!(buf, vec![0.0, 4.0, 8.0, 12.0]);
    }

    #[test]
    fn spectrogram_ignores_short_chunks() {
        let mut buf = vec![vec![0.0; SPECTROGRAM_BINS]; SPECTROGRAM_FRAMES];
        update_spectrogram(&mut buf, &[0.0; 10]);
        assert!(buf.iter().all(|frame| frame.iter().all(|v| *v == 0.0)));
    }

    #[test]
    fn spectrogram_appends_one_frame_and_keeps_history_bounded() {
        let mut buf = vec![vec![0.0; SPECTROGRAM_BINS]; SPECTROGRAM_FRAMES];
        let tone: Vec<f32> = (0..FFT_SIZE).map(|i| (i as f32 * 0.1).sin()).collect();
        update_spectrogram(&mut buf, &tone);
        assert_eq!(buf.len(), SPECTROGRAM_FRAMES);
        assert!(buf.last().unwrap().iter().any(|v| *v > 0.0));
    }

    #[test]
    fn squelch_stays_closed_until_signal_present_for_open_ms() {
        let config = sdr_config();
        let mut squelch = SquelchState::new(&config).unwrap();
        let metering = MeteringAndHealth::new(-60.0, 1.0);
        let mut samples = vec![0.5_f32; 256];
        squelch.apply(&mut samples, &metering);
        assert!(samples.iter().all(|s| *s == 0.0), "squelch should still be closed on the first above-threshold chunk");
    }

    #[test]
    fn file_source_loops_playback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.1_f32, 0.2, 0.3, 0.4] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let mut config = sdr_config();
        config.kind = SourceKind::File;
        config.buffer_frames = 6;
        config.kind_specific.insert("path".into(), path.to_string_lossy().into_owned());

        let mut source = FileCaptureSource::new(&config);
        source.open().unwrap();
        let CaptureRead::Chunk(chunk) = source.read().unwrap() else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.len(), 6);
        assert_eq!(&chunk[..4], &[0.1, 0.2, 0.3, 0.4]);
        // loops back to the start for the remaining 2 samples
        assert_eq!(&chunk[4..], &[0.1, 0.2]);
    }

    #[test]
    fn tcp_stream_source_reads_raw_f32_pcm() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let writer = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            for s in [0.25_f32, -0.25].iter() {
                socket.write_all(&s.to_le_bytes()).unwrap();
            }
        });

        let mut config = sdr_config();
        config.kind = SourceKind::Stream;
        config.channels = 1;
        config.buffer_frames = 2;
        config.kind_specific.insert("url".into(), addr.to_string());

        let mut source = StreamCaptureSource::new(&config);
        source.open().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let read = source.read().unwrap();
        writer.join().unwrap();
        match read {
            CaptureRead::Chunk(samples) => assert!(!samples.is_empty()),
            _ => panic!("expected data from the stream source"),
        }
    }
}
