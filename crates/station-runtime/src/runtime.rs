//! `CoreRuntime` (§9 design note): the single composition root owning the
//! `IngestController`, the decoder task, and the `PlayoutWorker`. No global
//! mutable singletons — every collaborator receives an explicit reference.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use station_bus::SubscriberAdapter;
use station_config::StationConfig;
use station_core::precedence::PrecedenceConfig as CorePrecedenceConfig;
use station_core::{AlertEvent, PlayoutQueue};
use station_decoder::{ContinuousDecoderTask, DecoderConfig, SameDecoder};
use station_playout::{GpioController, PlayoutWorker};
use station_sources::backend::AudioBackend;
use station_sources::IngestController;

use crate::alert_bridge::{self, AlertAudioLibrary};
use crate::error::RuntimeError;
use crate::status::{self, StationStatus};

/// Decoder block size, 10 ms at the decoder's expected 16 kHz sample rate
/// (§4.5 step 1a: "10 ms worth is recommended").
const DECODER_BLOCK_SIZE_SAMPLES: usize = 160;
/// Subscriber id the decoder task registers on the active source's bus.
const DECODER_SUBSCRIBER_ID: &str = "decoder";

/// Owns every live collaborator wired together at startup: the source
/// registry/capture threads ([`IngestController`]), the alert decode loop
/// ([`ContinuousDecoderTask`]), and the playout queue/worker
/// ([`PlayoutQueue`]/[`PlayoutWorker`]).
///
/// Construction validates and loads the persisted [`StationConfig`] but does
/// not start anything; call [`CoreRuntime::start`] to spin up capture,
/// decode, and playout threads.
pub struct CoreRuntime {
    config: StationConfig,
    ingest: IngestController,
    queue: Arc<Mutex<PlayoutQueue>>,
    playout: PlayoutWorker,
    decoder_task: Option<DecoderTaskHolder>,
    decoder_config: DecoderConfig,
    audio_library: AlertAudioLibrary,
}

impl CoreRuntime {
    /// Assemble a runtime from `config`, registering every configured
    /// source against `backend` and wiring a [`PlayoutWorker`] over a fresh
    /// queue. `gpio` and `decoder` are the two external collaborators named
    /// in §6.4/§6.5; `audio_library` resolves `AlertEvent`s to playable
    /// segments (see [`crate::alert_bridge`]).
    pub fn new(
        config: StationConfig,
        backend: Arc<dyn AudioBackend>,
        gpio: Arc<dyn GpioController>,
        decoder: Box<dyn SameDecoder>,
        audio_library: AlertAudioLibrary,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let mut ingest = IngestController::new("station-audio", backend);
        for source in &config.sources.sources {
            if !ingest.add(source.clone()) {
                return Err(RuntimeError::InvalidSource {
                    name: source.name.clone(),
                    reason: "duplicate source name".to_string(),
                });
            }
        }
        if !config.sources.sources.iter().any(|s| s.enabled) {
            return Err(RuntimeError::NoSourceConfigured);
        }

        let queue = Arc::new(Mutex::new(PlayoutQueue::new()));
        let player_cmd = config.player.is_configured().then(|| config.player.argv.clone());
        let playout = PlayoutWorker::new(Arc::clone(&queue), player_cmd, gpio);

        let decoder_config = DecoderConfig::new(DECODER_BLOCK_SIZE_SAMPLES);

        Ok(Self {
            config,
            ingest,
            queue,
            playout,
            decoder_task: Some(DecoderTaskHolder::Pending(decoder)),
            decoder_config,
            audio_library,
        })
    }

    /// Start every enabled source, the playout worker, and the decoder task
    /// over the currently [`IngestController::active_source`]. Returns an
    /// error if no source became active.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        self.ingest.start_all();
        self.playout.start();

        let Some(active) = self.ingest.active_source().map(str::to_string) else {
            return Err(RuntimeError::NoSourceConfigured);
        };

        let decoder = match self.decoder_task.take() {
            Some(DecoderTaskHolder::Running(task)) => {
                // Already running; nothing to do on a repeated start().
                self.decoder_task = Some(DecoderTaskHolder::Running(task));
                return Ok(());
            }
            Some(DecoderTaskHolder::Pending(decoder)) => decoder,
            None => return Ok(()),
        };

        let Some(adapter) = self.ingest.get(&active) else {
            self.decoder_task = Some(DecoderTaskHolder::Pending(decoder));
            return Err(RuntimeError::NoSourceConfigured);
        };
        let subscriber = Arc::new(SubscriberAdapter::new(
            self.ingest.broadcast_bus(),
            DECODER_SUBSCRIBER_ID,
            adapter.sample_rate_hz(),
            adapter.channels(),
        )?);

        let precedence = core_precedence(&self.config.precedence);
        let queue = Arc::clone(&self.queue);
        let library = self.audio_library.clone();
        let callback: Arc<dyn Fn(AlertEvent) + Send + Sync> = Arc::new(move |event| {
            let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
            let item = alert_bridge::bridge(&event, &mut queue, &precedence, &library);
            let preempt = queue.enqueue(item, true);
            if preempt {
                tracing::info!(event_code = %event.event_code, "bridged alert preempts current playback");
            }
        });

        let active_for_watchdog = active.clone();
        let on_watchdog: Arc<dyn Fn() + Send + Sync> = {
            // The watchdog needs to call back into the ingest controller,
            // which this closure cannot borrow across threads; instead it
            // logs, matching the teacher's own pattern of keeping restart
            // decisions in the foreground where locks are uncontended.
            Arc::new(move || {
                tracing::warn!(source = %active_for_watchdog, "decoder watchdog tripped, restart must be requested by the caller");
            })
        };

        let mut task = ContinuousDecoderTask::new(subscriber, decoder, callback, on_watchdog, self.decoder_config.clone());
        task.start();
        self.decoder_task = Some(DecoderTaskHolder::Running(task));
        Ok(())
    }

    /// Stop the decoder task, the playout worker, and every source.
    pub fn stop(&mut self) {
        if let Some(DecoderTaskHolder::Running(mut task)) = self.decoder_task.take() {
            task.stop();
        }
        self.playout.stop(Some(Duration::from_secs(5)));
        self.ingest.stop_all();
    }

    /// Restart the active source, e.g. in response to the decoder watchdog
    /// (§4.5: "the caller is expected to bind this to
    /// `ingest_controller.ensure_running`").
    pub fn ensure_active_source_running(&mut self, reason: &str) -> bool {
        let Some(name) = self.ingest.active_source().map(str::to_string) else {
            return false;
        };
        self.ingest.ensure_running(&name, reason)
    }

    /// A single immutable snapshot of the whole core (§6.3).
    pub fn status(&self) -> StationStatus {
        let decoder_status = match &self.decoder_task {
            Some(DecoderTaskHolder::Running(task)) => task.status(),
            _ => station_decoder::DecoderStatus {
                running: false,
                audio_flowing: false,
                samples_processed: 0,
                samples_per_second: 0.0,
                runtime_seconds: 0.0,
                decoder_synced: false,
                decoder_in_message: false,
                alerts_detected: 0,
                last_activity: None,
                time_since_activity: 0.0,
                restart_count: 0,
                watchdog_timeout: self.decoder_config.watchdog_timeout.as_secs_f64(),
            },
        };

        let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        StationStatus {
            sources: status::source_snapshots(&self.ingest),
            bus: status::bus_snapshot(&self.ingest),
            decoder: decoder_status,
            playout_queue: status::playout_queue_snapshot(&queue),
            playout_worker: status::playout_worker_snapshot(&self.playout),
        }
    }

    /// Directly enqueue an externally-sourced alert, bypassing the decoder
    /// (overview: "plays decoded or externally injected alerts"). Used by
    /// manual test-alert tooling and any future non-SAME alert source.
    pub fn inject_alert(&self, event: AlertEvent) {
        let precedence = core_precedence(&self.config.precedence);
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let item = alert_bridge::bridge(&event, &mut queue, &precedence, &self.audio_library);
        let preempted = queue.enqueue(item, true);
        tracing::info!(event_code = %event.event_code, preempted, "injected externally-sourced alert");
    }

    /// The persisted configuration this runtime was built from.
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// The shared playout queue, for injecting test/manual alerts.
    pub fn playout_queue(&self) -> &Arc<Mutex<PlayoutQueue>> {
        &self.queue
    }
}

/// Holds the decoder either un-started (constructed, not yet wrapped in a
/// task) or running, so `start()`/`status()` don't need an `Option` of an
/// `Option`.
enum DecoderTaskHolder {
    Pending(Box<dyn SameDecoder>),
    Running(ContinuousDecoderTask),
}

fn core_precedence(config: &station_config::PrecedenceConfig) -> CorePrecedenceConfig {
    CorePrecedenceConfig {
        national_codes: config.national_codes(),
        state_codes: config.state_codes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_decoder::ToneBurstDecoder;
    use station_playout::NoopGpioController;
    use station_sources::cpal_backend::CpalBackend;
    use station_sources::{WavSpec, write_wav};
    use std::collections::HashMap;

    fn file_source(name: &str, path: &std::path::Path) -> station_core::SourceConfig {
        let mut kind_specific = HashMap::new();
        kind_specific.insert("path".to_string(), path.to_string_lossy().to_string());
        station_core::SourceConfig {
            name: name.to_string(),
            kind: station_core::SourceKind::File,
            enabled: true,
            priority: 1,
            sample_rate_hz: 16_000,
            channels: 1,
            buffer_frames: 512,
            silence_threshold_db: -60.0,
            silence_duration_s: 5.0,
            kind_specific,
        }
    }

    fn backend() -> Arc<dyn AudioBackend> {
        Arc::new(CpalBackend::new())
    }

    #[test]
    fn rejects_a_config_with_no_enabled_sources() {
        let config = StationConfig::default();
        let result = CoreRuntime::new(
            config,
            backend(),
            Arc::new(NoopGpioController),
            Box::new(ToneBurstDecoder::new("wx1", "RWT", vec![])),
            AlertAudioLibrary::new("/tmp/alerts"),
        );
        assert!(matches!(result, Err(RuntimeError::NoSourceConfigured)));
    }

    #[test]
    fn starts_ingest_decoder_and_playout_over_a_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("wx1.wav");
        write_wav(&wav_path, &vec![0.95_f32; 32_000], WavSpec { channels: 1, sample_rate: 16_000, bits_per_sample: 32 }).unwrap();

        let mut config = StationConfig::default();
        config.sources.sources.push(file_source("wx1", &wav_path));

        let mut runtime = CoreRuntime::new(
            config,
            backend(),
            Arc::new(NoopGpioController),
            Box::new(ToneBurstDecoder::new("wx1", "RWT", vec![])),
            AlertAudioLibrary::new(dir.path()),
        )
        .unwrap();

        runtime.start().unwrap();
        std::thread::sleep(Duration::from_millis(300));

        let status = runtime.status();
        assert_eq!(status.sources.len(), 1);
        assert_eq!(status.sources[0].name, "wx1");
        assert!(status.decoder.running);

        runtime.stop();
    }
}
