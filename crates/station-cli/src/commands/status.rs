//! Status-snapshot command.
//!
//! This crate has no IPC/daemon layer (out of scope for the audio core
//! proper): `station-audio status` cannot attach to an already-running
//! `run` process. Instead it brings its own `CoreRuntime` up, lets ingest
//! settle briefly, takes one snapshot, and tears back down. Useful to
//! sanity-check a configuration's sources/player/precedence wiring; not a
//! substitute for querying a live station.

use std::time::Duration;

use clap::Args;
use station_config::StationConfig;
use station_decoder::ToneBurstDecoder;
use station_playout::NoopGpioController;
use station_runtime::{AlertAudioLibrary, CoreRuntime};
use station_sources::cpal_backend::CpalBackend;

#[derive(Args)]
pub struct StatusArgs {
    /// How long to let sources settle before sampling the snapshot, in
    /// milliseconds.
    #[arg(long, default_value_t = 500)]
    settle_ms: u64,
}

pub fn run(args: StatusArgs, config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = StationConfig::load(config_path)?;
    let audio_library = AlertAudioLibrary::new(config.sources.sources.first().map_or_else(
        || std::path::PathBuf::from("."),
        |_| station_config::user_config_dir().join("alerts"),
    ));

    let mut runtime = CoreRuntime::new(
        config,
        std::sync::Arc::new(CpalBackend::new()),
        std::sync::Arc::new(NoopGpioController),
        Box::new(ToneBurstDecoder::new("status-probe", "RWT", vec![])),
        audio_library,
    )?;

    runtime.start()?;
    std::thread::sleep(Duration::from_millis(args.settle_ms));
    let status = runtime.status();
    runtime.stop();

    println!("{}", serde_json::to_string_pretty(&StatusJson::from(&status))?);
    Ok(())
}

/// A `serde`-friendly projection of [`station_runtime::StationStatus`].
///
/// `StationStatus` itself carries no `Serialize` impl (it is an internal
/// snapshot type shared across crates, not a wire format); this command is
/// the one place that needs JSON, so the projection lives here rather than
/// pulling `serde` into `station-runtime` for a single caller.
#[derive(serde::Serialize)]
struct StatusJson {
    sources: Vec<SourceJson>,
    bus: BusJson,
    decoder_running: bool,
    decoder_synced: bool,
    decoder_alerts_detected: u64,
    playout_queue_size: usize,
    playout_completed_count: usize,
    playout_worker_running: bool,
    playout_current_playback: bool,
}

#[derive(serde::Serialize)]
struct SourceJson {
    name: String,
    kind: String,
    status: String,
    enabled: bool,
    priority: u32,
    peak_db: f32,
    rms_db: f32,
    error_message: Option<String>,
}

#[derive(serde::Serialize)]
struct BusJson {
    name: String,
    subscribers: usize,
    published: u64,
    dropped: u64,
}

impl From<&station_runtime::StationStatus> for StatusJson {
    fn from(status: &station_runtime::StationStatus) -> Self {
        Self {
            sources: status
                .sources
                .iter()
                .map(|s| SourceJson {
                    name: s.name.clone(),
                    kind: format!("{:?}", s.kind),
                    status: format!("{:?}", s.status),
                    enabled: s.enabled,
                    priority: s.priority,
                    peak_db: s.metrics.peak_db,
                    rms_db: s.metrics.rms_db,
                    error_message: s.error_message.clone(),
                })
                .collect(),
            bus: BusJson {
                name: status.bus.name.clone(),
                subscribers: status.bus.subscribers,
                published: status.bus.published,
                dropped: status.bus.dropped,
            },
            decoder_running: status.decoder.running,
            decoder_synced: status.decoder.decoder_synced,
            decoder_alerts_detected: status.decoder.alerts_detected,
            playout_queue_size: status.playout_queue.size,
            playout_completed_count: status.playout_queue.completed_count,
            playout_worker_running: status.playout_worker.running,
            playout_current_playback: status.playout_worker.current_playback,
        }
    }
}
