//! Manual alert injection, bypassing the decoder entirely.
//!
//! The overview names "externally injected alerts" as one of the audio
//! core's first-class concerns alongside decoded ones; this command is the
//! manual-testing seam for that path, exercising precedence classification,
//! queueing, and playout/GPIO wiring without needing a live SAME signal.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use clap::Args;
use station_config::StationConfig;
use station_core::AlertEvent;
use station_decoder::ToneBurstDecoder;
use station_playout::NoopGpioController;
use station_runtime::{AlertAudioLibrary, CoreRuntime};
use station_sources::cpal_backend::CpalBackend;

#[derive(Args)]
pub struct InjectTestAlertArgs {
    /// Directory holding `{EVENT_CODE}.wav`/`EOM.wav` alert audio segments.
    #[arg(long)]
    alert_library: std::path::PathBuf,

    /// Three-letter event code, e.g. `RWT`, `TOR`, `EAN`.
    #[arg(long, default_value = "RWT")]
    event_code: String,

    /// Originator code, e.g. `WXR`, `CIV`, `EAS`.
    #[arg(long, default_value = "CIV")]
    originator: String,

    /// Comma-separated 6-digit FIPS location codes.
    #[arg(long, value_delimiter = ',')]
    location_codes: Vec<String>,

    /// How long to let playout run before reporting status and exiting, in
    /// milliseconds.
    #[arg(long, default_value_t = 3_000)]
    settle_ms: u64,
}

pub fn run(args: InjectTestAlertArgs, config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = StationConfig::load(config_path)?;
    let audio_library = AlertAudioLibrary::new(args.alert_library);

    let mut runtime = CoreRuntime::new(
        config,
        Arc::new(CpalBackend::new()),
        Arc::new(NoopGpioController),
        Box::new(ToneBurstDecoder::new("inject-test-alert", "RWT", vec![])),
        audio_library,
    )?;

    runtime.start()?;

    let event = AlertEvent {
        detected_at: SystemTime::now(),
        source_name: "inject-test-alert".to_string(),
        event_code: args.event_code.clone(),
        originator: args.originator,
        location_codes: args.location_codes,
        raw_header: Vec::new(),
        captured_audio_handle: None,
    };
    runtime.inject_alert(event);
    tracing::info!(event_code = %args.event_code, "test alert injected");

    std::thread::sleep(Duration::from_millis(args.settle_ms));

    let status = runtime.status();
    println!(
        "playout queue size={} current_playback={}",
        status.playout_queue.size, status.playout_worker.current_playback
    );

    runtime.stop();
    Ok(())
}
