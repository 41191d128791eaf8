//! Foreground `run` command: bring the station up and block until signalled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use station_config::StationConfig;
use station_decoder::ToneBurstDecoder;
use station_playout::NoopGpioController;
use station_runtime::{AlertAudioLibrary, CoreRuntime};
use station_sources::cpal_backend::CpalBackend;

/// How often the foreground loop polls the decoder watchdog via
/// [`CoreRuntime::ensure_active_source_running`] (§4.5's restart contract).
const SUPERVISOR_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args)]
pub struct RunArgs {
    /// Directory holding `{EVENT_CODE}.wav`/`EOM.wav` alert audio segments.
    #[arg(long)]
    alert_library: std::path::PathBuf,
}

pub fn run(args: RunArgs, config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = StationConfig::load(config_path)?;
    tracing::info!(path = %config_path.display(), sources = config.sources.sources.len(), "loaded station configuration");

    let audio_library = AlertAudioLibrary::new(args.alert_library);

    // `ToneBurstDecoder` stands in for the real SAME bit-stream decoder
    // (§6.4 treats it as an external collaborator this core never
    // implements); a production deployment supplies its own `SameDecoder`.
    let mut runtime = CoreRuntime::new(
        config,
        Arc::new(CpalBackend::new()),
        Arc::new(NoopGpioController),
        Box::new(ToneBurstDecoder::new("run", "RWT", vec![])),
        audio_library,
    )?;

    runtime.start()?;
    tracing::info!("station audio core running, press Ctrl-C to stop");

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || shutdown_handler.store(true, Ordering::SeqCst))?;

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(SUPERVISOR_POLL_INTERVAL);
        if !runtime.status().decoder.audio_flowing {
            runtime.ensure_active_source_running("decoder watchdog or silent source");
        }
    }

    tracing::info!("shutdown requested, stopping");
    runtime.stop();
    Ok(())
}
