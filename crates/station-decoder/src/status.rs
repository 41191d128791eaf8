//! `DecoderStatus` snapshot (§4.5).

/// Point-in-time snapshot of a [`crate::ContinuousDecoderTask`]'s progress.
#[derive(Debug, Clone)]
pub struct DecoderStatus {
    /// Whether the worker thread is running.
    pub running: bool,
    /// Whether samples have been delivered recently (not underrunning).
    pub audio_flowing: bool,
    /// Total samples fed to the decoder since `start()`.
    pub samples_processed: u64,
    /// `samples_processed` averaged over `runtime_seconds`.
    pub samples_per_second: f64,
    /// Seconds since `start()`.
    pub runtime_seconds: f64,
    /// The decoder's own sync state.
    pub decoder_synced: bool,
    /// The decoder's own in-message state.
    pub decoder_in_message: bool,
    /// Total alerts emitted by the decoder since `start()`.
    pub alerts_detected: u64,
    /// Seconds-since-epoch of the last sample delivery, if any.
    pub last_activity: Option<f64>,
    /// Seconds since `last_activity`; `0.0` if there has been none yet.
    pub time_since_activity: f64,
    /// Number of times the watchdog has triggered `ensure_running`.
    pub restart_count: u32,
    /// Configured watchdog timeout, in seconds.
    pub watchdog_timeout: f64,
}
