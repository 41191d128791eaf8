//! Source descriptors and runtime state (§3, `SourceConfig` / `SourceState`).

use std::collections::HashMap;
use std::time::Instant;

/// Kind of audio source backing a [`SourceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Software-defined radio receiver.
    Sdr,
    /// ALSA device (Linux).
    Alsa,
    /// PulseAudio/PipeWire device.
    Pulse,
    /// Local audio file, looped or played once.
    File,
    /// Network stream (Icecast/Shoutcast/HTTP).
    Stream,
}

/// Immutable descriptor of a configured audio source.
///
/// Created from the persisted source registry at boot (§6.6) and replaced
/// atomically on reconfiguration; never mutated in place.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceConfig {
    /// Unique, non-empty source name.
    pub name: String,
    /// Source kind, drives adapter factory dispatch.
    pub kind: SourceKind,
    /// Whether this source participates in selection/auto-start.
    pub enabled: bool,
    /// Selection priority; lower value wins (§4.4).
    pub priority: u32,
    /// Sample rate this source publishes at.
    pub sample_rate_hz: u32,
    /// Channel count, 1 (mono) or 2 (stereo).
    pub channels: u16,
    /// Capture buffer size in frames.
    pub buffer_frames: usize,
    /// Silence threshold in dBFS (negative).
    pub silence_threshold_db: f32,
    /// Continuous seconds below threshold before a silence alert fires.
    pub silence_duration_s: f32,
    /// Opaque kind-specific parameters (device id, path, URL, squelch, ...).
    pub kind_specific: HashMap<String, String>,
}

impl SourceConfig {
    /// Validate the invariants listed in §3: non-empty name, positive rate,
    /// valid channel count, positive buffer size and silence duration.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("source name must not be empty".into());
        }
        if self.sample_rate_hz == 0 {
            return Err(format!("source '{}': sample_rate_hz must be positive", self.name));
        }
        if self.channels != 1 && self.channels != 2 {
            return Err(format!("source '{}': channels must be 1 or 2", self.name));
        }
        if self.buffer_frames == 0 {
            return Err(format!("source '{}': buffer_frames must be positive", self.name));
        }
        if self.silence_threshold_db >= 0.0 {
            return Err(format!(
                "source '{}': silence_threshold_db must be negative",
                self.name
            ));
        }
        if self.silence_duration_s < 0.0 {
            return Err(format!(
                "source '{}': silence_duration_s must not be negative",
                self.name
            ));
        }
        Ok(())
    }
}

/// Runtime lifecycle state of a [`crate::SourceConfig`]'s adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// No capture thread running.
    Stopped,
    /// Capture thread spawned, handle not yet opened.
    Starting,
    /// Capture thread is publishing chunks.
    Running,
    /// Reconnect attempts exhausted; the source gave up.
    Error,
    /// Transient I/O failure, reconnect in progress.
    Disconnected,
}

/// Per-source runtime status, owned by the `SourceAdapter`.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// Current lifecycle status.
    pub status: SourceStatus,
    /// Last error message recorded, if any.
    pub last_error: Option<String>,
    /// Consecutive reconnect attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// Total frames captured since `start()`.
    pub frames_captured: u64,
    /// When the adapter was started.
    pub start_time: Option<Instant>,
    /// When the last chunk was captured.
    pub last_chunk_time: Option<Instant>,
    /// Number of times `restart()` has completed.
    pub restart_count: u32,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            status: SourceStatus::Stopped,
            last_error: None,
            reconnect_attempts: 0,
            frames_captured: 0,
            start_time: None,
            last_chunk_time: None,
            restart_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SourceConfig {
        SourceConfig {
            name: "wx1".into(),
            kind: SourceKind::Sdr,
            enabled: true,
            priority: 1,
            sample_rate_hz: 48_000,
            channels: 1,
            buffer_frames: 1024,
            silence_threshold_db: -60.0,
            silence_duration_s: 5.0,
            kind_specific: HashMap::new(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let mut cfg = base_config();
        cfg.name = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_sample_rate_rejected() {
        let mut cfg = base_config();
        cfg.sample_rate_hz = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_channel_count_rejected() {
        let mut cfg = base_config();
        cfg.channels = 3;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn positive_silence_threshold_rejected() {
        let mut cfg = base_config();
        cfg.silence_threshold_db = 3.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_state_is_stopped() {
        let state = SourceState::default();
        assert_eq!(state.status, SourceStatus::Stopped);
        assert_eq!(state.reconnect_attempts, 0);
    }
}
