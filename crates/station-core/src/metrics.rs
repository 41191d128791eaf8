//! Per-source metric snapshots (§3, `AudioMetrics`).

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Minimum interval between successive `AudioMetrics` updates for a single
/// source (§3: "not updated more often than once per 100 ms per source").
pub const METRICS_RATE_LIMIT_MS: u64 = 100;

/// Point-in-time metrics snapshot for one source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioMetrics {
    /// Unix timestamp (seconds, fractional) the snapshot was taken.
    pub timestamp: f64,
    /// Peak level in dBFS.
    pub peak_db: f32,
    /// RMS level in dBFS.
    pub rms_db: f32,
    /// Total frames captured by the owning source.
    pub frames_captured: u64,
    /// Whether the silence state machine currently considers this source silent.
    pub silence_detected: bool,
    /// Internal adapter queue fill fraction, `[0, 1]`.
    pub buffer_utilisation: f32,
    /// Opaque source-kind-specific metadata (e.g. stream title metadata).
    pub metadata: HashMap<String, String>,
}

impl AudioMetrics {
    /// Build a snapshot stamped with the current wall-clock time.
    pub fn now(
        peak_db: f32,
        rms_db: f32,
        frames_captured: u64,
        silence_detected: bool,
        buffer_utilisation: f32,
        metadata: HashMap<String, String>,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            timestamp,
            peak_db,
            rms_db,
            frames_captured,
            silence_detected,
            buffer_utilisation: buffer_utilisation.clamp(0.0, 1.0),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_utilisation_is_clamped() {
        let m = AudioMetrics::now(-10.0, -20.0, 0, false, 2.5, HashMap::new());
        assert_eq!(m.buffer_utilisation, 1.0);
        let m = AudioMetrics::now(-10.0, -20.0, 0, false, -1.0, HashMap::new());
        assert_eq!(m.buffer_utilisation, 0.0);
    }
}
