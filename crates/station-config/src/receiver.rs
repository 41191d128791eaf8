//! Persisted receiver tuning parameters for SDR-kind sources (§6.6
//! `ReceiverConfig`).
//!
//! These are the operator-facing fields for an SDR source; at boot they are
//! flattened into the corresponding [`station_core::SourceConfig`]'s
//! `kind_specific` map, since the capture layer only understands that
//! opaque string form (§4.1).

use std::collections::HashMap;

/// Tuning parameters for one SDR receiver.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReceiverConfig {
    /// Tuned frequency in Hz.
    pub frequency_hz: f64,
    /// Receiver sample rate in Hz (may differ from the adapter's published
    /// `sample_rate_hz` if the backend resamples).
    pub sample_rate_hz: u32,
    /// Demodulation mode, e.g. `"nfm"`, `"wfm"`, `"am"`.
    pub modulation: String,
    /// Squelch threshold in dBFS (negative); mirrors
    /// `SourceConfig.silence_threshold_db` for SDR sources but kept
    /// separate here since the operator tunes it independently of the
    /// silence-alert threshold.
    pub squelch_db: f32,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 162_400_000.0,
            sample_rate_hz: 48_000,
            modulation: "nfm".to_string(),
            squelch_db: -50.0,
        }
    }
}

impl ReceiverConfig {
    /// Flatten into the string-keyed `kind_specific` map a `SourceConfig`
    /// of kind `Sdr` expects.
    pub fn to_kind_specific(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("frequency_hz".to_string(), self.frequency_hz.to_string());
        map.insert("sample_rate_hz".to_string(), self.sample_rate_hz.to_string());
        map.insert("modulation".to_string(), self.modulation.clone());
        map.insert("squelch_db".to_string(), self.squelch_db.to_string());
        map
    }

    /// Recover a `ReceiverConfig` from a `SourceConfig`'s `kind_specific`
    /// map, falling back to defaults for any missing/unparsable field.
    pub fn from_kind_specific(map: &HashMap<String, String>) -> Self {
        let default = Self::default();
        Self {
            frequency_hz: map.get("frequency_hz").and_then(|v| v.parse().ok()).unwrap_or(default.frequency_hz),
            sample_rate_hz: map.get("sample_rate_hz").and_then(|v| v.parse().ok()).unwrap_or(default.sample_rate_hz),
            modulation: map.get("modulation").cloned().unwrap_or(default.modulation),
            squelch_db: map.get("squelch_db").and_then(|v| v.parse().ok()).unwrap_or(default.squelch_db),
        }
    }

    /// Validate operator-facing ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.frequency_hz <= 0.0 {
            return Err("receiver frequency_hz must be positive".into());
        }
        if self.sample_rate_hz == 0 {
            return Err("receiver sample_rate_hz must be positive".into());
        }
        if self.squelch_db >= 0.0 {
            return Err("receiver squelch_db must be negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_kind_specific() {
        let receiver = ReceiverConfig {
            frequency_hz: 162_550_000.0,
            sample_rate_hz: 2_048_000,
            modulation: "nfm".into(),
            squelch_db: -45.0,
        };
        let roundtripped = ReceiverConfig::from_kind_specific(&receiver.to_kind_specific());
        assert_eq!(roundtripped, receiver);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let recovered = ReceiverConfig::from_kind_specific(&std::collections::HashMap::new());
        assert_eq!(recovered, ReceiverConfig::default());
    }

    #[test]
    fn non_negative_squelch_is_rejected() {
        let mut cfg = ReceiverConfig::default();
        cfg.squelch_db = 1.0;
        assert!(cfg.validate().is_err());
    }
}
