//! Alert events emitted by the decoder (§3, `AlertEvent`).

use std::time::SystemTime;

/// A decoded (or externally injected) alert header.
///
/// Immutable once emitted. `location_codes` holds the 6-digit numeric FIPS-
/// style codes the decoder extracted; the core does not interpret them
/// beyond passing them through the filtering predicate (§4.5).
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// When the decoder recognised the header.
    pub detected_at: SystemTime,
    /// Name of the source the header was decoded from.
    pub source_name: String,
    /// Three-letter event code (e.g. `"EAN"`, `"RWT"`).
    pub event_code: String,
    /// Originator code from the header.
    pub originator: String,
    /// 6-digit numeric location codes covered by the alert.
    pub location_codes: Vec<String>,
    /// Raw header bytes as decoded from the bit stream.
    pub raw_header: Vec<u8>,
    /// Opaque handle to any audio captured alongside the header, if retained.
    pub captured_audio_handle: Option<String>,
}

impl AlertEvent {
    /// `true` iff at least one of `location_codes` is present in `allowed`.
    ///
    /// Used by the decoder's filtering callback contract (§4.5): events with
    /// no code in the configured set are logged but not forwarded.
    pub fn matches_any(&self, allowed: &[String]) -> bool {
        self.location_codes.iter().any(|code| allowed.contains(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(codes: &[&str]) -> AlertEvent {
        AlertEvent {
            detected_at: SystemTime::now(),
            source_name: "wx1".into(),
            event_code: "TOR".into(),
            originator: "WXR".into(),
            location_codes: codes.iter().map(|s| s.to_string()).collect(),
            raw_header: vec![],
            captured_audio_handle: None,
        }
    }

    #[test]
    fn matches_any_true_on_overlap() {
        let e = event(&["012057", "012081"]);
        assert!(e.matches_any(&["012081".to_string()]));
    }

    #[test]
    fn matches_any_false_without_overlap() {
        let e = event(&["012057"]);
        assert!(!e.matches_any(&["099999".to_string()]));
    }

    #[test]
    fn matches_any_false_on_empty_allowed_set() {
        let e = event(&["012057"]);
        assert!(!e.matches_any(&[]));
    }
}
