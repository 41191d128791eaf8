//! A minimal reference [`SameDecoder`] used in tests and as a template for
//! real bit-stream decoders.
//!
//! Recognises a burst of samples above a fixed amplitude as a single
//! synthetic alert; it has no notion of SAME framing. Exists purely so
//! [`crate::ContinuousDecoderTask`] can be exercised without a production
//! decoder implementation.

use std::time::SystemTime;

use station_core::AlertEvent;

use crate::decoder::SameDecoder;

const BURST_THRESHOLD: f32 = 0.8;
const BURST_MIN_RUN: usize = 64;

/// Fires one [`AlertEvent`] per contiguous run of `BURST_MIN_RUN`-or-more
/// samples above [`BURST_THRESHOLD`].
pub struct ToneBurstDecoder {
    source_name: String,
    event_code: String,
    location_codes: Vec<String>,
    run_length: usize,
    in_message: bool,
}

impl ToneBurstDecoder {
    /// Build a decoder that tags emitted alerts with `source_name` and
    /// stamps `event_code`/`location_codes` onto each recognised burst.
    pub fn new(source_name: impl Into<String>, event_code: impl Into<String>, location_codes: Vec<String>) -> Self {
        Self {
            source_name: source_name.into(),
            event_code: event_code.into(),
            location_codes,
            run_length: 0,
            in_message: false,
        }
    }
}

impl SameDecoder for ToneBurstDecoder {
    fn feed(&mut self, samples: &[f32]) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for &sample in samples {
            if sample.abs() > BURST_THRESHOLD {
                self.run_length += 1;
                self.in_message = true;
                if self.run_length == BURST_MIN_RUN {
                    events.push(AlertEvent {
                        detected_at: SystemTime::now(),
                        source_name: self.source_name.clone(),
                        event_code: self.event_code.clone(),
                        originator: "TST".into(),
                        location_codes: self.location_codes.clone(),
                        raw_header: Vec::new(),
                        captured_audio_handle: None,
                    });
                }
            } else {
                self.run_length = 0;
                self.in_message = false;
            }
        }
        events
    }

    fn is_synced(&self) -> bool {
        true
    }

    fn in_message(&self) -> bool {
        self.in_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_once_per_burst() {
        let mut decoder = ToneBurstDecoder::new("wx1", "RWT", vec!["012057".into()]);
        let burst = vec![0.9_f32; BURST_MIN_RUN * 2];
        let events = decoder.feed(&burst);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_code, "RWT");
    }

    #[test]
    fn silence_resets_the_run() {
        let mut decoder = ToneBurstDecoder::new("wx1", "RWT", vec![]);
        decoder.feed(&vec![0.9_f32; BURST_MIN_RUN - 1]);
        let events = decoder.feed(&[0.0_f32; 4]);
        assert!(events.is_empty());
        assert!(!decoder.in_message());
    }
}
