//! Bridges decoded [`AlertEvent`]s into [`PlayoutItem`]s.
//!
//! The spec specifies the decoder (§4.5, §6.4) and the playout queue (§4.6)
//! independently and leaves their translation to the composition root; this
//! module is that translation, grounded on where `app_core`'s own top-level
//! wiring (outside the audio core proper) joins the two.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use station_core::precedence::{PrecedenceConfig, Scope, Severity, Urgency};
use station_core::{AlertEvent, PlayoutItem, PlayoutQueue};

/// Where alert audio segments live on disk: `{root}/{EVENT_CODE}.wav` for
/// the main segment, `{root}/EOM.wav` for the shared end-of-message tone.
#[derive(Debug, Clone)]
pub struct AlertAudioLibrary {
    root: PathBuf,
}

impl AlertAudioLibrary {
    /// Build a library rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory this library resolves segments under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn main_segment(&self, event_code: &str) -> PathBuf {
        self.root.join(format!("{}.wav", event_code.to_uppercase()))
    }

    fn eom_segment(&self) -> PathBuf {
        self.root.join("EOM.wav")
    }
}

/// Build a [`PlayoutItem`] for `event`, classifying its precedence via
/// `precedence` and assigning it a fresh `queue_id` from `queue`.
///
/// `AlertEvent` carries no CAP severity/urgency/scope (§3: the decoder only
/// extracts `event_code`/`originator`/`location_codes` from the SAME
/// header), so every bridged alert is treated as `Scope::Public` with
/// `Severity::UNKNOWN`/`Urgency::UNKNOWN` — `precedence.determine` still
/// resolves `EAN`/`NPT`/test codes and any configured National/State codes
/// correctly, and everything else falls to `Precedence::LOCAL`.
pub fn bridge(event: &AlertEvent, queue: &mut PlayoutQueue, precedence: &PrecedenceConfig, library: &AlertAudioLibrary) -> PlayoutItem {
    let eom_path = library.eom_segment();
    let eom_path = eom_path.is_file().then_some(eom_path);
    let same_header = (!event.raw_header.is_empty()).then(|| hex_encode(&event.raw_header));

    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), event.source_name.clone());
    metadata.insert("originator".to_string(), event.originator.clone());
    metadata.insert("location_codes".to_string(), event.location_codes.join(","));

    PlayoutItem {
        queue_id: queue.next_queue_id(),
        precedence: precedence.determine(&event.event_code, Scope::Public, None),
        severity: Severity::UNKNOWN,
        urgency: Urgency::UNKNOWN,
        origin_timestamp: event.detected_at,
        event_code: event.event_code.clone(),
        event_name: event.event_code.clone(),
        same_header,
        audio_path: library.main_segment(&event.event_code),
        eom_path,
        metadata,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn event(code: &str) -> AlertEvent {
        AlertEvent {
            detected_at: SystemTime::now(),
            source_name: "wx1".into(),
            event_code: code.into(),
            originator: "WXR".into(),
            location_codes: vec!["012057".into()],
            raw_header: vec![0xab, 0xcd],
            captured_audio_handle: None,
        }
    }

    #[test]
    fn ean_is_bridged_to_presidential_precedence() {
        let mut queue = PlayoutQueue::new();
        let precedence = PrecedenceConfig::default();
        let library = AlertAudioLibrary::new("/tmp/alerts");

        let item = bridge(&event("EAN"), &mut queue, &precedence, &library);
        assert_eq!(item.precedence, station_core::precedence::Precedence::PRESIDENTIAL);
        assert_eq!(item.audio_path, std::path::Path::new("/tmp/alerts/EAN.wav"));
        assert_eq!(item.same_header.as_deref(), Some("abcd"));
    }

    #[test]
    fn unclassified_code_falls_back_to_local() {
        let mut queue = PlayoutQueue::new();
        let precedence = PrecedenceConfig::default();
        let library = AlertAudioLibrary::new("/tmp/alerts");

        let item = bridge(&event("TOR"), &mut queue, &precedence, &library);
        assert_eq!(item.precedence, station_core::precedence::Precedence::LOCAL);
    }

    #[test]
    fn queue_ids_are_assigned_fresh_and_increasing() {
        let mut queue = PlayoutQueue::new();
        let precedence = PrecedenceConfig::default();
        let library = AlertAudioLibrary::new("/tmp/alerts");

        let a = bridge(&event("RWT"), &mut queue, &precedence, &library);
        let b = bridge(&event("RWT"), &mut queue, &precedence, &library);
        assert!(b.queue_id > a.queue_id);
    }
}
