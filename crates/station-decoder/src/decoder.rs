//! The external decoder collaborator's contract (§6.4).

use station_core::AlertEvent;

/// A stateful decoder over a bit-stream of audio samples.
///
/// Implementations own their own sync-acquisition and framing state; the
/// only requirement [`crate::ContinuousDecoderTask`] places on them is that
/// `feed` never blocks and returns promptly with whatever alerts, if any,
/// became available from this call's samples. The core treats the decoder
/// as a black box: it does not interpret `event_code` or `location_codes`
/// beyond what [`AlertEvent::matches_any`] needs.
pub trait SameDecoder: Send {
    /// Feed one block of samples, maintaining internal sync state.
    /// Returns zero or more alerts newly recognised from this block.
    fn feed(&mut self, samples: &[f32]) -> Vec<AlertEvent>;

    /// Whether the decoder currently believes it is bit-synced to a header.
    fn is_synced(&self) -> bool;

    /// Whether the decoder is mid-message (inside a header it has not yet
    /// fully decoded).
    fn in_message(&self) -> bool;
}
