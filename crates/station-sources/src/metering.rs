//! Per-chunk level metering, silence detection, clipping detection, and a
//! rolling health score (§4.8 `MeteringAndHealth`).
//!
//! Grounded on `app_core/audio/metering.py`'s `AudioMeter`, `SilenceDetector`,
//! and `AudioHealthMonitor`. Pure computation: no I/O, no threads. Attached
//! to each [`crate::SourceAdapter`] and fed one chunk at a time from the
//! capture loop.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const CLIPPING_THRESHOLD: f32 = 0.95;
const CLIPPING_ALERT_COUNT: u32 = 10;
const DEFAULT_PEAK_HOLD: Duration = Duration::from_secs(2);
const LEVEL_HISTORY_CAPACITY: usize = 10;
const TREND_THRESHOLD_DB: f32 = 3.0;

/// Floor substituted for peak/RMS before taking `log10`, avoiding `-inf` on
/// digital silence (§4.8: `max(peak, 1e-10)`).
const LOG_FLOOR: f32 = 1e-10;

/// Emitted when a source transitions in or out of silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceEvent {
    /// Went from below-threshold to above-threshold.
    SignalRestored,
    /// Stayed below threshold for `silence_duration_s`.
    SilenceDetected,
}

/// Emitted once per clipping-window trip, then the counter resets.
#[derive(Debug, Clone, Copy)]
pub struct ClippingEvent {
    /// Samples counted above the clipping threshold since the last trip.
    pub samples_over_threshold: u32,
}

/// Qualitative direction of the RMS trend over the last 10 evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTrend {
    /// `|last - first| <= 3 dB`.
    Stable,
    /// `last - first > 3 dB`.
    Rising,
    /// `last - first < -3 dB`.
    Falling,
}

/// A single metering evaluation's computed health score, `[0, 100]`.
#[derive(Debug, Clone, Copy)]
pub struct HealthScore(pub f32);

struct State {
    peak: f32,
    peak_hold_until: Instant,
    rms_history: VecDeque<f32>,
    silent: bool,
    ever_had_signal: bool,
    last_signal_time: Instant,
    silence_since: Option<Instant>,
    clipping_count: u32,
    health_score: f32,
}

/// Per-source metering state machine (§4.8).
pub struct MeteringAndHealth {
    silence_threshold_db: f32,
    silence_duration_s: f32,
    peak_hold_time: Duration,
    state: Mutex<State>,
}

impl MeteringAndHealth {
    /// Construct a metering instance for a source with the given silence
    /// thresholds (from its [`station_core::SourceConfig`]).
    pub fn new(silence_threshold_db: f32, silence_duration_s: f32) -> Self {
        Self {
            silence_threshold_db,
            silence_duration_s,
            peak_hold_time: DEFAULT_PEAK_HOLD,
            state: Mutex::new(State {
                peak: 0.0,
                peak_hold_until: Instant::now(),
                rms_history: VecDeque::with_capacity(LEVEL_HISTORY_CAPACITY),
                silent: false,
                ever_had_signal: false,
                last_signal_time: Instant::now(),
                silence_since: None,
                clipping_count: 0,
                health_score: 100.0,
            }),
        }
    }

    /// Process one chunk's interleaved samples, updating all internal state.
    /// Returns the peak/RMS in dBFS plus any silence/clipping transitions.
    pub fn process(&self, samples: &[f32]) -> MeteringResult {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        let mean_sq = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32
        };
        let rms = mean_sq.sqrt();

        if peak >= state.peak || now >= state.peak_hold_until {
            state.peak = peak;
            state.peak_hold_until = now + self.peak_hold_time;
        }

        let peak_db = 20.0 * peak.max(LOG_FLOOR).log10();
        let rms_db = 20.0 * rms.max(LOG_FLOOR).log10();

        if state.rms_history.len() >= LEVEL_HISTORY_CAPACITY {
            state.rms_history.pop_front();
        }
        state.rms_history.push_back(rms_db);

        let silence_event = self.evaluate_silence(&mut state, rms_db, now);
        let clipping_event = self.evaluate_clipping(&mut state, samples);
        let trend = Self::level_trend(&state.rms_history);

        let silence_seconds = state
            .silence_since
            .map(|since| now.duration_since(since).as_secs_f32())
            .unwrap_or(0.0);
        state.health_score = Self::health_score(rms_db, clipping_event.is_some(), state.silent, silence_seconds);

        MeteringResult {
            peak_db,
            rms_db,
            silence_detected: state.silent,
            silence_event,
            clipping_event,
            health_score: HealthScore(state.health_score),
            trend,
        }
    }

    fn evaluate_silence(&self, state: &mut State, rms_db: f32, now: Instant) -> Option<SilenceEvent> {
        let above_threshold = rms_db > self.silence_threshold_db;

        if above_threshold {
            state.last_signal_time = now;
            state.ever_had_signal = true;
            let was_silent = state.silent;
            state.silence_since = None;
            if was_silent {
                state.silent = false;
                return Some(SilenceEvent::SignalRestored);
            }
            return None;
        }

        // Below threshold. With no prior signal at all, the alert fires
        // immediately rather than waiting out `silence_duration_s` (§4.8:
        // "its silence alert fires immediately on first below-threshold
        // sample").
        if !state.ever_had_signal && !state.silent {
            state.silence_since = Some(state.last_signal_time);
            state.silent = true;
            return Some(SilenceEvent::SilenceDetected);
        }

        if !state.silent && state.silence_since.is_none() {
            state.silence_since = Some(state.last_signal_time);
            return None;
        }

        if let Some(since) = state.silence_since {
            let duration = now.duration_since(since).as_secs_f32();
            if duration >= self.silence_duration_s && !state.silent {
                state.silent = true;
                return Some(SilenceEvent::SilenceDetected);
            }
        }

        None
    }

    fn evaluate_clipping(&self, state: &mut State, samples: &[f32]) -> Option<ClippingEvent> {
        let over = samples.iter().filter(|s| s.abs() > CLIPPING_THRESHOLD).count() as u32;
        state.clipping_count += over;
        if state.clipping_count >= CLIPPING_ALERT_COUNT {
            let event = ClippingEvent {
                samples_over_threshold: state.clipping_count,
            };
            state.clipping_count = 0;
            Some(event)
        } else {
            None
        }
    }

    fn level_trend(history: &VecDeque<f32>) -> LevelTrend {
        if history.len() < LEVEL_HISTORY_CAPACITY {
            return LevelTrend::Stable;
        }
        let first = *history.front().unwrap();
        let last = *history.back().unwrap();
        let delta = last - first;
        if delta > TREND_THRESHOLD_DB {
            LevelTrend::Rising
        } else if delta < -TREND_THRESHOLD_DB {
            LevelTrend::Falling
        } else {
            LevelTrend::Stable
        }
    }

    fn health_score(rms_db: f32, clipping: bool, silent: bool, silence_seconds: f32) -> f32 {
        let mut score = 100.0_f32;
        if clipping {
            score -= 20.0;
        }
        if rms_db < -50.0 {
            score -= 10.0;
        }
        if rms_db > -3.0 {
            score -= 10.0;
        }
        if silent {
            score -= (silence_seconds * 2.0).min(30.0);
        }
        score.clamp(0.0, 100.0)
    }

    /// Current health score without processing a new chunk.
    pub fn health_score(&self) -> HealthScore {
        HealthScore(self.state.lock().unwrap_or_else(|e| e.into_inner()).health_score)
    }
}

/// Result of one [`MeteringAndHealth::process`] call.
#[derive(Debug, Clone)]
pub struct MeteringResult {
    /// Peak level in dBFS for this chunk.
    pub peak_db: f32,
    /// RMS level in dBFS for this chunk.
    pub rms_db: f32,
    /// Current silence state after this chunk.
    pub silence_detected: bool,
    /// Silence state transition triggered by this chunk, if any.
    pub silence_event: Option<SilenceEvent>,
    /// Clipping window trip triggered by this chunk, if any.
    pub clipping_event: Option<ClippingEvent>,
    /// Health score after this chunk.
    pub health_score: HealthScore,
    /// RMS trend over the last 10 evaluations.
    pub trend: LevelTrend,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: f32, frames: usize) -> Vec<f32> {
        vec![amplitude; frames]
    }

    #[test]
    fn initial_state_fires_silence_immediately_on_first_below_threshold_sample() {
        let meter = MeteringAndHealth::new(-60.0, 1.0);
        let result = meter.process(&tone(0.0, 100));
        assert_eq!(result.silence_event, Some(SilenceEvent::SilenceDetected));
        assert!(result.silence_detected);
    }

    #[test]
    fn signal_above_threshold_restores_from_silence() {
        let meter = MeteringAndHealth::new(-60.0, 1.0);
        meter.process(&tone(0.0, 100));
        let result = meter.process(&tone(0.5, 100));
        assert_eq!(result.silence_event, Some(SilenceEvent::SignalRestored));
        assert!(!result.silence_detected);
    }

    #[test]
    fn clipping_trips_after_ten_over_threshold_samples_then_resets() {
        let meter = MeteringAndHealth::new(-60.0, 1.0);
        let loud = tone(0.99, 10);
        let first = meter.process(&loud);
        assert!(first.clipping_event.is_some());

        let quiet = tone(0.1, 5);
        let second = meter.process(&quiet);
        assert!(second.clipping_event.is_none());
    }

    #[test]
    fn health_score_is_always_within_bounds() {
        let meter = MeteringAndHealth::new(-60.0, 0.0);
        for _ in 0..20 {
            let result = meter.process(&tone(0.99, 200));
            assert!(result.health_score.0 >= 0.0 && result.health_score.0 <= 100.0);
        }
    }

    #[test]
    fn digital_silence_peak_and_rms_do_not_produce_negative_infinity() {
        let meter = MeteringAndHealth::new(-60.0, 1.0);
        let result = meter.process(&tone(0.0, 100));
        assert!(result.peak_db.is_finite());
        assert!(result.rms_db.is_finite());
    }
}
