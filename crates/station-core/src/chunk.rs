//! Immutable PCM audio chunks (§3, `AudioChunk`).

use std::sync::Arc;

/// A fixed-size, immutable buffer of interleaved `f32` PCM samples.
///
/// Samples are clipped (never wrapped) to `[-1.0, 1.0]` by the producer
/// before the chunk is constructed. A chunk carries the `(sample_rate,
/// channels)` of the source that produced it; its `samples` length is
/// always `frames * channels`.
///
/// Chunks are never mutated after construction — fan-out is implemented by
/// cloning the `Arc`-wrapped sample buffer, not by copying the samples
/// themselves.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioChunk {
    /// Build a chunk from interleaved samples, clipping any out-of-range
    /// value to `[-1.0, 1.0]`.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let mut samples = samples;
        for s in &mut samples {
            *s = s.clamp(-1.0, 1.0);
        }
        Self {
            samples: Arc::from(samples),
            sample_rate,
            channels,
        }
    }

    /// Build a silent (all-zero) chunk of `frames` frames.
    pub fn silence(frames: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::from(vec![0.0_f32; frames * channels as usize]),
            sample_rate,
            channels,
        }
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (`samples.len() / channels`).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// `true` if every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_out_of_range_samples() {
        let chunk = AudioChunk::new(vec![2.0, -2.0, 0.5], 48_000, 1);
        assert_eq!(chunk.samples(), &[1.0, -1.0, 0.5]);
    }

    #[test]
    fn frames_divides_by_channel_count() {
        let chunk = AudioChunk::new(vec![0.0; 8], 48_000, 2);
        assert_eq!(chunk.frames(), 4);
    }

    #[test]
    fn silence_is_all_zero() {
        let chunk = AudioChunk::silence(10, 16_000, 1);
        assert!(chunk.is_silent());
        assert_eq!(chunk.frames(), 10);
    }

    #[test]
    fn clone_is_cheap_and_shares_storage() {
        let chunk = AudioChunk::new(vec![0.1, 0.2], 48_000, 1);
        let clone = chunk.clone();
        assert_eq!(clone.samples(), chunk.samples());
    }
}
