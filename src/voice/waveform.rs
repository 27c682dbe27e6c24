//! Mono sample buffer with its sample rate

use std::time::Duration;

use crate::{Error, Result};

/// Mono f32 audio at a fixed sample rate
///
/// Stages never modify a waveform they were handed; every transform returns a
/// new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Silence of the given length
    #[must_use]
    pub fn silence(duration: Duration, sample_rate: u32) -> Self {
        Self::new(vec![0.0; samples_for(duration, sample_rate)], sample_rate)
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Peak absolute amplitude
    #[must_use]
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Root-mean-square level
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f32).sqrt()
    }

    /// New waveform with `pause` of silence and then `tail` appended
    #[must_use]
    pub fn append(&self, pause: Duration, tail: &[f32]) -> Self {
        let gap = samples_for(pause, self.sample_rate);
        let mut samples = Vec::with_capacity(self.samples.len() + gap + tail.len());
        samples.extend_from_slice(&self.samples);
        samples.resize(self.samples.len() + gap, 0.0);
        samples.extend_from_slice(tail);
        Self::new(samples, self.sample_rate)
    }

    /// New waveform with every sample multiplied by `gain` and clamped to [-1, 1]
    #[must_use]
    pub fn scaled(&self, gain: f32) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|s| (s * gain).clamp(-1.0, 1.0))
            .collect();
        Self::new(samples, self.sample_rate)
    }

    /// Resample along the sample-index axis by `factor` using linear interpolation
    ///
    /// Output length is `floor(len / factor)`; output sample `k` reads the input
    /// at position `k * factor`. A factor above 1 shortens the waveform and
    /// raises its pitch. A factor of exactly 1 returns an identical copy.
    ///
    /// # Errors
    ///
    /// Returns error if `factor` is not a positive finite number
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn resample_linear(&self, factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::effect("resample", format!("invalid factor {factor}")));
        }
        if self.samples.is_empty() {
            return Ok(self.clone());
        }

        let input = &self.samples;
        let last = input.len() - 1;
        let new_len = (input.len() as f64 / factor).floor() as usize;

        let samples = (0..new_len)
            .map(|k| {
                let pos = k as f64 * factor;
                let i = pos.floor() as usize;
                if i >= last {
                    return input[last];
                }
                let frac = (pos - i as f64) as f32;
                if frac == 0.0 {
                    input[i]
                } else {
                    input[i] + (input[i + 1] - input[i]) * frac
                }
            })
            .collect();

        Ok(Self::new(samples, self.sample_rate))
    }
}

/// Number of samples covering `duration` at `sample_rate`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)) as usize
}

/// Peak absolute amplitude of a slice
#[must_use]
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}
