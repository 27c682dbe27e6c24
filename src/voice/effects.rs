//! Waveform post-processing
//!
//! Stages run in a fixed order: breath insertion, paralinguistic overlays,
//! gain, pitch shift, speed change. Overlays land on the pre-resample time axis
//! so the final resampling treats the whole utterance, overlays included, the
//! same way. A failing stage is reported and its input passes through.

use std::f64::consts::TAU;
use std::fmt;
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::profile::{Emotion, EmotionProfile};
use super::waveform::{Waveform, peak, samples_for};
use crate::{Error, Result};

/// Scan window for quiet-segment detection
pub const BREATH_WINDOW: Duration = Duration::from_millis(800);
/// Peak amplitude below which a window counts as quiet
pub const QUIET_THRESHOLD: f32 = 0.015;
/// Minimum spacing between two breaths
pub const BREATH_MIN_SPACING: Duration = Duration::from_secs(2);
/// Most breaths kept per utterance
pub const MAX_BREATHS: usize = 3;

const BREATH_LENGTH: Duration = Duration::from_millis(400);
const BREATH_FADE: Duration = Duration::from_millis(150);
const BREATH_NOISE: f32 = 0.008;
const BREATH_GAIN: f32 = 0.25;

/// Chance of an emotional laugh for laugh-eligible emotions
pub const LAUGH_PROBABILITY: f64 = 0.6;

/// Post-processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Breath,
    Overlay,
    Gain,
    PitchShift,
    SpeedChange,
}

impl Stage {
    /// Stages in execution order
    pub const ORDER: [Self; 5] = [
        Self::Breath,
        Self::Overlay,
        Self::Gain,
        Self::PitchShift,
        Self::SpeedChange,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Breath => "breath",
            Self::Overlay => "overlay",
            Self::Gain => "gain",
            Self::PitchShift => "pitch_shift",
            Self::SpeedChange => "speed_change",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Stage produced a new waveform
    Applied,
    /// Stage had nothing to do for this profile or input
    Skipped,
    /// Stage failed; its input was passed through
    Failed(String),
}

/// Outcome of one stage in a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Run one stage with pass-through on failure
///
/// `f` returns `Ok(None)` when the stage does not apply.
pub fn run_stage<F>(stage: Stage, input: Waveform, f: F) -> (Waveform, StageReport)
where
    F: FnOnce(&Waveform) -> Result<Option<Waveform>>,
{
    let (output, outcome) = match f(&input) {
        Ok(Some(output)) => (output, StageOutcome::Applied),
        Ok(None) => (input, StageOutcome::Skipped),
        Err(e) => {
            tracing::warn!(stage = %stage, error = %e, "effect stage failed, keeping previous audio");
            (input, StageOutcome::Failed(e.to_string()))
        }
    };
    (output, StageReport { stage, outcome })
}

/// Post-processed waveform plus per-stage reports
#[derive(Debug, Clone)]
pub struct Processed {
    pub waveform: Waveform,
    pub reports: Vec<StageReport>,
}

impl Processed {
    /// Outcome recorded for a stage
    #[must_use]
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.reports
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }
}

/// Applies the emotion-driven effect chain
#[derive(Debug, Clone, Copy, Default)]
pub struct PostProcessor;

impl PostProcessor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run every stage in order for the given profile
    pub fn process<R: Rng + ?Sized>(
        &self,
        wave: Waveform,
        profile: &EmotionProfile,
        rng: &mut R,
    ) -> Processed {
        self.process_with_gain(wave, profile, 0.0, rng)
    }

    /// Run every stage, folding an extra `gain_db` into the gain stage
    ///
    /// Used when the provider could not honor the markup's volume.
    pub fn process_with_gain<R: Rng + ?Sized>(
        &self,
        wave: Waveform,
        profile: &EmotionProfile,
        gain_db: f32,
        rng: &mut R,
    ) -> Processed {
        let volume = profile.volume * db_to_gain(gain_db);
        let mut reports = Vec::with_capacity(Stage::ORDER.len());
        let mut wave = wave;

        for stage in Stage::ORDER {
            let (next, report) = run_stage(stage, wave, |w| match stage {
                Stage::Breath => insert_breaths(w, rng),
                Stage::Overlay => apply_overlays(w, profile, rng),
                Stage::Gain => apply_gain(w, volume),
                Stage::PitchShift => shift_pitch(w, profile.pitch_shift),
                Stage::SpeedChange => change_speed(w, profile.speed_factor),
            });
            wave = next;
            reports.push(report);
        }

        tracing::debug!(
            emotion = %profile.emotion,
            samples = wave.len(),
            "post-processing complete"
        );

        Processed {
            waveform: wave,
            reports,
        }
    }
}

fn require_rate(wave: &Waveform, stage: Stage) -> Result<u32> {
    match wave.sample_rate() {
        0 => Err(Error::effect(stage.name(), "waveform has zero sample rate")),
        rate => Ok(rate),
    }
}

/// Every insertion point the quiet-window scan finds
///
/// Windows of [`BREATH_WINDOW`] advance by half a window. A quiet window whose
/// start is at least [`BREATH_MIN_SPACING`] past the previous insertion point
/// yields a breath at its center, if a whole breath fits before the end.
#[must_use]
pub fn breath_candidates(wave: &Waveform) -> Vec<usize> {
    let rate = wave.sample_rate();
    let samples = wave.samples();
    let window = samples_for(BREATH_WINDOW, rate);
    let step = window / 2;
    let min_spacing = samples_for(BREATH_MIN_SPACING, rate);
    let breath_len = samples_for(BREATH_LENGTH, rate);

    if step == 0 || samples.len() <= 2 * window {
        return Vec::new();
    }

    let mut positions = Vec::new();
    let mut last: Option<usize> = None;
    let mut i = window;

    while i < samples.len() - window {
        let spaced = last.is_none_or(|l| i.saturating_sub(l) >= min_spacing);
        if spaced && peak(&samples[i..i + window]) < QUIET_THRESHOLD {
            let at = i + step;
            if at + breath_len < samples.len() {
                positions.push(at);
                last = Some(at);
            }
        }
        i += step;
    }

    positions
}

/// Keep at most [`MAX_BREATHS`] positions, spread evenly over the whole candidate list
#[must_use]
pub fn select_breaths(candidates: &[usize]) -> Vec<usize> {
    if candidates.len() <= MAX_BREATHS {
        return candidates.to_vec();
    }
    // First and last candidates are always kept
    let last = candidates.len() - 1;
    (0..MAX_BREATHS)
        .map(|k| candidates[k * last / (MAX_BREATHS - 1)])
        .collect()
}

/// Mix synthesized breaths into quiet stretches of the waveform
///
/// # Errors
///
/// Returns error if the waveform has no sample rate
pub fn insert_breaths<R: Rng + ?Sized>(wave: &Waveform, rng: &mut R) -> Result<Option<Waveform>> {
    let rate = require_rate(wave, Stage::Breath)?;
    let positions = select_breaths(&breath_candidates(wave));
    if positions.is_empty() {
        return Ok(None);
    }

    let breath = synth_breath(rate, rng)?;
    let mut samples = wave.samples().to_vec();
    for &at in &positions {
        for (dst, src) in samples[at..].iter_mut().zip(&breath) {
            *dst += src * BREATH_GAIN;
        }
    }

    tracing::trace!(count = positions.len(), "inserted breaths");
    Ok(Some(Waveform::new(samples, rate)))
}

/// Low-passed noise burst with soft edges
fn synth_breath<R: Rng + ?Sized>(rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    let len = samples_for(BREATH_LENGTH, rate);
    let raw = noise(rng, len, BREATH_NOISE, Stage::Breath)?;

    // One-pole low-pass takes the hiss out
    let mut state = 0.0_f32;
    let mut breath: Vec<f32> = raw
        .into_iter()
        .map(|x| {
            state += 0.35 * (x - state);
            state
        })
        .collect();

    let fade = samples_for(BREATH_FADE, rate);
    apply_fades(&mut breath, fade, fade);
    Ok(breath)
}

/// Append giggle, sigh and emotional laugh overlays as the profile asks
///
/// # Errors
///
/// Returns error if the waveform has no sample rate
pub fn apply_overlays<R: Rng + ?Sized>(
    wave: &Waveform,
    profile: &EmotionProfile,
    rng: &mut R,
) -> Result<Option<Waveform>> {
    let rate = require_rate(wave, Stage::Overlay)?;
    let mut out: Option<Waveform> = None;

    if profile.add_giggle {
        let base = out.as_ref().unwrap_or(wave);
        out = Some(base.append(Duration::from_millis(200), &synth_giggle(rate, rng)?));
    }

    if profile.add_sigh {
        let base = out.as_ref().unwrap_or(wave);
        out = Some(base.append(Duration::from_millis(300), &synth_sigh(rate, rng)?));
    }

    if laugh_eligible(profile.emotion) && rng.gen_bool(LAUGH_PROBABILITY) {
        let laugh = synth_laugh(rate, profile.emotion, rng)?;
        if !laugh.is_empty() {
            let base = out.as_ref().unwrap_or(wave);
            out = Some(base.append(Duration::from_millis(150), &laugh));
        }
    }

    Ok(out)
}

/// Emotions that may get an emotional laugh appended
#[must_use]
pub const fn laugh_eligible(emotion: Emotion) -> bool {
    matches!(
        emotion,
        Emotion::Happy | Emotion::Playful | Emotion::Flirty | Emotion::Excited
    )
}

/// Decaying 300 Hz tone with an 8 Hz wobble and breathy noise
///
/// # Errors
///
/// Returns error if noise generation fails
#[allow(clippy::cast_possible_truncation)]
pub fn synth_giggle<R: Rng + ?Sized>(rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    const LENGTH: f64 = 0.8;
    let len = samples_for(Duration::from_secs_f64(LENGTH), rate);
    let noise = noise(rng, len, 0.05, Stage::Overlay)?;

    let mut giggle: Vec<f32> = time_axis(LENGTH, len)
        .zip(noise)
        .map(|(t, n)| {
            let base = (TAU * 300.0 * t).sin() * (-t * 2.0).exp();
            let wobble = 1.0 + 0.3 * (TAU * 8.0 * t).sin();
            (base * wobble) as f32 + n
        })
        .collect();

    let fade = samples_for(Duration::from_millis(100), rate);
    apply_fades(&mut giggle, fade, fade);
    Ok(giggle.into_iter().map(|s| s * 0.3).collect())
}

/// Falling 200 Hz to 80 Hz tone with slow attack and decay
///
/// # Errors
///
/// Returns error if noise generation fails
#[allow(clippy::cast_possible_truncation)]
pub fn synth_sigh<R: Rng + ?Sized>(rate: u32, rng: &mut R) -> Result<Vec<f32>> {
    const LENGTH: f64 = 1.2;
    const START_HZ: f64 = 200.0;
    const END_HZ: f64 = 80.0;
    let len = samples_for(Duration::from_secs_f64(LENGTH), rate);
    let noise = noise(rng, len, 0.03, Stage::Overlay)?;

    let mut sigh: Vec<f32> = time_axis(LENGTH, len)
        .zip(noise)
        .map(|(t, n)| {
            let freq = START_HZ - (START_HZ - END_HZ) * (t / LENGTH);
            ((TAU * freq * t).sin() * (-t * 0.8).exp()) as f32 + n
        })
        .collect();

    apply_fades(
        &mut sigh,
        samples_for(Duration::from_millis(300), rate),
        samples_for(Duration::from_millis(400), rate),
    );
    Ok(sigh.into_iter().map(|s| s * 0.25).collect())
}

/// Shape of an emotional laugh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaughPreset {
    pub base_hz: f64,
    /// Depth of the frequency modulation
    pub mod_depth: f64,
    pub mod_rate_hz: f64,
    /// Exponential decay constant per second
    pub decay: f64,
    /// Fraction of the drawn duration the time axis spans
    pub time_scale: f64,
}

impl LaughPreset {
    /// Preset for an emotion; emotions without their own laugh use the default
    #[must_use]
    pub const fn for_emotion(emotion: Emotion) -> Self {
        let (base_hz, mod_depth, mod_rate_hz, decay, time_scale) = match emotion {
            // Joyful and bright
            Emotion::Happy => (250.0, 0.5, 6.0, 1.5, 1.0),
            // Light and teasing
            Emotion::Playful => (300.0, 0.3, 8.0, 2.0, 1.0),
            // Soft
            Emotion::Flirty => (220.0, 0.2, 4.0, 1.0, 1.0),
            // Short and mocking
            Emotion::Sarcastic => (180.0, 0.4, 10.0, 3.0, 0.7),
            _ => (200.0, 0.3, 5.0, 2.0, 1.0),
        };
        Self {
            base_hz,
            mod_depth,
            mod_rate_hz,
            decay,
            time_scale,
        }
    }
}

/// Emotional laugh lasting a uniformly drawn 0.5 to 1.5 seconds
///
/// # Errors
///
/// Returns error if noise generation fails
#[allow(clippy::cast_possible_truncation)]
pub fn synth_laugh<R: Rng + ?Sized>(rate: u32, emotion: Emotion, rng: &mut R) -> Result<Vec<f32>> {
    let preset = LaughPreset::for_emotion(emotion);
    let duration = rng.gen_range(0.5..=1.5);
    let len = samples_for(Duration::from_secs_f64(duration), rate);
    let noise = noise(rng, len, 0.02, Stage::Overlay)?;

    let mut laugh: Vec<f32> = time_axis(duration * preset.time_scale, len)
        .zip(noise)
        .map(|(t, n)| {
            let wobble = 1.0 + preset.mod_depth * (TAU * preset.mod_rate_hz * t).sin();
            let tone = (TAU * preset.base_hz * t * wobble).sin() * (-t * preset.decay).exp();
            tone as f32 + n
        })
        .collect();

    let fade = samples_for(Duration::from_millis(100), rate);
    apply_fades(&mut laugh, fade, fade);
    Ok(laugh.into_iter().map(|s| s * 0.2).collect())
}

/// Scale by the profile's volume multiplier
///
/// # Errors
///
/// Returns error if the multiplier is negative or not finite
pub fn apply_gain(wave: &Waveform, volume: f32) -> Result<Option<Waveform>> {
    if (volume - 1.0).abs() < f32::EPSILON {
        return Ok(None);
    }
    if !volume.is_finite() || volume < 0.0 {
        return Err(Error::effect(Stage::Gain.name(), format!("invalid volume {volume}")));
    }
    Ok(Some(wave.scaled(volume)))
}

/// Linear amplitude factor for a level change in dB
#[must_use]
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Shift pitch by resampling with factor `2^(semitones / 12)`
///
/// This also changes the duration.
///
/// # Errors
///
/// Returns error if the resulting factor is invalid
pub fn shift_pitch(wave: &Waveform, semitones: f32) -> Result<Option<Waveform>> {
    if semitones.abs() < f32::EPSILON {
        return Ok(None);
    }
    let factor = 2f64.powf(f64::from(semitones) / 12.0);
    wave.resample_linear(factor)
        .map(Some)
        .map_err(|e| Error::effect(Stage::PitchShift.name(), e.to_string()))
}

/// Change speed by resampling with `factor`
///
/// This also changes the pitch.
///
/// # Errors
///
/// Returns error if the factor is not positive and finite
pub fn change_speed(wave: &Waveform, factor: f32) -> Result<Option<Waveform>> {
    if (factor - 1.0).abs() < f32::EPSILON {
        return Ok(None);
    }
    wave.resample_linear(f64::from(factor))
        .map(Some)
        .map_err(|e| Error::effect(Stage::SpeedChange.name(), e.to_string()))
}

/// Gaussian noise with zero mean
fn noise<R: Rng + ?Sized>(rng: &mut R, len: usize, std_dev: f32, stage: Stage) -> Result<Vec<f32>> {
    let normal =
        Normal::new(0.0_f32, std_dev).map_err(|e| Error::effect(stage.name(), e.to_string()))?;
    Ok((0..len).map(|_| normal.sample(rng)).collect())
}

/// `len` evenly spaced instants from 0 to `span` seconds inclusive
#[allow(clippy::cast_precision_loss)]
fn time_axis(span: f64, len: usize) -> impl Iterator<Item = f64> {
    let step = if len > 1 { span / (len - 1) as f64 } else { 0.0 };
    (0..len).map(move |k| k as f64 * step)
}

/// Linear fade-in over the first `fade_in` samples and fade-out over the last `fade_out`
#[allow(clippy::cast_precision_loss)]
fn apply_fades(samples: &mut [f32], fade_in: usize, fade_out: usize) {
    let len = samples.len();
    let fade_in = fade_in.min(len);
    let fade_out = fade_out.min(len);

    for (k, s) in samples[..fade_in].iter_mut().enumerate() {
        *s *= ramp(k, fade_in);
    }
    for (k, s) in samples[len - fade_out..].iter_mut().enumerate() {
        *s *= 1.0 - ramp(k, fade_out);
    }
}

/// `k`-th of `n` points evenly spaced from 0 to 1
#[allow(clippy::cast_precision_loss)]
fn ramp(k: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        k as f32 / (n - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::profile::get;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const RATE: u32 = 16_000;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(0x5EED)
    }

    /// Loud speech-like tone interrupted by silent gaps
    fn speech_with_gaps(segments: &[(f32, bool)]) -> Waveform {
        let mut samples = Vec::new();
        for &(secs, loud) in segments {
            let n = samples_for(Duration::from_secs_f32(secs), RATE);
            #[allow(clippy::cast_precision_loss)]
            samples.extend((0..n).map(|i| {
                if loud {
                    0.4 * (TAU as f32 * 220.0 * i as f32 / RATE as f32).sin()
                } else {
                    0.0
                }
            }));
        }
        Waveform::new(samples, RATE)
    }

    fn seconds(samples: usize) -> f64 {
        samples as f64 / f64::from(RATE)
    }

    #[test]
    fn test_breaths_respect_spacing_and_limit() {
        // 30s alternating 1s speech / 1.5s silence gives many quiet windows
        let pattern: Vec<(f32, bool)> = (0..12).flat_map(|_| [(1.0, true), (1.5, false)]).collect();
        let wave = speech_with_gaps(&pattern);

        let candidates = breath_candidates(&wave);
        assert!(candidates.len() > MAX_BREATHS, "{candidates:?}");
        for pair in candidates.windows(2) {
            assert!(seconds(pair[1] - pair[0]) >= 2.0, "{pair:?}");
        }

        let selected = select_breaths(&candidates);
        assert_eq!(selected.len(), MAX_BREATHS);
        for pair in selected.windows(2) {
            assert!(seconds(pair[1] - pair[0]) >= 2.0);
        }
        // Spread across the utterance, not the first three
        assert_ne!(selected, candidates[..MAX_BREATHS].to_vec());
    }

    #[test]
    fn test_breaths_limit_on_long_silence() {
        let wave = Waveform::silence(Duration::from_secs(60), RATE);
        let out = insert_breaths(&wave, &mut seeded()).unwrap().unwrap();
        assert_eq!(out.len(), wave.len());

        // Count separate non-silent bursts
        let mut bursts = 0;
        let mut in_burst = false;
        for s in out.samples() {
            let active = *s != 0.0;
            if active && !in_burst {
                bursts += 1;
            }
            in_burst = active;
        }
        assert!(bursts <= MAX_BREATHS, "found {bursts} breaths");
        assert!(bursts >= 1);
    }

    #[test]
    fn test_no_breaths_in_continuous_speech() {
        let wave = speech_with_gaps(&[(6.0, true)]);
        assert!(breath_candidates(&wave).is_empty());
        assert_eq!(insert_breaths(&wave, &mut seeded()).unwrap(), None);
    }

    #[test]
    fn test_breaths_are_added_not_replacing() {
        let wave = speech_with_gaps(&[(1.0, true), (4.0, false), (1.0, true)]);
        let out = insert_breaths(&wave, &mut seeded()).unwrap().unwrap();
        assert_eq!(out.len(), wave.len());
        // Loud passages are untouched
        assert_eq!(out.samples()[..RATE as usize], wave.samples()[..RATE as usize]);
        assert!(out.peak() <= wave.peak() + 0.05);
    }

    #[test]
    fn test_select_breaths_passthrough_when_few() {
        assert_eq!(select_breaths(&[]), Vec::<usize>::new());
        assert_eq!(select_breaths(&[10, 20]), vec![10, 20]);
        assert_eq!(select_breaths(&[10, 20, 30]), vec![10, 20, 30]);
    }

    #[test]
    fn test_select_breaths_reaches_the_tail() {
        assert_eq!(select_breaths(&[0, 100, 200, 300]), vec![0, 100, 300]);
        assert_eq!(select_breaths(&[0, 100, 200, 300, 400]), vec![0, 200, 400]);
        assert_eq!(
            select_breaths(&[0, 100, 200, 300, 400, 500, 600]),
            vec![0, 300, 600]
        );
    }

    #[test]
    fn test_zero_pitch_and_unit_speed_are_identity() {
        let wave = speech_with_gaps(&[(0.5, true)]);
        let (out, report) = run_stage(Stage::PitchShift, wave.clone(), |w| shift_pitch(w, 0.0));
        assert_eq!(out, wave);
        assert_eq!(report.outcome, StageOutcome::Skipped);

        let (out, report) = run_stage(Stage::SpeedChange, wave.clone(), |w| change_speed(w, 1.0));
        assert_eq!(out, wave);
        assert_eq!(report.outcome, StageOutcome::Skipped);
    }

    #[test]
    fn test_octave_round_trip_restores_length() {
        for len in [999, 1000, 24_001, 48_000] {
            let wave = Waveform::new(vec![0.1; len], RATE);
            let up = shift_pitch(&wave, 12.0).unwrap().unwrap();
            let back = shift_pitch(&up, -12.0).unwrap().unwrap();
            let diff = back.len().abs_diff(wave.len());
            assert!(diff <= 1.max(len / 1000), "len {len}: got {}", back.len());
        }
    }

    #[test]
    fn test_pitch_shift_changes_duration() {
        let wave = Waveform::new(vec![0.0; 12_000], RATE);
        let up = shift_pitch(&wave, 2.0).unwrap().unwrap();
        assert!(up.len() < wave.len());
        let down = shift_pitch(&wave, -2.0).unwrap().unwrap();
        assert!(down.len() > wave.len());
    }

    #[test]
    fn test_speed_change_rejects_zero() {
        let wave = Waveform::new(vec![0.0; 100], RATE);
        let err = change_speed(&wave, 0.0).unwrap_err();
        assert!(matches!(err, Error::Effect { stage: "speed_change", .. }));
    }

    #[test]
    fn test_overlays_for_sad_append_sigh() {
        let wave = Waveform::new(vec![0.0; 1000], RATE);
        let out = apply_overlays(&wave, get("sad"), &mut seeded()).unwrap().unwrap();
        let expected = 1000
            + samples_for(Duration::from_millis(300), RATE)
            + samples_for(Duration::from_secs_f64(1.2), RATE);
        assert_eq!(out.len(), expected);
        assert_eq!(&out.samples()[..1000], wave.samples());
    }

    #[test]
    fn test_overlays_skipped_for_neutral() {
        let wave = Waveform::new(vec![0.0; 1000], RATE);
        assert_eq!(apply_overlays(&wave, get("neutral"), &mut seeded()).unwrap(), None);
    }

    #[test]
    fn test_happy_laugh_is_sometimes_appended() {
        let wave = Waveform::new(vec![0.0; 1000], RATE);
        let giggle_only = 1000
            + samples_for(Duration::from_millis(200), RATE)
            + samples_for(Duration::from_secs_f64(0.8), RATE);

        let mut rng = seeded();
        let mut with_laugh = 0;
        let mut without_laugh = 0;
        for _ in 0..100 {
            let out = apply_overlays(&wave, get("happy"), &mut rng).unwrap().unwrap();
            if out.len() > giggle_only {
                with_laugh += 1;
            } else {
                assert_eq!(out.len(), giggle_only);
                without_laugh += 1;
            }
        }
        assert!(with_laugh > 0 && without_laugh > 0, "{with_laugh}/{without_laugh}");
    }

    #[test]
    fn test_laugh_duration_bounds() {
        let mut rng = seeded();
        for emotion in [Emotion::Happy, Emotion::Sarcastic, Emotion::Excited] {
            let laugh = synth_laugh(RATE, emotion, &mut rng).unwrap();
            let secs = seconds(laugh.len());
            assert!((0.5..=1.5).contains(&secs), "{secs}");
            assert!(peak(&laugh) <= 0.3);
        }
    }

    #[test]
    fn test_overlay_envelopes_start_and_end_silent() {
        let mut rng = seeded();
        let giggle = synth_giggle(RATE, &mut rng).unwrap();
        assert_eq!(giggle[0], 0.0);
        assert_eq!(*giggle.last().unwrap(), 0.0);
        let sigh = synth_sigh(RATE, &mut rng).unwrap();
        assert_eq!(sigh[0], 0.0);
        assert_eq!(*sigh.last().unwrap(), 0.0);
    }

    #[test]
    fn test_laugh_presets() {
        assert_eq!(LaughPreset::for_emotion(Emotion::Happy).base_hz, 250.0);
        assert_eq!(
            LaughPreset::for_emotion(Emotion::Excited),
            LaughPreset::for_emotion(Emotion::Neutral)
        );
        assert!(laugh_eligible(Emotion::Excited));
        assert!(!laugh_eligible(Emotion::Sarcastic));
    }

    #[test]
    fn test_failed_stage_passes_input_through() {
        let wave = Waveform::new(vec![0.25; 64], 0);
        let processed = PostProcessor::new().process(wave.clone(), get("sad"), &mut seeded());
        assert!(matches!(
            processed.outcome(Stage::Overlay),
            Some(StageOutcome::Failed(_))
        ));
        assert!(matches!(
            processed.outcome(Stage::Breath),
            Some(StageOutcome::Failed(_))
        ));
        // Resampling still runs on the passed-through audio
        assert_eq!(processed.outcome(Stage::PitchShift), Some(&StageOutcome::Applied));
        assert_ne!(processed.waveform.len(), 0);
    }

    #[test]
    fn test_neutral_pipeline_is_identity_on_speech() {
        let wave = speech_with_gaps(&[(1.5, true)]);
        let processed = PostProcessor::new().process(wave.clone(), get("neutral"), &mut seeded());
        assert_eq!(processed.waveform, wave);
        assert!(
            processed
                .reports
                .iter()
                .all(|r| r.outcome == StageOutcome::Skipped)
        );
    }

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_gain(-8.0) - 0.398_107).abs() < 1e-5);
    }

    #[test]
    fn test_extra_gain_folds_into_gain_stage() {
        let wave = speech_with_gaps(&[(0.5, true)]);
        let neutral = get("neutral");

        let plain = PostProcessor::new().process(wave.clone(), neutral, &mut seeded());
        assert_eq!(plain.outcome(Stage::Gain), Some(&StageOutcome::Skipped));

        let quiet = PostProcessor::new().process_with_gain(wave.clone(), neutral, -8.0, &mut seeded());
        assert_eq!(quiet.outcome(Stage::Gain), Some(&StageOutcome::Applied));
        assert!(quiet.waveform.peak() < wave.peak() * 0.5);
    }

    #[test]
    fn test_gain_scales() {
        let wave = Waveform::new(vec![0.5; 4], RATE);
        let out = apply_gain(&wave, 0.4).unwrap().unwrap();
        assert!(out.samples().iter().all(|s| (s - 0.2).abs() < 1e-6));
        assert!(apply_gain(&wave, -1.0).is_err());
        assert_eq!(apply_gain(&wave, 1.0).unwrap(), None);
    }
}
