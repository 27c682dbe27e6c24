//! Audio playback to speakers
//!
//! Playback blocks until the waveform has finished: the assistant does not
//! listen while it is talking.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::decode::to_wav;
use super::waveform::Waveform;
use crate::{Error, Result};

/// Destination for finished waveforms
pub trait AudioSink {
    /// Play a waveform, returning once playback is complete
    ///
    /// # Errors
    ///
    /// Returns error if the device fails
    fn play(&self, wave: &Waveform) -> Result<()>;
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Pick a stream config for `rate`, or the device default when the rate is unsupported
    fn stream_config(&self, rate: u32) -> Result<StreamConfig> {
        let supports = |channels: u16| {
            self.device.supported_output_configs().ok()?.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= SampleRate(rate)
                    && c.max_sample_rate() >= SampleRate(rate)
            })
        };

        if let Some(range) = supports(1).or_else(|| supports(2)) {
            return Ok(range.with_sample_rate(SampleRate(rate)).config());
        }

        self.device
            .default_output_config()
            .map(|c| c.config())
            .map_err(|e| Error::Audio(e.to_string()))
    }

    /// Play samples in a blocking manner
    fn play_blocking(&self, wave: &Waveform) -> Result<()> {
        if wave.is_empty() {
            return Ok(());
        }

        let config = self.stream_config(wave.sample_rate())?;
        let device_rate = config.sample_rate.0;
        let samples = if device_rate == wave.sample_rate() {
            wave.samples().to_vec()
        } else {
            tracing::debug!(
                from = wave.sample_rate(),
                to = device_rate,
                "resampling for output device"
            );
            resample_audio(wave.samples(), wave.sample_rate(), device_rate)?
        };

        let channels = usize::from(config.channels);
        let sample_count = samples.len();
        let samples = Arc::new(samples);
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let samples_clone = Arc::clone(&samples);
        let position_clone = Arc::clone(&position);
        let finished_clone = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut pos) = position_clone.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = samples_clone.get(*pos).copied().unwrap_or_else(|| {
                            if let Ok(mut done) = finished_clone.lock() {
                                *done = true;
                            }
                            0.0
                        });

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples_clone.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Poll for completion with a grace period past the nominal length
        let duration_ms = (sample_count as u64 * 1000) / u64::from(device_rate.max(1));
        let start = Instant::now();
        let timeout = Duration::from_millis(duration_ms + 500);

        while !finished.lock().map_or(true, |done| *done) {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        // Let the device drain its last buffer
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

impl AudioSink for AudioPlayback {
    fn play(&self, wave: &Waveform) -> Result<()> {
        self.play_blocking(wave)
    }
}

/// Resample audio using rubato
#[allow(clippy::cast_possible_truncation)]
fn resample_audio(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let chunk_size = 1024;
    let sub_chunks = 2;

    let mut resampler =
        FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, chunk_size, sub_chunks, 1)
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let mut output = Vec::new();

    for chunk in input.chunks(chunk_size) {
        // Pad the tail so the last partial chunk is not dropped
        let mut block = chunk.to_vec();
        block.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[block], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    Ok(output.iter().map(|&s| s as f32).collect())
}

/// Writes every played waveform to a WAV file instead of a device
///
/// Each call overwrites the file with the most recent utterance.
pub struct WavFileSink {
    path: PathBuf,
}

impl WavFileSink {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AudioSink for WavFileSink {
    fn play(&self, wave: &Waveform) -> Result<()> {
        std::fs::write(&self.path, to_wav(wave)?)?;
        tracing::info!(path = %self.path.display(), samples = wave.len(), "wrote audio");
        Ok(())
    }
}

/// Keeps played waveforms in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    played: Arc<Mutex<Vec<Waveform>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waveforms played so far
    #[must_use]
    pub fn played(&self) -> Vec<Waveform> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AudioSink for MemorySink {
    fn play(&self, wave: &Waveform) -> Result<()> {
        self.played
            .lock()
            .map_err(|_| Error::Audio("sink lock poisoned".to_string()))?
            .push(wave.clone());
        Ok(())
    }
}
