//! Encoded audio to waveform and back
//!
//! Providers return either RIFF/WAV or MP3. Both are decoded to mono f32.

use std::io::Cursor;

use super::waveform::Waveform;
use crate::{Error, Result};

/// Container format of provider audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Sniff the format from the leading bytes
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Some(Self::Wav);
        }
        if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0)
        {
            return Some(Self::Mp3);
        }
        None
    }
}

/// Decode provider audio into a mono waveform
///
/// # Errors
///
/// Returns `Error::Decode` if the bytes are not WAV or MP3, or decoding fails
pub fn decode(data: &[u8]) -> Result<Waveform> {
    let wave = match AudioFormat::sniff(data) {
        Some(AudioFormat::Wav) => decode_wav(data)?,
        Some(AudioFormat::Mp3) => decode_mp3(data)?,
        None => return Err(Error::Decode("unrecognized audio container".to_string())),
    };

    if wave.sample_rate() == 0 {
        return Err(Error::Decode("zero sample rate".to_string()));
    }

    tracing::trace!(
        samples = wave.len(),
        sample_rate = wave.sample_rate(),
        "decoded audio"
    );
    Ok(wave)
}

/// Decode WAV bytes, averaging channels down to mono
#[allow(clippy::cast_precision_loss)]
fn decode_wav(data: &[u8]) -> Result<Waveform> {
    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = 2f32.powi(i32::from(spec.bits_per_sample.saturating_sub(1)));
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(e.to_string()))?
        }
    };

    Ok(Waveform::new(downmix(&interleaved, channels), spec.sample_rate))
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(data: &[u8]) -> Result<Waveform> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(0);
                let pcm: Vec<f32> = frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&pcm, frame.channels.max(1)));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode("MP3 contained no audio frames".to_string()));
    }

    Ok(Waveform::new(samples, sample_rate))
}

#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Encode f32 samples as 16-bit mono WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Encode a waveform as WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn to_wav(wave: &Waveform) -> Result<Vec<u8>> {
    samples_to_wav(wave.samples(), wave.sample_rate())
}
