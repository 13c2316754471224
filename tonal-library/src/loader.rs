//! Audio file loading and decoding

use crate::config::SampleRate;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Errors that can occur while decoding a file into a signal
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("File decoded to an empty signal")]
    Empty,
}

/// A decoded mono signal at a fixed sample rate
///
/// Never empty. Immutable once built; estimators borrow the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: SampleRate,
}

impl Signal {
    /// Wrap mono samples; fails with `DecodeError::Empty` on an empty buffer
    pub fn new(samples: Vec<f32>, sample_rate: SampleRate) -> Result<Self, DecodeError> {
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Mono samples, nominally in -1.0 to 1.0
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate of the samples
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.hz() as f64
    }
}

/// Audio file loader using Symphonia
pub struct TrackLoader {
    target_sample_rate: SampleRate,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    /// Create a new track loader with the default sample rate
    pub fn new() -> Self {
        Self::with_sample_rate(SampleRate::default())
    }

    /// Create a new track loader with specific sample rate
    pub fn with_sample_rate(target_sample_rate: SampleRate) -> Self {
        Self { target_sample_rate }
    }

    /// Load, downmix and resample an audio file
    pub fn load(&self, path: &Path) -> Result<Signal, DecodeError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        // Find first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let source_sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::UnsupportedFormat("unknown sample rate".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // Corrupt packet: skip it and keep going
                Err(SymphoniaError::DecodeError(_)) | Err(SymphoniaError::IoError(_)) => {
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => return Err(DecodeError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            // Downmix to mono
            if channels == 1 {
                samples.extend_from_slice(sample_buf.samples());
            } else {
                samples.extend(
                    sample_buf
                        .samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
        }

        if skipped_packets > 0 {
            tracing::warn!(skipped_packets, path = %path.display(), "skipped undecodable packets");
        }

        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }

        let target = self.target_sample_rate.hz();
        let samples = if source_sample_rate != target {
            resample(&samples, source_sample_rate, target)?
        } else {
            samples
        };

        tracing::debug!(
            path = %path.display(),
            source_sample_rate,
            sample_rate = target,
            samples = samples.len(),
            "decoded track"
        );

        Signal::new(samples, self.target_sample_rate)
    }
}

/// Band-limited resampling of a mono signal
fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, DecodeError> {
    use rubato::{FftFixedInOut, Resampler};

    let mut resampler =
        FftFixedInOut::<f32>::new(source_rate as usize, target_rate as usize, 1024, 1)
            .map_err(|e| DecodeError::Decode(e.to_string()))?;

    let chunk_size = resampler.input_frames_next();
    let frames = samples.len();
    let expected = (frames as u64 * target_rate as u64 / source_rate as u64) as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + chunk_size);

    let mut pos = 0;
    while pos + chunk_size <= frames {
        let resampled = resampler
            .process(&[&samples[pos..pos + chunk_size]], None)
            .map_err(|e| DecodeError::Decode(e.to_string()))?;
        output.extend_from_slice(&resampled[0]);
        pos += chunk_size;
    }

    // Handle remaining samples (pad with zeros)
    if pos < frames {
        let remaining = frames - pos;
        let mut padded = samples[pos..].to_vec();
        padded.resize(chunk_size, 0.0);

        let resampled = resampler
            .process(&[padded.as_slice()], None)
            .map_err(|e| DecodeError::Decode(e.to_string()))?;
        // Proportional share of the output, at least one sample
        let tail = (remaining as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
        output.extend_from_slice(&resampled[0][..tail.min(resampled[0].len())]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_signal_rejects_empty() {
        assert!(matches!(
            Signal::new(Vec::new(), SampleRate::Hz22050),
            Err(DecodeError::Empty)
        ));
    }

    #[test]
    fn test_signal_duration() {
        let signal = Signal::new(vec![0.0; 44100], SampleRate::Hz22050).unwrap();
        assert_eq!(signal.len(), 44100);
        assert!(!signal.is_empty());
        assert!((signal.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = TrackLoader::new();
        let result = loader.load(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(result, Err(DecodeError::Io(_))));
    }

    #[test]
    fn test_resample_length_and_pitch() {
        let source_rate = 44100;
        let samples: Vec<f32> = (0..source_rate)
            .map(|i| (2.0 * PI * 441.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let resampled = resample(&samples, source_rate, 22050).unwrap();
        assert!((resampled.len() as i64 - 22050).abs() < 1024);

        // Count positive-going crossings in the steady middle section
        let middle = &resampled[4000..18000];
        let crossings = middle
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
            .count();
        let expected = 441.0 * middle.len() as f32 / 22050.0;
        assert!((crossings as f32 - expected).abs() <= 2.0);
    }

    #[test]
    fn test_resample_short_tail_keeps_a_sample() {
        for target in [22050, 32000, 48000] {
            let resampled = resample(&[0.5], 44100, target).unwrap();
            assert!(!resampled.is_empty(), "no output at {target} Hz");
        }
        // 1000 leftover samples at 44.1 kHz map to 499.99... at 22.05 kHz
        let resampled = resample(&vec![0.0; 1000], 44100, 22050).unwrap();
        assert_eq!(resampled.len(), 500);
    }
}
