//! Onset strength envelope
//!
//! Log-mel spectral flux: the positive frame-to-frame increase of each mel
//! band in dB, reduced across bands with the median so that a handful of
//! noisy bands cannot fake an onset.

use crate::error::{check_framing, EstimatorError};
use crate::mel::MelFilterbank;
use crate::stats::median;
use crate::stft::Stft;

/// Number of mel bands feeding the onset curve
const MEL_BANDS: usize = 128;
/// Power floor before taking logs
const AMIN: f32 = 1e-10;
/// Dynamic range kept below the loudest mel cell
const TOP_DB: f32 = 80.0;

/// Computes the onset strength curve of a mono signal
pub struct OnsetDetector {
    stft: Stft,
    filterbank: MelFilterbank,
}

impl OnsetDetector {
    /// Create a new onset detector
    pub fn new(
        sample_rate: u32,
        frame_size: usize,
        hop_size: usize,
    ) -> Result<Self, EstimatorError> {
        check_framing(sample_rate, frame_size, hop_size)?;

        Ok(Self {
            stft: Stft::new(frame_size, hop_size),
            filterbank: MelFilterbank::new(sample_rate, frame_size, MEL_BANDS),
        })
    }

    /// One non-negative onset value per frame; frame 0 is always 0
    pub fn onset_strength(&self, samples: &[f32]) -> Vec<f32> {
        let log_mel = self.log_mel_spectrogram(samples);

        let mut onset = Vec::with_capacity(log_mel.len());
        let mut flux = vec![0.0f32; self.filterbank.num_bands()];

        onset.push(0.0);
        for pair in log_mel.windows(2) {
            for ((slot, prev), curr) in flux.iter_mut().zip(&pair[0]).zip(&pair[1]) {
                *slot = (curr - prev).max(0.0);
            }
            onset.push(median(&mut flux));
        }

        tracing::trace!(frames = onset.len(), "onset strength computed");
        onset
    }

    /// Mel power in dB, clipped to `TOP_DB` below the global maximum
    fn log_mel_spectrogram(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let num_bands = self.filterbank.num_bands();
        let mut power = vec![0.0f32; self.stft.num_bins()];
        let mut rows = Vec::with_capacity(self.stft.frame_count(samples.len()));

        self.stft.for_each_frame(samples, |_, spectrum| {
            for (p, c) in power.iter_mut().zip(spectrum) {
                *p = c.norm_sqr();
            }
            let mut mel = vec![0.0f32; num_bands];
            self.filterbank.apply(&power, &mut mel);
            for v in &mut mel {
                *v = 10.0 * v.max(AMIN).log10();
            }
            rows.push(mel);
        });

        let peak = rows
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - TOP_DB;
        for v in rows.iter_mut().flatten() {
            *v = v.max(floor);
        }

        rows
    }
}
