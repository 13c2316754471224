//! Frame-wise spectral statistics
//!
//! Zero-crossing rate, spectral centroid, spectral bandwidth and spectral
//! flatness, each computed per frame and averaged. Silent frames produce 0
//! for every statistic.

use crate::error::{check_framing, EstimatorError};
use crate::stats::mean;
use crate::stft::{frame_count, Stft};

/// Power floor for the flatness logarithm
const AMIN: f32 = 1e-10;
/// Amplitudes at or below this count as zero for crossing detection
const ZERO_THRESHOLD: f32 = 1e-10;

/// Per-frame values of the four statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralSeries {
    pub zero_crossing_rate: Vec<f32>,
    pub centroid: Vec<f32>,
    pub bandwidth: Vec<f32>,
    pub flatness: Vec<f32>,
}

/// Mean of each spectral series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectralSummary {
    /// Fraction of sign changes per sample (0.0 - 1.0)
    pub zero_crossing_rate: f32,
    /// Energy-weighted mean frequency in Hz
    pub centroid: f32,
    /// Energy-weighted spread around the centroid in Hz
    pub bandwidth: f32,
    /// Geometric over arithmetic mean of the power spectrum (0.0 - 1.0)
    pub flatness: f32,
}

impl SpectralSeries {
    /// Reduce each series to its arithmetic mean
    pub fn summary(&self) -> Result<SpectralSummary, EstimatorError> {
        let summary = SpectralSummary {
            zero_crossing_rate: mean(&self.zero_crossing_rate),
            centroid: mean(&self.centroid),
            bandwidth: mean(&self.bandwidth),
            flatness: mean(&self.flatness),
        };

        let checks = [
            (summary.zero_crossing_rate, "zero-crossing rate"),
            (summary.centroid, "spectral centroid"),
            (summary.bandwidth, "spectral bandwidth"),
            (summary.flatness, "spectral flatness"),
        ];
        for (value, name) in checks {
            if !value.is_finite() {
                return Err(EstimatorError::NonFinite(name));
            }
        }

        Ok(summary)
    }
}

/// Computes the spectral statistics of a mono signal
pub struct SpectralAnalyzer {
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    stft: Stft,
}

impl SpectralAnalyzer {
    /// Create a new spectral analyzer
    pub fn new(
        sample_rate: u32,
        frame_size: usize,
        hop_size: usize,
    ) -> Result<Self, EstimatorError> {
        check_framing(sample_rate, frame_size, hop_size)?;

        Ok(Self {
            sample_rate,
            frame_size,
            hop_size,
            stft: Stft::new(frame_size, hop_size),
        })
    }

    /// Compute all four series
    pub fn analyze(&self, samples: &[f32]) -> SpectralSeries {
        let frames = self.stft.frame_count(samples.len());
        let mut series = SpectralSeries {
            zero_crossing_rate: self.zero_crossing_rate(samples),
            centroid: Vec::with_capacity(frames),
            bandwidth: Vec::with_capacity(frames),
            flatness: Vec::with_capacity(frames),
        };

        let freqs: Vec<f32> = (0..self.stft.num_bins())
            .map(|bin| self.stft.bin_frequency(bin, self.sample_rate))
            .collect();
        let mut magnitude = vec![0.0f32; self.stft.num_bins()];

        self.stft.for_each_frame(samples, |_, spectrum| {
            for (m, c) in magnitude.iter_mut().zip(spectrum) {
                *m = c.norm();
            }
            let (centroid, bandwidth) = centroid_and_bandwidth(&magnitude, &freqs);
            series.centroid.push(centroid);
            series.bandwidth.push(bandwidth);
            series.flatness.push(flatness(&magnitude));
        });

        series
    }

    /// Zero-crossing rate per centered frame, edges padded with the end samples
    fn zero_crossing_rate(&self, samples: &[f32]) -> Vec<f32> {
        let frames = frame_count(samples.len(), self.hop_size);
        if samples.is_empty() {
            return vec![0.0; frames];
        }

        let last = samples.len() - 1;
        let half = self.frame_size / 2;
        // Sign bit after thresholding; zero counts as positive
        let negative = |idx: usize| samples[idx.min(last)] < -ZERO_THRESHOLD;

        (0..frames)
            .map(|frame| {
                let start = frame * self.hop_size;
                let crossings = (1..self.frame_size)
                    .filter(|&i| {
                        let prev = (start + i - 1).saturating_sub(half);
                        let curr = (start + i).saturating_sub(half);
                        negative(prev) != negative(curr)
                    })
                    .count();
                crossings as f32 / self.frame_size as f32
            })
            .collect()
    }
}

/// Centroid and bandwidth (second-order spread) of one magnitude spectrum
fn centroid_and_bandwidth(magnitude: &[f32], freqs: &[f32]) -> (f32, f32) {
    let total: f64 = magnitude.iter().map(|&m| m as f64).sum();
    if total <= 0.0 {
        return (0.0, 0.0);
    }

    let centroid: f64 = magnitude
        .iter()
        .zip(freqs)
        .map(|(&m, &f)| m as f64 * f as f64)
        .sum::<f64>()
        / total;

    let variance: f64 = magnitude
        .iter()
        .zip(freqs)
        .map(|(&m, &f)| m as f64 * (f as f64 - centroid).powi(2))
        .sum::<f64>()
        / total;

    (centroid as f32, variance.sqrt() as f32)
}

/// Spectral flatness of one magnitude spectrum (computed on power)
fn flatness(magnitude: &[f32]) -> f32 {
    if magnitude.is_empty() || magnitude.iter().all(|&m| m == 0.0) {
        return 0.0;
    }

    let n = magnitude.len() as f64;
    let (log_sum, sum) = magnitude.iter().fold((0.0f64, 0.0f64), |(ls, s), &m| {
        let power = (m * m).max(AMIN) as f64;
        (ls + power.ln(), s + power)
    });

    let geometric_mean = (log_sum / n).exp();
    let arithmetic_mean = sum / n;
    (geometric_mean / arithmetic_mean).clamp(0.0, 1.0) as f32
}
