//! Short-time Fourier transform over centered, Hann-windowed frames
//!
//! Frame `t` is centered on sample `t * hop`; the signal is treated as
//! zero outside its bounds, so a signal of `n` samples yields `1 + n / hop`
//! frames regardless of the frame size.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Periodic Hann window
pub(crate) fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Number of centered frames covering a signal of `len` samples
pub(crate) fn frame_count(len: usize, hop_size: usize) -> usize {
    1 + len / hop_size
}

/// Windowed FFT driver shared by the spectral estimators
pub struct Stft {
    fft_size: usize,
    hop_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl Stft {
    /// Create a new STFT with the given frame (FFT) and hop sizes
    ///
    /// Callers validate that both sizes are non-zero.
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            hop_size,
            fft,
            window: hann_window(fft_size),
        }
    }

    /// Number of non-negative frequency bins (`fft_size / 2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Number of frames produced for `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        frame_count(len, self.hop_size)
    }

    /// Run the transform, handing each frame's non-negative spectrum to `visit`
    ///
    /// The spectrum slice holds `num_bins()` complex values and is only valid
    /// for the duration of the call.
    pub fn for_each_frame<F>(&self, samples: &[f32], mut visit: F)
    where
        F: FnMut(usize, &[Complex<f32>]),
    {
        let half = self.fft_size / 2;
        let num_bins = self.num_bins();
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_size];

        for frame in 0..self.frame_count(samples.len()) {
            let center = frame * self.hop_size;
            for (i, (slot, w)) in buffer.iter_mut().zip(&self.window).enumerate() {
                let sample = (center + i)
                    .checked_sub(half)
                    .and_then(|idx| samples.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft.process(&mut buffer);
            visit(frame, &buffer[..num_bins]);
        }
    }

    /// Magnitude spectrogram, one row of `num_bins()` values per frame
    #[cfg(test)]
    fn magnitudes(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut rows = Vec::with_capacity(self.frame_count(samples.len()));
        self.for_each_frame(samples, |_, spectrum| {
            rows.push(spectrum.iter().map(|c| c.norm()).collect());
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let window = hann_window(8);
        assert_eq!(window.len(), 8);
        assert!(window[0].abs() < 1e-6);
        assert!((window[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_count_is_centered() {
        let stft = Stft::new(2048, 512);
        assert_eq!(stft.frame_count(0), 1);
        assert_eq!(stft.frame_count(511), 1);
        assert_eq!(stft.frame_count(512), 2);
        assert_eq!(stft.frame_count(22050), 44);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sample_rate = 8000;
        let stft = Stft::new(256, 64);
        // 1000 Hz lands exactly on bin 32 with a 256-point FFT at 8 kHz
        let samples: Vec<f32> = (0..4000)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / sample_rate as f32).sin())
            .collect();

        let spectrogram = stft.magnitudes(&samples);
        let middle = &spectrogram[spectrogram.len() / 2];
        let (peak_bin, _) = middle
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();

        assert_eq!(middle.len(), 129);
        assert_eq!(peak_bin, 32);
        assert!((stft.bin_frequency(peak_bin, sample_rate) - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_silence_has_zero_spectrum() {
        let stft = Stft::new(512, 128);
        let samples = vec![0.0f32; 2000];
        let mut frames = 0;
        stft.for_each_frame(&samples, |_, spectrum| {
            frames += 1;
            assert!(spectrum.iter().all(|c| c.norm() == 0.0));
        });
        assert_eq!(frames, stft.frame_count(samples.len()));
    }
}
