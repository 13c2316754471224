//! Mel filterbank (Slaney scale, area-normalized triangles)

/// Linear region slope of the Slaney mel scale (Hz per mel)
const F_SP: f32 = 200.0 / 3.0;
/// Where the scale switches from linear to logarithmic
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

pub(crate) fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub(crate) fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// One triangular band stored sparsely as a run of bin weights
#[derive(Debug, Clone)]
struct MelBand {
    first_bin: usize,
    weights: Vec<f32>,
}

/// Maps a power spectrum onto mel bands spanning 0 Hz to Nyquist
#[derive(Debug, Clone)]
pub(crate) struct MelFilterbank {
    bands: Vec<MelBand>,
}

impl MelFilterbank {
    pub(crate) fn new(sample_rate: u32, fft_size: usize, num_bands: usize) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let num_bins = fft_size / 2 + 1;
        let bin_hz = sample_rate as f32 / fft_size as f32;

        let mel_max = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..num_bands + 2)
            .map(|i| mel_to_hz(mel_max * i as f32 / (num_bands + 1) as f32))
            .collect();

        let bands = edges
            .windows(3)
            .map(|edge| {
                let (low, center, high) = (edge[0], edge[1], edge[2]);
                let norm = 2.0 / (high - low);

                let weights: Vec<(usize, f32)> = (0..num_bins)
                    .filter_map(|bin| {
                        let freq = bin as f32 * bin_hz;
                        let rising = (freq - low) / (center - low);
                        let falling = (high - freq) / (high - center);
                        let w = rising.min(falling);
                        (w > 0.0).then_some((bin, w * norm))
                    })
                    .collect();

                MelBand {
                    first_bin: weights.first().map(|&(bin, _)| bin).unwrap_or(0),
                    weights: weights.into_iter().map(|(_, w)| w).collect(),
                }
            })
            .collect();

        Self { bands }
    }

    pub(crate) fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Apply the filterbank to one frame's power spectrum
    pub(crate) fn apply(&self, power: &[f32], out: &mut [f32]) {
        for (band, slot) in self.bands.iter().zip(out.iter_mut()) {
            *slot = power
                .iter()
                .skip(band.first_bin)
                .zip(&band.weights)
                .map(|(p, w)| p * w)
                .sum();
        }
    }
}
