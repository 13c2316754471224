//! Global tempo estimation and beat tracking from an onset curve
//!
//! Tempo comes from the autocorrelation of the mean-removed onset curve,
//! weighted by a log-normal prior around 120 BPM and searched over lags for
//! `MIN_BPM..=MAX_BPM`. Beats are then placed with the dynamic-programming
//! tracker of Ellis (2007): maximize onset strength at beat frames while
//! penalizing intervals that stray from the estimated period.

use crate::error::EstimatorError;
use crate::stats::{mean, std_dev};
use rustfft::{num_complex::Complex, FftPlanner};

/// Slowest tempo considered
pub const MIN_BPM: f32 = 30.0;
/// Fastest tempo considered
pub const MAX_BPM: f32 = 300.0;

/// Center of the tempo prior
const PRIOR_BPM: f32 = 120.0;
/// Spread of the tempo prior in octaves
const PRIOR_OCTAVES: f32 = 1.0;
/// Penalty weight for off-period beat intervals
const TIGHTNESS: f32 = 100.0;

/// Round a tempo to whole BPM, halves away from zero
///
/// Negative and non-finite inputs map to 0.
pub fn round_bpm(bpm: f32) -> u32 {
    if !bpm.is_finite() || bpm <= 0.0 {
        return 0;
    }
    bpm.round() as u32
}

/// Tempo and beat positions for one signal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TempoEstimate {
    /// Tempo in beats per minute (0.0 when no periodicity was found)
    pub bpm: f32,
    /// Strictly increasing frame indices of the tracked beats
    pub beats: Vec<usize>,
}

impl TempoEstimate {
    /// Tempo rounded for presentation
    pub fn rounded_bpm(&self) -> u32 {
        round_bpm(self.bpm)
    }

    /// Beat positions in seconds
    pub fn beat_times(&self, sample_rate: u32, hop_size: usize) -> Vec<f32> {
        self.beats
            .iter()
            .map(|&frame| (frame * hop_size) as f32 / sample_rate as f32)
            .collect()
    }
}

/// Estimates tempo and beats from an onset strength curve
pub struct TempoEstimator {
    /// Onset frames per second
    frame_rate: f32,
}

impl TempoEstimator {
    /// Create a new tempo estimator for curves sampled every `hop_size` samples
    pub fn new(sample_rate: u32, hop_size: usize) -> Result<Self, EstimatorError> {
        if sample_rate == 0 || hop_size == 0 {
            return Err(EstimatorError::InvalidParameters(
                "sample rate and hop size must be positive".into(),
            ));
        }
        Ok(Self {
            frame_rate: sample_rate as f32 / hop_size as f32,
        })
    }

    /// Estimate the global tempo and beat frames
    ///
    /// Degenerate curves (empty, silent, constant, or too short to hold a
    /// period) yield a zero tempo with no beats rather than an error.
    pub fn estimate(&self, onset: &[f32]) -> Result<TempoEstimate, EstimatorError> {
        let Some(period) = self.estimate_period(onset) else {
            tracing::debug!(frames = onset.len(), "no periodicity in onset curve");
            return Ok(TempoEstimate::default());
        };

        let bpm = 60.0 * self.frame_rate / period;
        if !bpm.is_finite() {
            return Err(EstimatorError::NonFinite("tempo estimator"));
        }

        let beats = track_beats(onset, period);
        tracing::debug!(bpm, beats = beats.len(), "tempo estimated");

        Ok(TempoEstimate { bpm, beats })
    }

    /// Beat period in (fractional) onset frames
    fn estimate_period(&self, onset: &[f32]) -> Option<f32> {
        let n = onset.len();
        if n < 4 {
            return None;
        }

        let avg = mean(onset);
        let centered: Vec<f32> = onset.iter().map(|v| v - avg).collect();
        let acf = autocorrelation(&centered);
        if acf[0].is_nan() || acf[0] <= f32::EPSILON {
            return None;
        }

        let min_lag = ((self.frame_rate * 60.0 / MAX_BPM).floor() as usize).max(1);
        let max_lag = ((self.frame_rate * 60.0 / MIN_BPM).ceil() as usize).min(n - 1);
        if min_lag >= max_lag {
            return None;
        }

        let score = |lag: usize| -> f32 {
            let bpm = 60.0 * self.frame_rate / lag as f32;
            (acf[lag] / acf[0]) * tempo_prior(bpm)
        };

        // Strict comparison keeps the first (shortest-lag) candidate on ties
        let mut best_lag = 0;
        let mut best_score = 0.0f32;
        for lag in min_lag..=max_lag {
            let s = score(lag);
            if s > best_score {
                best_score = s;
                best_lag = lag;
            }
        }
        if best_lag == 0 {
            return None;
        }

        // Parabolic interpolation between neighbouring lags
        let mut period = best_lag as f32;
        if best_lag > min_lag && best_lag < max_lag {
            let (a, b, c) = (score(best_lag - 1), best_score, score(best_lag + 1));
            let denom = a - 2.0 * b + c;
            if denom.abs() > f32::EPSILON {
                period += (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
            }
        }

        Some(period)
    }
}

/// Log-normal weighting of a tempo, 1.0 at `PRIOR_BPM`
fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Linear autocorrelation via FFT, lags `0..signal.len()`
fn autocorrelation(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);
    for x in &mut buffer {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(fft_size).process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}

/// Dynamic-programming beat tracker
///
/// Returns strictly increasing frame indices; empty when the curve carries
/// no energy.
fn track_beats(onset: &[f32], period: f32) -> Vec<usize> {
    let n = onset.len();
    let sd = std_dev(onset);
    if n == 0 || sd.is_nan() || sd <= 0.0 || period <= 0.0 {
        return Vec::new();
    }

    let normalized: Vec<f32> = onset.iter().map(|v| v / sd).collect();
    let local = local_score(&normalized, period);

    let min_step = ((period / 2.0).round() as usize).max(1);
    let max_step = ((2.0 * period).round() as usize).max(min_step);

    let mut cumulative = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        let mut best: Option<(usize, f32)> = None;
        if i >= min_step {
            let earliest = i.saturating_sub(max_step);
            for prev in earliest..=(i - min_step) {
                let interval = (i - prev) as f32 / period;
                let candidate = cumulative[prev] - TIGHTNESS * interval.ln().powi(2);
                if best.map_or(true, |(_, s)| candidate > s) {
                    best = Some((prev, candidate));
                }
            }
        }

        match best {
            Some((prev, s)) if s > 0.0 => {
                cumulative[i] = local[i] + s;
                backlink[i] = Some(prev);
            }
            _ => cumulative[i] = local[i],
        }
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        beats.push(prev);
        cursor = prev;
    }
    beats.reverse();

    trim_weak_beats(&beats, &local)
}

/// Onset curve smoothed with a Gaussian spanning one period each side
fn local_score(onset: &[f32], period: f32) -> Vec<f32> {
    let half = period.round().max(1.0) as isize;
    let kernel: Vec<f32> = (-half..=half)
        .map(|k| {
            let x = k as f32 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();

    let n = onset.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, w)| {
                    let j = i + k as isize - half;
                    (0..n).contains(&j).then(|| onset[j as usize] * w)
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score that reaches half the median peak
fn last_beat(cumulative: &[f32]) -> Option<usize> {
    let n = cumulative.len();
    let is_peak = |i: usize| {
        let left = i == 0 || cumulative[i] > cumulative[i - 1];
        let right = i + 1 == n || cumulative[i] >= cumulative[i + 1];
        left && right
    };

    let mut peaks: Vec<f32> = (0..n).filter(|&i| is_peak(i)).map(|i| cumulative[i]).collect();
    if peaks.is_empty() {
        return None;
    }
    let threshold = 0.5 * crate::stats::median(&mut peaks);

    (0..n).rev().find(|&i| is_peak(i) && cumulative[i] >= threshold)
}

/// Drop leading and trailing beats whose local score is below half the RMS
fn trim_weak_beats(beats: &[usize], local: &[f32]) -> Vec<usize> {
    if beats.is_empty() {
        return Vec::new();
    }

    let rms = (beats.iter().map(|&b| local[b] * local[b]).sum::<f32>() / beats.len() as f32).sqrt();
    let threshold = 0.5 * rms;

    let start = beats.iter().position(|&b| local[b] > threshold);
    let end = beats.iter().rposition(|&b| local[b] > threshold);
    match (start, end) {
        (Some(s), Some(e)) => beats[s..=e].to_vec(),
        _ => Vec::new(),
    }
}
