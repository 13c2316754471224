//! Chromagram: 12-bin pitch class energy over time
//!
//! Each FFT bin between C2 and C8 is folded onto its nearest pitch class,
//! weighted by how close it sits to an exact equal-tempered pitch. The FFT
//! is sized from the sample rate so bins stay 5 to 8 Hz wide, which keeps
//! neighbouring semitones apart from the second octave up.

use crate::error::{check_framing, EstimatorError};
use crate::stft::Stft;

/// Reference frequency for A4 (440 Hz)
const A4_FREQ: f32 = 440.0;
/// Lowest folded frequency (C2)
const MIN_FREQ: f32 = 65.406;
/// Highest folded frequency (C8)
const MAX_FREQ: f32 = 4186.01;

/// Pitch class energy per frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromaMatrix {
    /// One 12-element column per frame, index 0 = C
    frames: Vec<[f32; 12]>,
}

impl ChromaMatrix {
    /// Number of frames (T)
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the matrix has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Per-frame columns
    pub fn frames(&self) -> &[[f32; 12]] {
        &self.frames
    }

    /// Time-averaged chroma profile (all zeros for an empty matrix)
    pub fn profile(&self) -> [f32; 12] {
        let mut profile = [0.0f32; 12];
        if self.frames.is_empty() {
            return profile;
        }

        let mut sums = [0.0f64; 12];
        for frame in &self.frames {
            for (sum, v) in sums.iter_mut().zip(frame) {
                *sum += *v as f64;
            }
        }
        for (slot, sum) in profile.iter_mut().zip(sums) {
            *slot = (sum / self.frames.len() as f64) as f32;
        }
        profile
    }
}

/// Computes chromagrams of mono signals
pub struct ChromaAnalyzer {
    stft: Stft,
    /// Pre-computed bin-to-pitch-class mapping with detune weights
    bin_map: Vec<Option<(u8, f32)>>,
}

impl ChromaAnalyzer {
    /// Create a new chroma analyzer producing one column per `hop_size` samples
    pub fn new(sample_rate: u32, hop_size: usize) -> Result<Self, EstimatorError> {
        let fft_size = Self::fft_size_for(sample_rate);
        check_framing(sample_rate, fft_size, hop_size)?;

        let stft = Stft::new(fft_size, hop_size);
        let bin_map = (0..stft.num_bins())
            .map(|bin| pitch_class_of(stft.bin_frequency(bin, sample_rate)))
            .collect();

        Ok(Self { stft, bin_map })
    }

    /// FFT size giving 5-8 Hz bins at the given sample rate
    pub fn fft_size_for(sample_rate: u32) -> usize {
        ((sample_rate / 10) as usize).next_power_of_two().max(2)
    }

    /// Compute the chromagram; each column is scaled to a maximum of 1
    ///
    /// Frames without energy in the folded range stay all-zero.
    pub fn chromagram(&self, samples: &[f32]) -> ChromaMatrix {
        let mut frames = Vec::with_capacity(self.stft.frame_count(samples.len()));

        self.stft.for_each_frame(samples, |_, spectrum| {
            let mut chroma = [0.0f32; 12];
            for (complex, mapping) in spectrum.iter().zip(&self.bin_map) {
                if let Some((pitch_class, weight)) = *mapping {
                    chroma[pitch_class as usize] += complex.norm_sqr() * weight;
                }
            }

            let peak = chroma.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                for v in &mut chroma {
                    *v /= peak;
                }
            }
            frames.push(chroma);
        });

        ChromaMatrix { frames }
    }
}

/// Nearest pitch class of a frequency and its detune weight
///
/// Weight is 1.0 on an exact pitch and falls to 0.0 half a semitone away.
fn pitch_class_of(freq: f32) -> Option<(u8, f32)> {
    if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
        return None;
    }

    // MIDI note number: 69 = A4
    let midi_note = 12.0 * (freq / A4_FREQ).log2() + 69.0;
    let nearest = midi_note.round();
    let weight = 1.0 - (midi_note - nearest).abs().min(0.5) * 2.0;
    if weight <= 0.0 {
        return None;
    }

    let pitch_class = (nearest as i32).rem_euclid(12) as u8;
    Some((pitch_class, weight))
}
