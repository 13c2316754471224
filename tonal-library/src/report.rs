//! The immutable result of one analysis invocation

use crate::config::SampleRate;
use tonal_analysis::{KeyEstimate, Mode, PitchClass, SpectralSummary, TempoEstimate};

/// Tempo, key and spectral descriptors of one track
///
/// Built once per invocation from complete estimator outputs; callers own
/// the value and do any formatting themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureReport {
    /// Tempo rounded to whole beats per minute (0 when undetectable)
    pub tempo_bpm: u32,
    /// Dominant pitch class
    pub key: PitchClass,
    /// Mode label looked up from `key`
    pub mode: Mode,
    /// Mean zero-crossing rate (0.0 - 1.0)
    pub zero_crossing_rate: f32,
    /// Mean spectral centroid in Hz
    pub spectral_centroid: f32,
    /// Mean spectral bandwidth in Hz
    pub spectral_bandwidth: f32,
    /// Mean spectral flatness (0.0 - 1.0)
    pub spectral_flatness: f32,
    /// Length of the decoded signal in seconds
    pub duration_secs: f64,
    /// Rate the signal was analyzed at
    pub sample_rate: SampleRate,
}

impl FeatureReport {
    /// Assemble a report from the three estimator outputs
    pub fn assemble(
        tempo: &TempoEstimate,
        key: KeyEstimate,
        spectral: SpectralSummary,
        duration_secs: f64,
        sample_rate: SampleRate,
    ) -> Self {
        Self {
            tempo_bpm: tempo.rounded_bpm(),
            key: key.key,
            mode: key.mode,
            zero_crossing_rate: spectral.zero_crossing_rate,
            spectral_centroid: spectral.centroid,
            spectral_bandwidth: spectral.bandwidth,
            spectral_flatness: spectral.flatness,
            duration_secs,
            sample_rate,
        }
    }

    /// Key and mode together, e.g. "A Major"
    pub fn key_label(&self) -> String {
        format!("{} {}", self.key, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble() {
        let tempo = TempoEstimate {
            bpm: 127.6,
            beats: vec![10, 50, 90],
        };
        let key = KeyEstimate::from_pitch_class(PitchClass::GSharp);
        let spectral = SpectralSummary {
            zero_crossing_rate: 0.05,
            centroid: 1800.0,
            bandwidth: 1500.0,
            flatness: 0.02,
        };

        let report = FeatureReport::assemble(&tempo, key, spectral, 12.5, SampleRate::Hz44100);
        assert_eq!(report.tempo_bpm, 128);
        assert_eq!(report.key, PitchClass::GSharp);
        assert_eq!(report.mode, Mode::Minor);
        assert_eq!(report.key_label(), "G# Minor");
        assert_eq!(report.spectral_centroid, 1800.0);
        assert_eq!(report.sample_rate, SampleRate::Hz44100);
    }
}
