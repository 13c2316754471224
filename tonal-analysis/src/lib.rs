//! Audio analysis module for tonal
//!
//! Frame-based estimators that run on a decoded mono signal: onset strength,
//! tempo and beat tracking, chroma and key, and spectral statistics.
//! Every estimator is a pure function of a read-only `&[f32]`, so callers may
//! run them concurrently.

mod chroma;
mod error;
mod key;
mod mel;
mod onset;
mod spectral;
mod stats;
mod stft;
mod tempo;

pub use chroma::{ChromaAnalyzer, ChromaMatrix};
pub use error::EstimatorError;
pub use key::{KeyEstimate, KeyEstimator, Mode, PitchClass};
pub use onset::OnsetDetector;
pub use spectral::{SpectralAnalyzer, SpectralSeries, SpectralSummary};
pub use tempo::{round_bpm, TempoEstimate, TempoEstimator, MAX_BPM, MIN_BPM};
