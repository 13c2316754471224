//! Track analysis for tonal - decoding, configuration, and feature reports

mod config;
mod loader;
mod pipeline;
mod report;

pub use config::{AnalysisConfig, Preferences, SampleRate};
pub use loader::{DecodeError, Signal, TrackLoader};
pub use pipeline::{analyze, analyze_signal, AnalysisError, AnalysisJob, AnalysisProgress};
pub use report::FeatureReport;
pub use tonal_analysis::{EstimatorError, Mode, PitchClass};
