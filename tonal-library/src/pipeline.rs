//! The analysis pipeline: decode once, run the estimators, assemble a report
//!
//! Tempo, key and spectral statistics only read the decoded signal, so they
//! run on scoped worker threads and are joined before the report is built.
//! Any failure discards the partial results.

use crate::config::AnalysisConfig;
use crate::loader::{DecodeError, Signal, TrackLoader};
use crate::report::FeatureReport;
use crossbeam_channel::{self, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ScopedJoinHandle};
use std::time::Instant;
use thiserror::Error;
use tonal_analysis::{
    ChromaAnalyzer, EstimatorError, KeyEstimate, KeyEstimator, OnsetDetector, SpectralAnalyzer,
    SpectralSummary, TempoEstimate, TempoEstimator,
};

/// Errors that end an analysis invocation
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Estimator failed: {0}")]
    Estimator(#[from] EstimatorError),
    #[error("The {0} worker panicked")]
    WorkerPanicked(&'static str),
    #[error("Analysis was cancelled")]
    Cancelled,
}

/// Progress updates from a background analysis job
#[derive(Debug, Clone)]
pub enum AnalysisProgress {
    /// Reading and decoding the file
    Decoding {
        /// File being decoded
        path: PathBuf,
    },
    /// Decoding finished
    Decoded {
        /// Length of the decoded signal
        duration_secs: f64,
    },
    /// Estimators running
    Estimating,
    /// Analysis finished
    Complete(FeatureReport),
    /// Analysis failed
    Failed {
        /// Error message
        message: String,
    },
    /// Analysis was abandoned before completing
    Cancelled,
}

/// Side channels of one invocation: optional progress sink and cancel flag
#[derive(Default)]
struct Monitor {
    progress: Option<Sender<AnalysisProgress>>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Monitor {
    fn report(&self, event: AnalysisProgress) {
        if let Some(ref tx) = self.progress {
            // The receiver may have been dropped by a caller that moved on
            let _ = tx.send(event);
        }
    }

    fn checkpoint(&self) -> Result<(), AnalysisError> {
        match self.cancelled {
            Some(ref flag) if flag.load(Ordering::Acquire) => Err(AnalysisError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Analyze an audio file
///
/// Decodes the file at `config.sample_rate`, then estimates tempo, key and
/// spectral statistics. Silent or very short audio yields a valid report
/// with trivial values; only unreadable input and internal numeric failures
/// are errors.
pub fn analyze(path: &Path, config: &AnalysisConfig) -> Result<FeatureReport, AnalysisError> {
    run(path, config, &Monitor::default())
}

/// Analyze an already decoded signal
///
/// The signal's own sample rate is used; `config.sample_rate` only matters
/// for decoding.
pub fn analyze_signal(
    signal: &Signal,
    config: &AnalysisConfig,
) -> Result<FeatureReport, AnalysisError> {
    config.validate().map_err(AnalysisError::InvalidConfig)?;

    let samples = signal.samples();
    let sample_rate = signal.sample_rate().hz();
    let start = Instant::now();

    let (tempo, key, spectral) = thread::scope(|scope| {
        let tempo = scope.spawn(|| estimate_tempo(samples, sample_rate, config));
        let key = scope.spawn(|| estimate_key(samples, sample_rate, config));
        let spectral = scope.spawn(|| estimate_spectral(samples, sample_rate, config));

        (
            join(tempo, "tempo"),
            join(key, "key"),
            join(spectral, "spectral"),
        )
    });
    let (tempo, key, spectral) = (tempo?, key?, spectral?);

    let beat_times = tempo.beat_times(sample_rate, config.hop_length);
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        bpm = tempo.bpm,
        beats = beat_times.len(),
        first_beat_secs = beat_times.first().copied(),
        key = %key,
        "estimators finished"
    );

    Ok(FeatureReport::assemble(
        &tempo,
        key,
        spectral,
        signal.duration_secs(),
        signal.sample_rate(),
    ))
}

fn run(
    path: &Path,
    config: &AnalysisConfig,
    monitor: &Monitor,
) -> Result<FeatureReport, AnalysisError> {
    config.validate().map_err(AnalysisError::InvalidConfig)?;
    monitor.checkpoint()?;

    let start = Instant::now();
    tracing::info!(path = %path.display(), sample_rate = config.sample_rate.hz(), "analyzing");

    monitor.report(AnalysisProgress::Decoding {
        path: path.to_path_buf(),
    });
    let signal = TrackLoader::with_sample_rate(config.sample_rate).load(path)?;
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        duration_secs = signal.duration_secs(),
        "decoded"
    );
    monitor.report(AnalysisProgress::Decoded {
        duration_secs: signal.duration_secs(),
    });
    monitor.checkpoint()?;

    monitor.report(AnalysisProgress::Estimating);
    let report = analyze_signal(&signal, config)?;
    monitor.checkpoint()?;

    tracing::info!(
        path = %path.display(),
        elapsed_secs = start.elapsed().as_secs_f32(),
        "analysis complete"
    );
    Ok(report)
}

fn join<T>(
    handle: ScopedJoinHandle<'_, Result<T, EstimatorError>>,
    stage: &'static str,
) -> Result<T, AnalysisError> {
    handle
        .join()
        .map_err(|_| AnalysisError::WorkerPanicked(stage))?
        .map_err(AnalysisError::from)
}

fn estimate_tempo(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<TempoEstimate, EstimatorError> {
    let onset = OnsetDetector::new(sample_rate, config.frame_size, config.hop_length)?
        .onset_strength(samples);
    TempoEstimator::new(sample_rate, config.hop_length)?.estimate(&onset)
}

fn estimate_key(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<KeyEstimate, EstimatorError> {
    let chroma = ChromaAnalyzer::new(sample_rate, config.hop_length)?.chromagram(samples);
    KeyEstimator::new().estimate(&chroma.profile())
}

fn estimate_spectral(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<SpectralSummary, EstimatorError> {
    SpectralAnalyzer::new(sample_rate, config.frame_size, config.hop_length)?
        .analyze(samples)
        .summary()
}

/// An analysis running on its own thread
///
/// Each job owns its signal and its result, so abandoning one (for example
/// when the user loads another file) never disturbs any other job's report.
pub struct AnalysisJob {
    progress: Receiver<AnalysisProgress>,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<Result<FeatureReport, AnalysisError>>,
}

impl AnalysisJob {
    /// Start analyzing `path` in the background
    pub fn spawn(path: PathBuf, config: AnalysisConfig) -> Self {
        Self::start(path, config, Arc::new(AtomicBool::new(false)))
    }

    fn start(path: PathBuf, config: AnalysisConfig, cancelled: Arc<AtomicBool>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();

        let monitor = Monitor {
            progress: Some(tx),
            cancelled: Some(Arc::clone(&cancelled)),
        };

        let handle = thread::spawn(move || {
            let result = run(&path, &config, &monitor);
            match &result {
                Ok(report) => monitor.report(AnalysisProgress::Complete(report.clone())),
                Err(AnalysisError::Cancelled) => monitor.report(AnalysisProgress::Cancelled),
                Err(e) => monitor.report(AnalysisProgress::Failed {
                    message: e.to_string(),
                }),
            }
            result
        });

        Self {
            progress: rx,
            cancelled,
            handle,
        }
    }

    /// Progress updates, ending with `Complete`, `Failed` or `Cancelled`
    pub fn progress(&self) -> &Receiver<AnalysisProgress> {
        &self.progress
    }

    /// Ask the job to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether the worker thread has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job ends and take its result
    pub fn wait(self) -> Result<FeatureReport, AnalysisError> {
        self.handle
            .join()
            .map_err(|_| AnalysisError::WorkerPanicked("analysis job"))?
    }
}
