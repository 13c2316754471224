//! tonal - command-line music analyzer
//!
//! Prints tempo, key and spectral descriptors for each audio file given.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tonal_library::{analyze, AnalysisConfig, FeatureReport, Preferences, SampleRate};

#[derive(Parser, Debug)]
#[command(name = "tonal", version, about = "Estimate tempo, key and spectral features of audio files")]
struct Cli {
    /// Audio files to analyze (MP3, WAV, FLAC, OGG, AAC)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Decode sample rate in Hz (22050, 32000, 44100, 48000, 96000)
    #[arg(short = 'r', long, value_parser = parse_sample_rate)]
    sample_rate: Option<SampleRate>,

    /// Frame length in samples
    #[arg(long)]
    frame_size: Option<usize>,

    /// Hop between frames in samples
    #[arg(long)]
    hop_length: Option<usize>,

    /// Remember these settings for later runs
    #[arg(long)]
    save_preferences: bool,
}

impl Cli {
    /// Stored preferences with command-line overrides applied
    fn config(&self, mut prefs: Preferences) -> AnalysisConfig {
        if let Some(rate) = self.sample_rate {
            prefs.analysis.sample_rate = rate;
        }
        if let Some(size) = self.frame_size {
            prefs.analysis.frame_size = size;
        }
        if let Some(hop) = self.hop_length {
            prefs.analysis.hop_length = hop;
        }
        prefs.analysis
    }
}

fn parse_sample_rate(value: &str) -> Result<SampleRate, String> {
    let hz: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a sample rate"))?;
    SampleRate::try_from(hz).map_err(|hz| {
        let supported: Vec<String> = SampleRate::ALL.iter().map(|r| r.hz().to_string()).collect();
        format!("{hz} Hz is not supported (choose {})", supported.join(", "))
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Analyze every file; returns whether all of them succeeded
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = cli.config(Preferences::load());
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid analysis settings")?;

    if cli.save_preferences {
        let prefs = Preferences { analysis: config };
        prefs.save().with_context(|| {
            format!(
                "Failed to save preferences to {}",
                Preferences::config_path().display()
            )
        })?;
        tracing::info!(path = %Preferences::config_path().display(), "preferences saved");
    }

    let mut all_ok = true;
    for (i, path) in cli.files.iter().enumerate() {
        if cli.files.len() > 1 {
            if i > 0 {
                println!();
            }
            println!("{}", path.display());
        }

        match analyze(path, &config) {
            Ok(report) => print!("{}", render_report(&report)),
            Err(e) => {
                eprintln!("Error analyzing {}: {e}", path.display());
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

/// Report text, one labelled line per descriptor
fn render_report(report: &FeatureReport) -> String {
    format!(
        "BPM: {}\n\
         Key: {}\n\
         Zero-Crossing Rate: {:.2}\n\
         Spectral Centroid: {:.2}\n\
         Spectral Bandwidth: {:.2}\n\
         Spectral Flatness: {:.2}\n\
         Duration: {}\n",
        report.tempo_bpm,
        report.key_label(),
        report.zero_crossing_rate,
        report.spectral_centroid,
        report.spectral_bandwidth,
        report.spectral_flatness,
        format_time(report.duration_secs),
    )
}

/// Format seconds as m:ss
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonal_library::{Mode, PitchClass};

    fn report() -> FeatureReport {
        FeatureReport {
            tempo_bpm: 128,
            key: PitchClass::A,
            mode: Mode::Major,
            zero_crossing_rate: 0.0412,
            spectral_centroid: 1834.567,
            spectral_bandwidth: 1620.0,
            spectral_flatness: 0.004,
            duration_secs: 185.9,
            sample_rate: SampleRate::Hz22050,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.99), "0:59");
        assert_eq!(format_time(61.0), "1:01");
        assert_eq!(format_time(3725.0), "62:05");
    }

    #[test]
    fn test_render_report() {
        let text = render_report(&report());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "BPM: 128",
                "Key: A Major",
                "Zero-Crossing Rate: 0.04",
                "Spectral Centroid: 1834.57",
                "Spectral Bandwidth: 1620.00",
                "Spectral Flatness: 0.00",
                "Duration: 3:05",
            ]
        );
    }

    #[test]
    fn test_cli_overrides_preferences() {
        let cli = Cli::parse_from(["tonal", "--sample-rate", "44100", "--hop-length", "256", "a.wav"]);
        let config = cli.config(Preferences::default());
        assert_eq!(config.sample_rate, SampleRate::Hz44100);
        assert_eq!(config.hop_length, 256);
        assert_eq!(config.frame_size, AnalysisConfig::DEFAULT_FRAME_SIZE);
        assert_eq!(cli.files, [PathBuf::from("a.wav")]);
    }

    #[test]
    fn test_parse_sample_rate() {
        assert_eq!(parse_sample_rate("48000"), Ok(SampleRate::Hz48000));
        assert!(parse_sample_rate("16000").is_err());
        assert!(parse_sample_rate("fast").is_err());
    }

    #[test]
    fn test_files_are_required() {
        assert!(Cli::try_parse_from(["tonal"]).is_err());
    }
}
