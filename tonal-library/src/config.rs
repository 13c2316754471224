//! Analysis configuration and persisted user preferences
//!
//! Preferences are stored as a simple key=value file so the last chosen
//! sample rate and framing survive restarts.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sample rates the decoder can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleRate {
    #[default]
    Hz22050,
    Hz32000,
    Hz44100,
    Hz48000,
    Hz96000,
}

impl SampleRate {
    /// Every supported rate, lowest first
    pub const ALL: [SampleRate; 5] = [
        SampleRate::Hz22050,
        SampleRate::Hz32000,
        SampleRate::Hz44100,
        SampleRate::Hz48000,
        SampleRate::Hz96000,
    ];

    /// Rate in Hz
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz22050 => 22050,
            SampleRate::Hz32000 => 32000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz96000 => 96000,
        }
    }

    /// Highest representable frequency in Hz
    pub fn nyquist(&self) -> f32 {
        self.hz() as f32 / 2.0
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = u32;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Self::ALL.into_iter().find(|rate| rate.hz() == hz).ok_or(hz)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Parameters for one analysis invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Rate the file is decoded (and resampled) to
    pub sample_rate: SampleRate,
    /// Frame length for the onset and spectral estimators
    pub frame_size: usize,
    /// Step between frames for every frame-based estimator
    pub hop_length: usize,
}

impl AnalysisConfig {
    /// Default frame length in samples
    pub const DEFAULT_FRAME_SIZE: usize = 2048;
    /// Default hop in samples
    pub const DEFAULT_HOP_LENGTH: usize = 512;

    /// Default framing at the given sample rate
    pub fn with_sample_rate(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Check the framing parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.hop_length == 0 {
            return Err("hop length must be at least 1 sample".into());
        }
        if self.frame_size < 2 {
            return Err(format!(
                "frame size must be at least 2 samples (got {})",
                self.frame_size
            ));
        }
        if self.hop_length > self.frame_size {
            return Err(format!(
                "hop length {} exceeds frame size {}",
                self.hop_length, self.frame_size
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::default(),
            frame_size: Self::DEFAULT_FRAME_SIZE,
            hop_length: Self::DEFAULT_HOP_LENGTH,
        }
    }
}

/// Persisted user preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    /// Analysis settings last chosen by the user
    pub analysis: AnalysisConfig,
}

impl Preferences {
    /// Load preferences from the default location
    ///
    /// Returns defaults if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load preferences from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save preferences to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save preferences to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default preferences file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tonal")
            .join("config.txt")
    }

    /// Parse preferences from simple key=value format
    ///
    /// Unknown keys are ignored; malformed values keep their defaults.
    fn parse(content: &str) -> Self {
        let mut prefs = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "sample_rate" => match value.parse::<u32>().map(SampleRate::try_from) {
                    Ok(Ok(rate)) => prefs.analysis.sample_rate = rate,
                    _ => tracing::warn!(value, "ignoring unsupported sample_rate preference"),
                },
                "frame_size" => match value.parse::<usize>() {
                    Ok(size) if size >= 2 => prefs.analysis.frame_size = size,
                    _ => tracing::warn!(value, "ignoring invalid frame_size preference"),
                },
                "hop_length" => match value.parse::<usize>() {
                    Ok(hop) if hop >= 1 => prefs.analysis.hop_length = hop,
                    _ => tracing::warn!(value, "ignoring invalid hop_length preference"),
                },
                _ => {}
            }
        }

        prefs
    }

    /// Serialize preferences to simple key=value format
    fn serialize(&self) -> String {
        let lines = [
            "# tonal preferences".to_string(),
            format!("sample_rate={}", self.analysis.sample_rate.hz()),
            format!("frame_size={}", self.analysis.frame_size),
            format!("hop_length={}", self.analysis.hop_length),
        ];
        lines.join("\n")
    }
}
