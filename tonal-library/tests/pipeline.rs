//! Integration tests for the analysis pipeline on generated WAV files

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tonal_library::{
    analyze, AnalysisConfig, AnalysisError, AnalysisJob, AnalysisProgress, DecodeError, Mode,
    PitchClass, SampleRate,
};

/// Write mono or interleaved 16-bit PCM to a WAV file
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &s in samples {
        let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

fn fixture(dir: &TempDir, name: &str, samples: &[f32], sample_rate: u32) -> PathBuf {
    let path = dir.path().join(name);
    write_wav(&path, samples, sample_rate, 1);
    path
}

fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    (0..n)
        .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Short decaying 1 kHz bursts on every beat
fn click_track(bpm: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    let interval = (60.0 / bpm * sample_rate as f32) as usize;
    let click_len = sample_rate as usize / 100;

    let mut samples = vec![0.0f32; n];
    for start in (0..n).step_by(interval) {
        for i in 0..click_len.min(n - start) {
            let t = i as f32 / sample_rate as f32;
            let envelope = (-(i as f32) / (click_len as f32 / 5.0)).exp();
            samples[start + i] = 0.9 * envelope * (2.0 * PI * 1000.0 * t).sin();
        }
    }
    samples
}

/// Deterministic noise (xorshift)
fn noise(len: usize) -> Vec<f32> {
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            ((state as f32 / u32::MAX as f32) * 2.0 - 1.0) * 0.5
        })
        .collect()
}

#[test]
fn test_sine_440_centroid_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "a440.wav", &sine(440.0, 44100, 5.0), 44100);

    let config = AnalysisConfig::with_sample_rate(SampleRate::Hz44100);
    let report = analyze(&path, &config).expect("Analysis should succeed");

    assert!(
        (report.spectral_centroid - 440.0).abs() < 50.0,
        "centroid should be near 440 Hz, got {:.2}",
        report.spectral_centroid
    );
    assert_eq!(report.key, PitchClass::A);
    assert_eq!(report.mode, Mode::Major);
    assert!((report.duration_secs - 5.0).abs() < 0.01);
    assert_eq!(report.sample_rate, SampleRate::Hz44100);
}

#[test]
fn test_click_track_tempo() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "clicks.wav", &click_track(120.0, 44100, 12.0), 44100);

    let config = AnalysisConfig::with_sample_rate(SampleRate::Hz44100);
    let report = analyze(&path, &config).expect("Analysis should succeed");

    assert!(
        (118..=122).contains(&report.tempo_bpm),
        "tempo should be close to 120, got {}",
        report.tempo_bpm
    );
}

#[test]
fn test_silence_does_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "silence.wav", &vec![0.0; 22050 * 4], 22050);

    let report = analyze(&path, &AnalysisConfig::default()).expect("Silence should analyze");
    assert_eq!(report.zero_crossing_rate, 0.0);
    assert_eq!(report.spectral_flatness, 0.0);
    assert_eq!(report.tempo_bpm, 0);
    assert!(PitchClass::ALL.contains(&report.key));
}

#[test]
fn test_stereo_is_downmixed() {
    // Channels in antiphase cancel to silence
    let left = sine(440.0, 22050, 2.0);
    let interleaved: Vec<f32> = left.iter().flat_map(|&s| [s, -s]).collect();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    write_wav(&path, &interleaved, 22050, 2);

    let report = analyze(&path, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.zero_crossing_rate, 0.0);
    assert_eq!(report.spectral_centroid, 0.0);
    assert!((report.duration_secs - 2.0).abs() < 0.01);
}

#[test]
fn test_feature_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let mut samples = noise(32000 * 2);
    for (s, t) in samples.iter_mut().zip(sine(660.0, 32000, 2.0)) {
        *s = 0.5 * *s + t;
    }
    let path = fixture(&dir, "mix.wav", &samples, 32000);

    for rate in [SampleRate::Hz22050, SampleRate::Hz32000] {
        let report = analyze(&path, &AnalysisConfig::with_sample_rate(rate)).unwrap();
        let nyquist = rate.nyquist();

        assert!((0.0..=1.0).contains(&report.zero_crossing_rate));
        assert!((0.0..=1.0).contains(&report.spectral_flatness));
        assert!((0.0..=nyquist).contains(&report.spectral_centroid));
        assert!((0.0..=nyquist).contains(&report.spectral_bandwidth));
        assert_eq!(report.mode, Mode::for_pitch_class(report.key));
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "clicks.wav", &click_track(100.0, 22050, 6.0), 22050);

    let config = AnalysisConfig::default();
    let first = analyze(&path, &config).unwrap();
    let second = analyze(&path, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_decodability_does_not_depend_on_sample_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "tone.wav", &sine(220.0, 44100, 3.0), 44100);

    let low = analyze(&path, &AnalysisConfig::with_sample_rate(SampleRate::Hz22050)).unwrap();
    let high = analyze(&path, &AnalysisConfig::with_sample_rate(SampleRate::Hz44100)).unwrap();

    assert_eq!(low.sample_rate, SampleRate::Hz22050);
    assert_eq!(high.sample_rate, SampleRate::Hz44100);
    assert!((low.duration_secs - high.duration_secs).abs() < 0.1);
    assert_eq!(low.key, high.key);
}

#[test]
fn test_missing_file() {
    let result = analyze(Path::new("/nonexistent/track.wav"), &AnalysisConfig::default());
    assert!(matches!(
        result,
        Err(AnalysisError::Decode(DecodeError::Io(_)))
    ));
}

#[test]
fn test_zero_length_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "empty.wav", &[], 22050);

    let result = analyze(&path, &AnalysisConfig::default());
    assert!(matches!(
        result,
        Err(AnalysisError::Decode(DecodeError::Empty))
    ));
}

#[test]
fn test_non_audio_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "this is not audio at all, just some text\n".repeat(64)).unwrap();

    let result = analyze(&path, &AnalysisConfig::default());
    assert!(matches!(
        result,
        Err(AnalysisError::Decode(DecodeError::UnsupportedFormat(_)))
    ));
}

#[test]
fn test_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "tone.wav", &sine(440.0, 22050, 1.0), 22050);

    let config = AnalysisConfig {
        frame_size: 256,
        hop_length: 1024,
        ..Default::default()
    };
    assert!(matches!(
        analyze(&path, &config),
        Err(AnalysisError::InvalidConfig(_))
    ));
}

#[test]
fn test_background_job_completes() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "a440.wav", &sine(440.0, 22050, 3.0), 22050);
    let config = AnalysisConfig::default();

    let job = AnalysisJob::spawn(path.clone(), config);
    let events: Vec<AnalysisProgress> = job.progress().iter().collect();
    let report = job.wait().expect("Job should succeed");

    assert!(matches!(events[0], AnalysisProgress::Decoding { .. }));
    assert!(events
        .iter()
        .any(|e| matches!(e, AnalysisProgress::Decoded { duration_secs } if (duration_secs - 3.0).abs() < 0.01)));
    match events.last() {
        Some(AnalysisProgress::Complete(done)) => assert_eq!(done, &report),
        other => panic!("expected Complete, got {other:?}"),
    }

    assert_eq!(report, analyze(&path, &config).unwrap());
}

#[test]
fn test_single_sample_decodes_at_every_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, "blip.wav", &[0.25], 44100);

    for rate in SampleRate::ALL {
        let report = analyze(&path, &AnalysisConfig::with_sample_rate(rate))
            .unwrap_or_else(|e| panic!("{rate}: {e}"));
        assert_eq!(report.tempo_bpm, 0);
        assert_eq!(report.sample_rate, rate);
    }
}
