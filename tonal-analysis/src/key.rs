//! Key label selection from a chroma profile
//!
//! The key is the pitch class with the most average energy. The mode comes
//! from a fixed table on that pitch class alone: the five "black key" roots
//! (C#, D#, F#, G#, A#) are labelled minor, everything else major. This is a
//! fixed lookup, not a key-signature analysis; treat the mode as a coarse
//! hint.

use crate::error::EstimatorError;
use std::fmt;

/// One of the twelve pitch classes, spelled with sharps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in index order (C = 0)
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class for an index, wrapping modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Index of this pitch class (0-11, where 0=C)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Display name using sharps (e.g. "C#")
    pub fn name(&self) -> &'static str {
        use PitchClass::*;
        match self {
            C => "C",
            CSharp => "C#",
            D => "D",
            DSharp => "D#",
            E => "E",
            F => "F",
            FSharp => "F#",
            G => "G",
            GSharp => "G#",
            A => "A",
            ASharp => "A#",
            B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Major or minor label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Mode assigned to a key root by the fixed lookup table
    pub fn for_pitch_class(pitch_class: PitchClass) -> Self {
        use PitchClass::*;
        match pitch_class {
            CSharp | DSharp | FSharp | GSharp | ASharp => Mode::Minor,
            C | D | E | F | G | A | B => Mode::Major,
        }
    }

    /// "Major" or "Minor"
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selected key root and its mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEstimate {
    pub key: PitchClass,
    pub mode: Mode,
}

impl KeyEstimate {
    /// Key estimate for a root, with the mode taken from the lookup table
    pub fn from_pitch_class(key: PitchClass) -> Self {
        Self {
            key,
            mode: Mode::for_pitch_class(key),
        }
    }
}

impl fmt::Display for KeyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.mode)
    }
}

/// Picks the key label from a time-averaged chroma profile
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyEstimator;

impl KeyEstimator {
    /// Create a new key estimator
    pub fn new() -> Self {
        Self
    }

    /// Select the dominant pitch class
    ///
    /// Ties go to the lowest index, so an all-zero (silent) profile yields
    /// C Major.
    pub fn estimate(&self, profile: &[f32; 12]) -> Result<KeyEstimate, EstimatorError> {
        if profile.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite("chroma profile"));
        }

        let mut best = 0;
        for (i, &v) in profile.iter().enumerate() {
            if v > profile[best] {
                best = i;
            }
        }

        Ok(KeyEstimate::from_pitch_class(PitchClass::from_index(best)))
    }
}
