//! The 24 canonical keys and their Camelot wheel codes.

use std::fmt;

/// Pitch-class spellings, C = 0
pub const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Camelot codes for major keys, indexed by root pitch class
const CAMELOT_MAJOR: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];

/// Camelot codes for minor keys, indexed by root pitch class
const CAMELOT_MINOR: [&str; 12] = [
    "5A", "12A", "7A", "2A", "9A", "4A", "11A", "6A", "1A", "8A", "3A", "10A",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

/// A musical key: root pitch class (C = 0) plus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    root: u8,
    mode: Mode,
}

impl Key {
    /// Build a key; the root wraps modulo 12
    pub fn new(root: u8, mode: Mode) -> Self {
        Self { root: root % 12, mode }
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All 24 keys: the twelve majors from C, then the twelve minors
    pub fn all() -> impl Iterator<Item = Key> {
        [Mode::Major, Mode::Minor]
            .into_iter()
            .flat_map(|mode| (0..12u8).map(move |root| Key::new(root, mode)))
    }

    /// Canonical name such as "A minor"
    pub fn name(&self) -> String {
        format!("{} {}", PITCH_NAMES[self.root as usize], self.mode.as_str())
    }

    pub fn camelot(&self) -> &'static str {
        match self.mode {
            Mode::Major => CAMELOT_MAJOR[self.root as usize],
            Mode::Minor => CAMELOT_MINOR[self.root as usize],
        }
    }

    /// Parse a canonical name; case-insensitive on the mode word
    pub fn from_name(name: &str) -> Option<Self> {
        let (pitch, mode) = name.trim().split_once(' ')?;
        let mode = match mode.trim().to_lowercase().as_str() {
            "major" => Mode::Major,
            "minor" => Mode::Minor,
            _ => return None,
        };
        let root = PITCH_NAMES.iter().position(|&p| p == pitch)?;
        Some(Self::new(root as u8, mode))
    }

    pub fn from_camelot(code: &str) -> Option<Self> {
        let code = code.trim().to_uppercase();
        Self::all().find(|key| key.camelot() == code)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", PITCH_NAMES[self.root as usize], self.mode.as_str())
    }
}

/// Camelot code for a canonical key name, e.g. "A minor" → "8A"
pub fn key_to_camelot(name: &str) -> Option<&'static str> {
    Key::from_name(name).map(|key| key.camelot())
}

/// Canonical key name for a Camelot code, e.g. "8A" → "A minor"
pub fn camelot_to_key(code: &str) -> Option<String> {
    Key::from_camelot(code).map(|key| key.name())
}
