use thiserror::Error;

/// Main error type for the deck-analyzer library
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Insufficient audio: {duration_secs:.2}s supplied, at least {minimum_secs:.2}s required")]
    InsufficientAudio { duration_secs: f32, minimum_secs: f32 },

    #[error("Unsupported sample rate: {sample_rate} Hz (minimum 8000 Hz)")]
    UnsupportedSampleRate { sample_rate: u32 },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Audio analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Failures reported by the decoder collaborator
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open audio file: {path}")]
    OpenFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("No decodable audio track in: {path}")]
    NoAudioTrack { path: String },

    #[error("Decoding failed for {path}: {reason}")]
    DecodeFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using AnalyzerError
pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether a batch scan can skip this failure and carry on with the next file.
    ///
    /// Per-file problems (unreadable or too-short audio) are recoverable;
    /// a broken configuration or a cancelled scan is not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientAudio { .. }
            | Self::UnsupportedSampleRate { .. }
            | Self::Decode(_)
            | Self::AnalysisFailed { .. }
            | Self::Io(_) => true,
            Self::Config(_) | Self::Cancelled | Self::Generic(_) => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(DecodeError::OpenFailed { path }) => {
                format!("Could not open '{}'. Please check the file exists and is readable.", path)
            }
            Self::Decode(DecodeError::UnsupportedFormat { format }) => {
                format!("Files of type '{}' are not supported. Try WAV, MP3, FLAC, OGG or M4A.", format)
            }
            Self::InsufficientAudio { duration_secs, minimum_secs } => {
                format!(
                    "Track is too short to analyze ({:.1}s, need at least {:.1}s).",
                    duration_secs, minimum_secs
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
