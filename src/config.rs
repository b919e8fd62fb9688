use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{cues, energy, key, loudness, tempo},
    error::{ConfigError, Result},
    pipeline::MIN_DURATION_SECS,
};

/// Main configuration for deck-analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis thresholds and window sizes
    pub analysis: AnalysisConfig,

    /// Decoder settings (working sample rate, length cap)
    pub decode: DecodeConfig,

    /// Library scan settings
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.decode.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn require_positive(key: &str, value: f32) -> std::result::Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, value))
    }
}

fn require_overlap(key: &str, value: f32) -> std::result::Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, value))
    }
}

/// Tuned thresholds for every analyzer.
///
/// The defaults are empirically tuned; changing any of them changes
/// observable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Buffers shorter than this are rejected outright
    pub min_duration_secs: f32,

    pub tempo: TempoConfig,
    pub key: KeyConfig,
    pub energy: EnergyConfig,
    pub loudness: LoudnessConfig,
    pub cues: CueConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: MIN_DURATION_SECS,
            tempo: TempoConfig::default(),
            key: KeyConfig::default(),
            energy: EnergyConfig::default(),
            loudness: LoudnessConfig::default(),
            cues: CueConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("analysis.min_duration_secs", self.min_duration_secs)?;
        self.tempo.validate()?;
        self.key.validate()?;
        self.energy.validate()?;
        self.loudness.validate()?;
        self.cues.validate()?;
        Ok(())
    }
}

/// Tempo detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Low-pass cutoff isolating kick/bass content (Hz)
    pub lowpass_cutoff_hz: f32,

    /// RMS window length in seconds (hop is half of this)
    pub window_secs: f32,

    /// Peaks must exceed this multiple of the mean window energy
    pub peak_threshold: f32,

    /// Minimum distance between accepted peaks in seconds
    pub min_peak_separation_secs: f32,

    /// Shortest plausible beat interval in seconds
    pub min_interval_secs: f32,

    /// Longest plausible beat interval in seconds
    pub max_interval_secs: f32,

    /// Relative distance from the median counted as agreement
    pub agreement_tolerance: f32,

    /// Upper bound on reported confidence
    pub max_confidence: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            lowpass_cutoff_hz: tempo::LOWPASS_CUTOFF_HZ,
            window_secs: tempo::WINDOW_SECS,
            peak_threshold: tempo::PEAK_THRESHOLD,
            min_peak_separation_secs: tempo::MIN_PEAK_SEPARATION_SECS,
            min_interval_secs: tempo::MIN_INTERVAL_SECS,
            max_interval_secs: tempo::MAX_INTERVAL_SECS,
            agreement_tolerance: tempo::AGREEMENT_TOLERANCE,
            max_confidence: tempo::MAX_CONFIDENCE,
        }
    }
}

impl TempoConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("analysis.tempo.lowpass_cutoff_hz", self.lowpass_cutoff_hz)?;
        require_positive("analysis.tempo.window_secs", self.window_secs)?;
        require_positive("analysis.tempo.peak_threshold", self.peak_threshold)?;
        require_positive("analysis.tempo.min_interval_secs", self.min_interval_secs)?;
        if self.min_peak_separation_secs < 0.0 {
            return Err(invalid("analysis.tempo.min_peak_separation_secs", self.min_peak_separation_secs));
        }
        if self.max_interval_secs <= self.min_interval_secs {
            return Err(invalid(
                "analysis.tempo.interval_range",
                format!("{}-{}", self.min_interval_secs, self.max_interval_secs),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_confidence) {
            return Err(invalid("analysis.tempo.max_confidence", self.max_confidence));
        }
        require_positive("analysis.tempo.agreement_tolerance", self.agreement_tolerance)
    }
}

/// Key detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// FFT window in samples
    pub window_size: usize,

    /// Fractional overlap between consecutive windows
    pub overlap: f32,

    /// Lowest frequency folded into the chromagram (Hz)
    pub min_freq_hz: f32,

    /// Highest frequency folded into the chromagram (Hz)
    pub max_freq_hz: f32,

    /// Per-octave-band weight decay
    pub harmonic_decay: f32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            window_size: key::WINDOW_SIZE,
            overlap: key::OVERLAP,
            min_freq_hz: key::MIN_FREQ_HZ,
            max_freq_hz: key::MAX_FREQ_HZ,
            harmonic_decay: key::HARMONIC_DECAY,
        }
    }
}

impl KeyConfig {
    /// Hop between consecutive windows in samples
    pub fn hop_size(&self) -> usize {
        ((self.window_size as f32 * (1.0 - self.overlap)).round() as usize).max(1)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.window_size < 2 {
            return Err(invalid("analysis.key.window_size", self.window_size));
        }
        require_overlap("analysis.key.overlap", self.overlap)?;
        require_positive("analysis.key.min_freq_hz", self.min_freq_hz)?;
        if self.max_freq_hz <= self.min_freq_hz {
            return Err(invalid(
                "analysis.key.frequency_band",
                format!("{}-{}", self.min_freq_hz, self.max_freq_hz),
            ));
        }
        if !(self.harmonic_decay > 0.0 && self.harmonic_decay <= 1.0) {
            return Err(invalid("analysis.key.harmonic_decay", self.harmonic_decay));
        }
        Ok(())
    }
}

/// Energy analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// RMS window length in seconds
    pub window_secs: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self { window_secs: energy::WINDOW_SECS }
    }
}

impl EnergyConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("analysis.energy.window_secs", self.window_secs)
    }
}

/// Loudness meter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessConfig {
    /// Measurement block length in seconds
    pub block_secs: f32,

    /// Fractional overlap between blocks
    pub overlap: f32,

    /// Corner of the weighting high-pass (Hz)
    pub highpass_hz: f32,

    /// Corner of the weighting high-shelf (Hz)
    pub shelf_hz: f32,

    /// High-shelf boost in dB
    pub shelf_gain_db: f32,

    /// Blocks quieter than this are discarded (LUFS)
    pub absolute_gate_lufs: f32,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            block_secs: loudness::BLOCK_SECS,
            overlap: loudness::OVERLAP,
            highpass_hz: loudness::HIGHPASS_HZ,
            shelf_hz: loudness::SHELF_HZ,
            shelf_gain_db: loudness::SHELF_GAIN_DB,
            absolute_gate_lufs: loudness::ABSOLUTE_GATE_LUFS,
        }
    }
}

impl LoudnessConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("analysis.loudness.block_secs", self.block_secs)?;
        require_overlap("analysis.loudness.overlap", self.overlap)?;
        require_positive("analysis.loudness.highpass_hz", self.highpass_hz)?;
        require_positive("analysis.loudness.shelf_hz", self.shelf_hz)?;
        if !self.shelf_gain_db.is_finite() {
            return Err(invalid("analysis.loudness.shelf_gain_db", self.shelf_gain_db));
        }
        if !self.absolute_gate_lufs.is_finite() || self.absolute_gate_lufs >= 0.0 {
            return Err(invalid("analysis.loudness.absolute_gate_lufs", self.absolute_gate_lufs));
        }
        Ok(())
    }
}

/// Cue point finder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueConfig {
    /// Energy window length in seconds
    pub window_secs: f32,

    /// Fraction of average energy a window needs to count as "playing"
    pub presence_ratio: f32,

    /// Minimum rise over the previous window for a hot-cue candidate
    pub rise_ratio: f32,

    /// Minimum multiple of average energy for a hot-cue candidate
    pub average_ratio: f32,

    /// Hot cues keep this distance from cue in/out (seconds)
    pub edge_margin_secs: f32,

    /// Maximum number of hot cues
    pub max_hot_cues: usize,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            window_secs: cues::WINDOW_SECS,
            presence_ratio: cues::PRESENCE_RATIO,
            rise_ratio: cues::RISE_RATIO,
            average_ratio: cues::AVERAGE_RATIO,
            edge_margin_secs: cues::EDGE_MARGIN_SECS,
            max_hot_cues: cues::MAX_HOT_CUES,
        }
    }
}

impl CueConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("analysis.cues.window_secs", self.window_secs)?;
        require_positive("analysis.cues.rise_ratio", self.rise_ratio)?;
        require_positive("analysis.cues.average_ratio", self.average_ratio)?;
        if !(0.0..=1.0).contains(&self.presence_ratio) {
            return Err(invalid("analysis.cues.presence_ratio", self.presence_ratio));
        }
        if self.edge_margin_secs < 0.0 {
            return Err(invalid("analysis.cues.edge_margin_secs", self.edge_margin_secs));
        }
        if self.max_hot_cues > cues::MAX_HOT_CUES {
            return Err(invalid("analysis.cues.max_hot_cues", self.max_hot_cues));
        }
        Ok(())
    }
}

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Resample decoded audio to this rate; `None` keeps the file's rate
    pub target_sample_rate: Option<u32>,

    /// Stop decoding after this many seconds; `None` decodes everything
    pub max_duration_secs: Option<f32>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: Some(22_050),
            max_duration_secs: None,
        }
    }
}

impl DecodeConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let Some(rate) = self.target_sample_rate {
            if rate < crate::audio::MIN_SAMPLE_RATE {
                return Err(invalid("decode.target_sample_rate", rate));
            }
        }
        if let Some(max) = self.max_duration_secs {
            require_positive("decode.max_duration_secs", max)?;
        }
        Ok(())
    }
}

/// Library scan settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of files analyzed concurrently
    pub workers: usize,

    /// Maximum number of files waiting for a worker
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            workers,
            queue_capacity: workers * 2,
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(invalid("batch.workers", self.workers));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("batch.queue_capacity", self.queue_capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let original_config = Config::default();

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[analysis.tempo]\npeak_threshold = 2.0\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.analysis.tempo.peak_threshold, 2.0);
        assert_eq!(config.analysis.tempo.lowpass_cutoff_hz, tempo::LOWPASS_CUTOFF_HZ);
        assert_eq!(config.analysis.key, KeyConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/deck-analyzer.toml");
        assert!(matches!(
            result,
            Err(crate::AnalyzerError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_key_hop_is_quarter_window() {
        let key = KeyConfig::default();
        assert_eq!(key.hop_size(), 4096);
    }

    #[test]
    fn test_invalid_interval_range() {
        let mut config = Config::default();
        config.analysis.tempo.min_interval_secs = 2.0;
        config.analysis.tempo.max_interval_secs = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_overlap() {
        let mut config = Config::default();
        config.analysis.loudness.overlap = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_frequency_band() {
        let mut config = Config::default();
        config.analysis.key.min_freq_hz = 3000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.batch.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_decode_rate_rejected() {
        let mut config = Config::default();
        config.decode.target_sample_rate = Some(4000);
        assert!(config.validate().is_err());
    }
}
