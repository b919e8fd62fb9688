use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};

/// Lowest sample rate the analyzers are tuned for (Hz)
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Decoded mono audio, the sole input of the analysis pipeline.
///
/// Samples are single-precision values in `-1.0..=1.0`. Downmixing and
/// decoding happen before a buffer is built; the analyzers never see
/// interleaved multi-channel data.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap decoded mono samples. Rejects sample rates below [`MIN_SAMPLE_RATE`].
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate < MIN_SAMPLE_RATE {
            return Err(AnalyzerError::UnsupportedSampleRate { sample_rate });
        }
        Ok(Self { samples, sample_rate })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Number of samples covering `secs` seconds at this buffer's rate, at least one
    pub fn samples_for(&self, secs: f32) -> usize {
        ((secs * self.sample_rate as f32).round() as usize).max(1)
    }

    /// Time in seconds for a sample index
    pub fn time_for_sample(&self, index: usize) -> f32 {
        index as f32 / self.sample_rate as f32
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Structural position of a hot cue within the track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueLabel {
    Intro,
    Verse,
    Chorus,
    Outro,
}

impl CueLabel {
    /// Label for a relative track position in `0.0..=1.0`
    pub fn for_position(position: f32) -> Self {
        if position < 0.3 {
            Self::Intro
        } else if position < 0.5 {
            Self::Verse
        } else if position < 0.7 {
            Self::Chorus
        } else {
            Self::Outro
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "Intro",
            Self::Verse => "Verse",
            Self::Chorus => "Chorus",
            Self::Outro => "Outro",
        }
    }
}

impl fmt::Display for CueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-navigable marker at a structurally significant point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotCue {
    /// Position in seconds, snapped to the beat grid
    pub time: f32,

    pub label: CueLabel,
}

/// Complete analysis results for one buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Tempo in beats per minute, within 50..=180
    pub bpm: u32,

    /// Confidence in the tempo estimate (0.0-1.0)
    pub bpm_confidence: f32,

    /// Canonical key name, e.g. "A minor"
    pub key: String,

    /// Confidence in the key estimate (0.0-1.0)
    pub key_confidence: f32,

    /// Camelot wheel code, "1A".."12B"
    pub camelot_key: String,

    /// Normalized intensity (0.1-1.0)
    pub energy: f32,

    /// Loudest window RMS
    pub peak_energy: f32,

    /// Ratio of loud to quiet window energy, at least 1.0
    pub dynamic_range: f32,

    /// Integrated loudness estimate, within -50..=0
    #[serde(rename = "loudnessLUFS")]
    pub loudness_lufs: f32,

    /// Loudness range in LU, within 0..=30
    pub loudness_range: f32,

    /// Track-in point in seconds
    pub cue_in: f32,

    /// Track-out point in seconds
    pub cue_out: f32,

    /// Up to eight structural cues, ascending by time
    pub hot_cues: Vec<HotCue>,

    /// Duration of the analyzed buffer in seconds
    pub duration_secs: f32,

    /// Sample rate of the analyzed buffer
    pub sample_rate: u32,
}
