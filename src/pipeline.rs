use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    audio::{AnalysisResult, SampleBuffer, MIN_SAMPLE_RATE},
    cancel::CancellationToken,
    config::AnalysisConfig,
    dsp::{
        analyze_energy, detect_key, detect_tempo, find_cue_points, measure_loudness, CuePoints,
        EnergyProfile, KeyEstimate, LoudnessEstimate, TempoEstimate,
    },
    error::{AnalyzerError, Result},
};

/// Buffers shorter than this are rejected
pub const MIN_DURATION_SECS: f32 = 2.0;

/// Runs every analyzer over one buffer and assembles the result.
///
/// The pipeline holds only configuration; it is cheap to clone and can be
/// shared between threads. Tempo and cue detection run in sequence (cues need
/// the beat grid) alongside key, energy and loudness.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    /// Create a pipeline with the default tuning
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with custom thresholds
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a buffer. `genre_hint` only biases the tempo octave choice.
    pub fn analyze(&self, buffer: &SampleBuffer, genre_hint: Option<&str>) -> Result<AnalysisResult> {
        self.analyze_with_cancel(buffer, genre_hint, &CancellationToken::new())
    }

    /// Analyze a buffer, stopping with [`AnalyzerError::Cancelled`] once `cancel` is raised
    pub fn analyze_with_cancel(
        &self,
        buffer: &SampleBuffer,
        genre_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        self.config.validate()?;
        self.check_input(buffer)?;

        info!(
            "Analyzing {:.1}s of audio at {} Hz",
            buffer.duration_secs(),
            buffer.sample_rate()
        );

        let config = &self.config;
        let (rhythm, (key, (energy, loudness))) = rayon::join(
            || -> Result<(TempoEstimate, CuePoints)> {
                let tempo = detect_tempo(buffer, &config.tempo, genre_hint, cancel)?;
                let cues = find_cue_points(buffer, tempo.bpm, &config.cues, cancel)?;
                Ok((tempo, cues))
            },
            || {
                rayon::join(
                    || detect_key(buffer, &config.key, cancel),
                    || {
                        rayon::join(
                            || analyze_energy(buffer, &config.energy, cancel),
                            || measure_loudness(buffer, &config.loudness, cancel),
                        )
                    },
                )
            },
        );
        let (tempo, cues) = rhythm?;
        let result = assemble(buffer, tempo, key?, energy?, loudness?, cues);

        info!(
            "Analysis complete: {} BPM ({:.2}), {} / {} ({:.2}), energy {:.2}, {:.1} LUFS, {} hot cues",
            result.bpm,
            result.bpm_confidence,
            result.key,
            result.camelot_key,
            result.key_confidence,
            result.energy,
            result.loudness_lufs,
            result.hot_cues.len()
        );

        Ok(result)
    }

    /// Run [`analyze_with_cancel`](Self::analyze_with_cancel) on tokio's blocking pool
    pub async fn analyze_async(
        &self,
        buffer: Arc<SampleBuffer>,
        genre_hint: Option<String>,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || {
            pipeline.analyze_with_cancel(&buffer, genre_hint.as_deref(), &cancel)
        })
        .await
        .map_err(|e| AnalyzerError::generic(format!("Analysis task failed: {}", e)))?
    }

    fn check_input(&self, buffer: &SampleBuffer) -> Result<()> {
        if buffer.sample_rate() < MIN_SAMPLE_RATE {
            return Err(AnalyzerError::UnsupportedSampleRate {
                sample_rate: buffer.sample_rate(),
            });
        }

        let duration_secs = buffer.duration_secs();
        if duration_secs < self.config.min_duration_secs {
            debug!(duration_secs, "buffer too short");
            return Err(AnalyzerError::InsufficientAudio {
                duration_secs,
                minimum_secs: self.config.min_duration_secs,
            });
        }
        Ok(())
    }
}

fn assemble(
    buffer: &SampleBuffer,
    tempo: TempoEstimate,
    key: KeyEstimate,
    energy: EnergyProfile,
    loudness: LoudnessEstimate,
    cues: CuePoints,
) -> AnalysisResult {
    AnalysisResult {
        bpm: tempo.bpm,
        bpm_confidence: tempo.confidence,
        key: key.key.name(),
        key_confidence: key.confidence,
        camelot_key: key.key.camelot().to_string(),
        energy: energy.energy,
        peak_energy: energy.peak_energy,
        dynamic_range: energy.dynamic_range,
        loudness_lufs: loudness.integrated_lufs,
        loudness_range: loudness.range_lu,
        cue_in: cues.cue_in,
        cue_out: cues.cue_out,
        hot_cues: cues.hot_cues,
        duration_secs: buffer.duration_secs(),
        sample_rate: buffer.sample_rate(),
    }
}
