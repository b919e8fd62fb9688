//! # deck-analyzer
//!
//! Tempo, key, energy, loudness and cue-point extraction for DJ library
//! cataloguing and beat-mixing.
//!
//! Every analyzer works on one decoded mono [`SampleBuffer`] and is
//! deterministic: the same buffer always produces the same [`AnalysisResult`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deck_analyzer::{audio::AudioLoader, config::Config, AnalysisPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let buffer = AudioLoader::load("track.flac", &config.decode)?;
//!
//! let pipeline = AnalysisPipeline::with_config(config.analysis);
//! let result = pipeline.analyze(&buffer, Some("house"))?;
//!
//! println!("{} BPM, {} ({})", result.bpm, result.key, result.camelot_key);
//! for cue in &result.hot_cues {
//!     println!("  {:>6.1}s {}", cue.time, cue.label);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Library scans
//!
//! ```rust,no_run
//! use deck_analyzer::{config::Config, BatchScanner};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let scanner = BatchScanner::new(&Config::default());
//! let reports = scanner.scan(vec!["a.mp3".into(), "b.wav".into()]).await?;
//! for report in &reports {
//!     println!("{}: {}", report.path.display(), report.is_ok());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - sample buffers, results and the decoder boundary
//! - [`dsp`] - the individual analyzers and shared filters
//! - [`pipeline`] - runs the analyzers over one buffer
//! - [`batch`] - bounded worker pool for many files
//! - [`config`] - tunable thresholds, loaded from TOML
//! - [`cancel`] - cooperative cancellation

pub mod audio;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod dsp;
pub mod error;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::{
    audio::{AnalysisResult, CueLabel, HotCue, SampleBuffer},
    batch::{BatchScanner, ScanReport, TrackReport},
    cancel::CancellationToken,
    config::Config,
    dsp::camelot::{camelot_to_key, key_to_camelot},
    error::{AnalyzerError, Result},
    pipeline::AnalysisPipeline,
};
