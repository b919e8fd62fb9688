//! # Audio Input Module
//!
//! The types that cross the analyzer boundary: the decoded mono
//! [`SampleBuffer`] going in, the [`AnalysisResult`] coming out, and the
//! [`AudioLoader`] that stands in for the external decoder.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use deck_analyzer::audio::AudioLoader;
//! use deck_analyzer::config::DecodeConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let buffer = AudioLoader::load("song.flac", &DecodeConfig::default())?;
//! println!("{:.1}s at {} Hz", buffer.duration_secs(), buffer.sample_rate());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod types;

#[cfg(test)]
pub(crate) mod test_signals;

pub use loader::AudioLoader;
pub use types::{AnalysisResult, CueLabel, HotCue, SampleBuffer, MIN_SAMPLE_RATE};
