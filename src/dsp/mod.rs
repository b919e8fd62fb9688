//! # Analyzers
//!
//! One module per feature. Every analyzer is a plain function over a borrowed
//! [`SampleBuffer`](crate::audio::SampleBuffer) and its section of
//! [`AnalysisConfig`](crate::config::AnalysisConfig); none keeps state between
//! calls, so they can run side by side on the same buffer.
//!
//! - [`tempo`] - BPM from bass-envelope peak spacing
//! - [`key`] - chromagram correlation against 24 key profiles
//! - [`energy`] - bucketed RMS intensity and dynamic range
//! - [`loudness`] - gated integrated loudness and loudness range
//! - [`cues`] - cue in/out and beat-snapped hot cues
//! - [`filters`] - the shared filters and window statistics

pub mod camelot;
pub mod cues;
pub mod energy;
pub mod filters;
pub mod key;
pub mod loudness;
pub mod tempo;

pub use camelot::{camelot_to_key, key_to_camelot, Key, Mode};
pub use cues::{find_cue_points, CuePoints};
pub use energy::{analyze_energy, EnergyProfile};
pub use key::{detect_key, KeyEstimate};
pub use loudness::{measure_loudness, LoudnessEstimate};
pub use tempo::{detect_tempo, TempoEstimate};
