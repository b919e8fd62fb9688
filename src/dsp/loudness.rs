//! Gated loudness and loudness range.
//!
//! Follows the shape of the broadcast loudness algorithm: K-weighting, 400 ms
//! blocks every 100 ms, an absolute gate, power averaging. The weighting filter
//! is a single-pole approximation, so readings are close to but not equal to
//! a certified meter. There is no relative gate.

use crate::audio::SampleBuffer;
use crate::cancel::CancellationToken;
use crate::config::LoudnessConfig;
use crate::dsp::filters::{k_weight, mean, percentile, windowed_mean_square};
use crate::error::Result;

pub const BLOCK_SECS: f32 = 0.4;
pub const OVERLAP: f32 = 0.75;
pub const HIGHPASS_HZ: f32 = 38.0;
pub const SHELF_HZ: f32 = 4_000.0;
pub const SHELF_GAIN_DB: f32 = 4.0;
pub const ABSOLUTE_GATE_LUFS: f32 = -70.0;

pub const MIN_LUFS: f32 = -50.0;
pub const MAX_LUFS: f32 = 0.0;
pub const MAX_RANGE_LU: f32 = 30.0;

/// Offset between mean-square power and LUFS
const LUFS_OFFSET: f32 = -0.691;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessEstimate {
    /// Integrated loudness, clamped to -50..=0
    pub integrated_lufs: f32,

    /// p95 - p10 of block loudness, clamped to 0..=30
    pub range_lu: f32,

    /// Blocks that passed the absolute gate
    pub gated_blocks: usize,
}

impl LoudnessEstimate {
    fn silent() -> Self {
        Self {
            integrated_lufs: MIN_LUFS,
            range_lu: 0.0,
            gated_blocks: 0,
        }
    }
}

pub fn measure_loudness(
    buffer: &SampleBuffer,
    config: &LoudnessConfig,
    cancel: &CancellationToken,
) -> Result<LoudnessEstimate> {
    let sample_rate = buffer.sample_rate();
    let weighted = k_weight(
        buffer.samples(),
        config.highpass_hz,
        config.shelf_hz,
        config.shelf_gain_db,
        sample_rate,
    );
    cancel.check()?;

    let block = buffer.samples_for(config.block_secs);
    let hop = buffer.samples_for(config.block_secs * (1.0 - config.overlap));
    let powers = windowed_mean_square(&weighted, block, hop);
    cancel.check()?;

    let gate = lufs_to_power(config.absolute_gate_lufs);
    let kept: Vec<f32> = powers.into_iter().filter(|&power| power >= gate).collect();
    if kept.is_empty() {
        tracing::debug!("every block below the absolute gate");
        return Ok(LoudnessEstimate::silent());
    }

    let integrated_lufs = power_to_lufs(mean(&kept)).clamp(MIN_LUFS, MAX_LUFS);

    let block_loudness: Vec<f32> = kept.iter().map(|&power| power_to_lufs(power)).collect();
    let range_lu = (percentile(&block_loudness, 95.0) - percentile(&block_loudness, 10.0))
        .clamp(0.0, MAX_RANGE_LU);

    tracing::debug!(blocks = kept.len(), integrated_lufs, range_lu, "loudness measured");

    Ok(LoudnessEstimate {
        integrated_lufs,
        range_lu,
        gated_blocks: kept.len(),
    })
}

fn power_to_lufs(power: f32) -> f32 {
    LUFS_OFFSET + 10.0 * power.log10()
}

fn lufs_to_power(lufs: f32) -> f32 {
    10f32.powf((lufs - LUFS_OFFSET) / 10.0)
}
