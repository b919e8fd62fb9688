//! Perceived intensity from windowed RMS.

use crate::audio::SampleBuffer;
use crate::cancel::CancellationToken;
use crate::config::EnergyConfig;
use crate::dsp::filters::{mean, percentile, windowed_rms};
use crate::error::Result;

pub const WINDOW_SECS: f32 = 0.25;

pub const MIN_ENERGY: f32 = 0.1;
pub const MAX_ENERGY: f32 = 1.0;

/// Upper RMS bound (exclusive) and energy score of each bucket, quietest first
const BUCKETS: [(f32, f32); 5] = [(0.01, 0.1), (0.03, 0.3), (0.06, 0.5), (0.10, 0.6), (0.15, 0.75)];
const LOUDEST_BUCKET: f32 = 0.9;

const WIDE_RANGE: f32 = 10.0;
const NARROW_RANGE: f32 = 3.0;
const RANGE_NUDGE: f32 = 0.1;
const QUIET_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyProfile {
    /// Bucketed intensity score (0.1-1.0)
    pub energy: f32,

    /// Loudest window RMS
    pub peak_energy: f32,

    /// p90 / p10 of window RMS, never below 1.0
    pub dynamic_range: f32,

    pub mean_rms: f32,
}

pub fn analyze_energy(
    buffer: &SampleBuffer,
    config: &EnergyConfig,
    cancel: &CancellationToken,
) -> Result<EnergyProfile> {
    let window = buffer.samples_for(config.window_secs);
    let levels = windowed_rms(buffer.samples(), window, window);
    cancel.check()?;

    let mean_rms = mean(&levels);
    let peak_energy = levels.iter().copied().fold(0.0f32, f32::max);
    let loud = percentile(&levels, 90.0);
    let quiet = percentile(&levels, 10.0).max(QUIET_FLOOR);
    let dynamic_range = (loud / quiet).max(1.0);

    let energy = score(mean_rms, dynamic_range);

    tracing::debug!(windows = levels.len(), mean_rms, peak_energy, dynamic_range, energy, "energy measured");

    Ok(EnergyProfile {
        energy,
        peak_energy,
        dynamic_range,
        mean_rms,
    })
}

/// Bucket the mean level, then nudge by dynamics. The floor bucket is never nudged.
fn score(mean_rms: f32, dynamic_range: f32) -> f32 {
    let base = BUCKETS
        .iter()
        .find(|(limit, _)| mean_rms < *limit)
        .map_or(LOUDEST_BUCKET, |&(_, value)| value);

    if base <= MIN_ENERGY {
        return MIN_ENERGY;
    }

    let nudged = if dynamic_range > WIDE_RANGE {
        base - RANGE_NUDGE
    } else if dynamic_range < NARROW_RANGE {
        base + RANGE_NUDGE
    } else {
        base
    };
    nudged.clamp(MIN_ENERGY, MAX_ENERGY)
}
