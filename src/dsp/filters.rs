//! Single-pole filters and windowing helpers shared by the analyzers.
//!
//! These are minimal approximations with no flat phase and no exact
//! cutoff. Callers that need a precise response must look elsewhere.

use std::f32::consts::PI;

fn smoothing_constants(cutoff_hz: f32, sample_rate: u32) -> (f32, f32) {
    let dt = 1.0 / sample_rate as f32;
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    (dt, rc)
}

/// Single-pole low-pass: `y[n] = y[n-1] + α(x[n] - y[n-1])`
#[derive(Debug, Clone)]
pub struct LowPass {
    alpha: f32,
    previous: f32,
}

impl LowPass {
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        let (dt, rc) = smoothing_constants(cutoff_hz, sample_rate);
        Self {
            alpha: dt / (rc + dt),
            previous: 0.0,
        }
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        self.previous += self.alpha * (sample - self.previous);
        self.previous
    }
}

/// Single-pole high-pass: `y[n] = α(y[n-1] + x[n] - x[n-1])`
#[derive(Debug, Clone)]
pub struct HighPass {
    alpha: f32,
    previous_input: f32,
    previous_output: f32,
}

impl HighPass {
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        let (dt, rc) = smoothing_constants(cutoff_hz, sample_rate);
        Self {
            alpha: rc / (rc + dt),
            previous_input: 0.0,
            previous_output: 0.0,
        }
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        let output = self.alpha * (self.previous_output + sample - self.previous_input);
        self.previous_input = sample;
        self.previous_output = output;
        output
    }
}

/// Crude high-shelf: the input plus `(g - 1)` times its high-passed copy.
///
/// Above the corner the response approaches `g`; below it stays near unity.
/// Not a biquad shelf.
#[derive(Debug, Clone)]
pub struct HighShelf {
    highpass: HighPass,
    extra_gain: f32,
}

impl HighShelf {
    pub fn new(corner_hz: f32, gain_db: f32, sample_rate: u32) -> Self {
        let gain = 10f32.powf(gain_db / 20.0);
        Self {
            highpass: HighPass::new(corner_hz, sample_rate),
            extra_gain: gain - 1.0,
        }
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        sample + self.extra_gain * self.highpass.process(sample)
    }
}

pub fn low_pass(samples: &[f32], cutoff_hz: f32, sample_rate: u32) -> Vec<f32> {
    let mut filter = LowPass::new(cutoff_hz, sample_rate);
    samples.iter().map(|&s| filter.process(s)).collect()
}

pub fn high_pass(samples: &[f32], cutoff_hz: f32, sample_rate: u32) -> Vec<f32> {
    let mut filter = HighPass::new(cutoff_hz, sample_rate);
    samples.iter().map(|&s| filter.process(s)).collect()
}

/// K-weighting approximation: high-pass followed by a high-shelf boost
pub fn k_weight(
    samples: &[f32],
    highpass_hz: f32,
    shelf_hz: f32,
    shelf_gain_db: f32,
    sample_rate: u32,
) -> Vec<f32> {
    let mut highpass = HighPass::new(highpass_hz, sample_rate);
    let mut shelf = HighShelf::new(shelf_hz, shelf_gain_db, sample_rate);
    samples
        .iter()
        .map(|&s| shelf.process(highpass.process(s)))
        .collect()
}

pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Start offsets of full windows of `window` samples every `hop` samples.
///
/// A buffer shorter than one window yields a single window at offset 0, which
/// the caller treats as a partial window.
pub fn window_starts(len: usize, window: usize, hop: usize) -> impl Iterator<Item = usize> {
    let hop = hop.max(1);
    let count = if len == 0 {
        0
    } else if len < window {
        1
    } else {
        (len - window) / hop + 1
    };
    (0..count).map(move |i| i * hop)
}

fn windowed<F>(samples: &[f32], window: usize, hop: usize, reduce: F) -> Vec<f32>
where
    F: Fn(&[f32]) -> f32,
{
    window_starts(samples.len(), window, hop)
        .map(|start| {
            let end = (start + window).min(samples.len());
            reduce(&samples[start..end])
        })
        .collect()
}

pub fn mean_square(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|&x| x * x).sum::<f32>() / frame.len() as f32
}

pub fn rms(frame: &[f32]) -> f32 {
    mean_square(frame).sqrt()
}

pub fn mean_abs(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|x| x.abs()).sum::<f32>() / frame.len() as f32
}

pub fn windowed_rms(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    windowed(samples, window, hop, rms)
}

pub fn windowed_mean_square(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    windowed(samples, window, hop, mean_square)
}

pub fn windowed_mean_abs(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    windowed(samples, window, hop, mean_abs)
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Percentile (0-100) of `values` with linear interpolation between ranks
pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f32;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
