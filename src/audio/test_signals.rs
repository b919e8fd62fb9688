//! Synthetic signals shared by the unit tests.

use std::f32::consts::PI;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::SampleBuffer;

pub fn silence(secs: f32, sample_rate: u32) -> SampleBuffer {
    let len = (secs * sample_rate as f32) as usize;
    SampleBuffer::new(vec![0.0; len], sample_rate).unwrap()
}

pub fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> SampleBuffer {
    let len = (secs * sample_rate as f32) as usize;
    let samples = (0..len)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amplitude)
        .collect();
    SampleBuffer::new(samples, sample_rate).unwrap()
}

/// Single-sample impulses every `spacing_secs`, the first at `offset_secs`
pub fn impulse_train(spacing_secs: f32, offset_secs: f32, secs: f32, sample_rate: u32) -> SampleBuffer {
    let len = (secs * sample_rate as f32) as usize;
    let mut samples = vec![0.0; len];
    let mut t = offset_secs;
    while t < secs {
        let index = (t * sample_rate as f32).round() as usize;
        if index < len {
            samples[index] = 1.0;
        }
        t += spacing_secs;
    }
    SampleBuffer::new(samples, sample_rate).unwrap()
}

/// Square wave of constant magnitude: mean absolute value equals `level`
pub fn constant_level(level: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
    let len = (secs * sample_rate as f32) as usize;
    (0..len).map(|i| if i % 2 == 0 { level } else { -level }).collect()
}

/// Seeded white noise so tests stay deterministic
pub fn noise(amplitude: f32, secs: f32, sample_rate: u32, seed: u64) -> SampleBuffer {
    let mut rng = SmallRng::seed_from_u64(seed);
    let len = (secs * sample_rate as f32) as usize;
    let samples = (0..len).map(|_| rng.gen_range(-amplitude..=amplitude)).collect();
    SampleBuffer::new(samples, sample_rate).unwrap()
}

/// Element-wise sum of two equally long buffers, clipped to [-1, 1]
pub fn mix(a: &SampleBuffer, b: &SampleBuffer) -> SampleBuffer {
    let samples = a
        .samples()
        .iter()
        .zip(b.samples())
        .map(|(x, y)| (x + y).clamp(-1.0, 1.0))
        .collect();
    SampleBuffer::new(samples, a.sample_rate()).unwrap()
}
