use std::f32::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deck_analyzer::{
    cancel::CancellationToken,
    config::AnalysisConfig,
    dsp::{analyze_energy, detect_key, detect_tempo, measure_loudness},
    AnalysisPipeline, SampleBuffer,
};

const SAMPLE_RATE: u32 = 22_050;

/// One minute of kick drum over an A minor pad
fn one_minute_track() -> SampleBuffer {
    let len = 60 * SAMPLE_RATE as usize;
    let beat = 0.5;
    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let pad: f32 = [220.0, 261.63, 329.63]
                .iter()
                .map(|&f| (2.0 * PI * f * t).sin() * 0.1)
                .sum();
            let phase = (t % beat) / beat;
            let kick = if phase < 0.1 {
                (2.0 * PI * 55.0 * t).sin() * 0.6 * (1.0 - phase * 10.0)
            } else {
                0.0
            };
            (pad + kick).clamp(-1.0, 1.0)
        })
        .collect();
    SampleBuffer::new(samples, SAMPLE_RATE).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let buffer = one_minute_track();
    let config = AnalysisConfig::default();
    let cancel = CancellationToken::new();

    let pipeline = AnalysisPipeline::new();
    c.bench_function("full pipeline, 60 s at 22050 Hz", |b| {
        b.iter(|| pipeline.analyze(black_box(&buffer), None))
    });

    // Per-analyzer timings, to see which stage dominates
    c.bench_function("tempo, 60 s", |b| {
        b.iter(|| detect_tempo(black_box(&buffer), &config.tempo, None, &cancel))
    });
    c.bench_function("key, 60 s", |b| {
        b.iter(|| detect_key(black_box(&buffer), &config.key, &cancel))
    });
    c.bench_function("energy, 60 s", |b| {
        b.iter(|| analyze_energy(black_box(&buffer), &config.energy, &cancel))
    });
    c.bench_function("loudness, 60 s", |b| {
        b.iter(|| measure_loudness(black_box(&buffer), &config.loudness, &cancel))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
