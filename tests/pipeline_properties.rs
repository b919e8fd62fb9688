use std::collections::HashSet;
use std::f32::consts::PI;

use deck_analyzer::{
    cancel::CancellationToken,
    config::CueConfig,
    dsp::{find_cue_points, Key},
    key_to_camelot, AnalysisPipeline, AnalysisResult, AnalyzerError, SampleBuffer,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> SampleBuffer {
    let len = (secs * sample_rate as f32) as usize;
    let samples = (0..len)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amplitude)
        .collect();
    SampleBuffer::new(samples, sample_rate).unwrap()
}

fn clicks(spacing_secs: f32, secs: f32, sample_rate: u32) -> SampleBuffer {
    let len = (secs * sample_rate as f32) as usize;
    let mut samples = vec![0.0; len];
    let mut t = spacing_secs / 2.0;
    while t < secs {
        let index = (t * sample_rate as f32).round() as usize;
        if index < len {
            samples[index] = 1.0;
        }
        t += spacing_secs;
    }
    SampleBuffer::new(samples, sample_rate).unwrap()
}

/// Noise bursts of random length and level over a quiet bed
fn random_track(seed: u64, secs: f32, sample_rate: u32) -> SampleBuffer {
    let mut rng = SmallRng::seed_from_u64(seed);
    let len = (secs * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(len);
    while samples.len() < len {
        let segment = rng.gen_range(sample_rate as usize / 4..sample_rate as usize * 3);
        let level: f32 = rng.gen_range(0.0..0.9);
        for _ in 0..segment.min(len - samples.len()) {
            samples.push(rng.gen_range(-1.0f32..=1.0) * level);
        }
    }
    SampleBuffer::new(samples, sample_rate).unwrap()
}

fn assert_well_formed(result: &AnalysisResult) {
    assert!((50..=180).contains(&result.bpm), "bpm {}", result.bpm);
    assert!((0.0..=1.0).contains(&result.bpm_confidence));
    assert!((0.0..=1.0).contains(&result.key_confidence));
    assert_eq!(key_to_camelot(&result.key), Some(result.camelot_key.as_str()));

    assert!((0.1..=1.0).contains(&result.energy), "energy {}", result.energy);
    assert!(result.dynamic_range >= 1.0);
    assert!((-50.0..=0.0).contains(&result.loudness_lufs));
    assert!((0.0..=30.0).contains(&result.loudness_range));

    assert!(result.cue_in >= 0.0);
    assert!(result.cue_in <= result.cue_out);
    assert!(result.cue_out <= result.duration_secs);

    assert!(result.hot_cues.len() <= 8);
    assert!(result.hot_cues.windows(2).all(|pair| pair[0].time < pair[1].time));
    for cue in &result.hot_cues {
        assert!(cue.time >= result.cue_in + 8.0);
        assert!(cue.time <= result.cue_out - 8.0);
    }
}

#[test]
fn results_stay_in_range_for_varied_input() {
    let pipeline = AnalysisPipeline::new();

    for seed in 0..6 {
        let buffer = random_track(seed, 40.0, 8_000);
        let result = pipeline.analyze(&buffer, None).unwrap();
        assert_well_formed(&result);
    }

    for buffer in [
        sine(440.0, 0.9, 5.0, 22_050),
        sine(60.0, 0.01, 3.0, 8_000),
        clicks(0.35, 20.0, 44_100),
        clicks(1.5, 20.0, 22_050),
        SampleBuffer::new(vec![0.0; 22_050 * 3], 22_050).unwrap(),
    ] {
        let result = pipeline.analyze(&buffer, Some("techno")).unwrap();
        assert_well_formed(&result);
    }
}

#[test]
fn identical_buffers_give_identical_results() {
    let buffer = random_track(99, 30.0, 22_050);
    let pipeline = AnalysisPipeline::new();
    let runs: Vec<AnalysisResult> = (0..3).map(|_| pipeline.analyze(&buffer, None).unwrap()).collect();
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn camelot_codes_cover_the_wheel_once() {
    let codes: HashSet<&str> = Key::all()
        .map(|key| key_to_camelot(&key.name()).unwrap())
        .collect();
    assert_eq!(codes.len(), 24);
    for n in 1..=12 {
        assert!(codes.contains(format!("{n}A").as_str()));
        assert!(codes.contains(format!("{n}B").as_str()));
    }
}

#[test]
fn silence_reads_as_floor() {
    let buffer = SampleBuffer::new(vec![0.0; 22_050 * 10], 22_050).unwrap();
    let result = AnalysisPipeline::new().analyze(&buffer, None).unwrap();
    assert!((result.energy - 0.1).abs() < 1e-6);
    assert_eq!(result.loudness_lufs, -50.0);
}

#[test]
fn half_second_clicks_are_120_bpm() {
    let buffer = clicks(0.5, 10.0, 22_050);
    let result = AnalysisPipeline::new().analyze(&buffer, None).unwrap();
    assert_eq!(result.bpm, 120);
    assert!(result.bpm_confidence > 0.7);
}

#[test]
fn concert_a_is_detected() {
    let buffer = sine(440.0, 0.5, 6.0, 22_050);
    let result = AnalysisPipeline::new().analyze(&buffer, None).unwrap();
    assert!(result.key == "A minor" || result.key == "A major", "key {}", result.key);
    assert!(result.key_confidence > 0.5);
}

#[test]
fn short_and_low_rate_input_rejected() {
    let short = sine(440.0, 0.5, 1.0, 22_050);
    assert!(matches!(
        AnalysisPipeline::new().analyze(&short, None),
        Err(AnalyzerError::InsufficientAudio { .. })
    ));

    assert!(matches!(
        SampleBuffer::new(vec![0.0; 10_000], 4_000),
        Err(AnalyzerError::UnsupportedSampleRate { .. })
    ));
}

#[test]
fn twenty_cue_candidates_yield_the_earliest_eight() {
    let sample_rate = 8_000usize;
    let mut samples: Vec<f32> = (0..60 * sample_rate)
        .map(|i| if i % 2 == 0 { 0.1 } else { -0.1 })
        .collect();
    for k in 0..20 {
        let start = (10 + 2 * k) * sample_rate;
        for (offset, sample) in samples[start..start + sample_rate].iter_mut().enumerate() {
            *sample = if offset % 2 == 0 { 0.5 } else { -0.5 };
        }
    }
    let buffer = SampleBuffer::new(samples, sample_rate as u32).unwrap();

    let cues = find_cue_points(&buffer, 120, &CueConfig::default(), &CancellationToken::new()).unwrap();
    let times: Vec<f32> = cues.hot_cues.iter().map(|cue| cue.time).collect();
    assert_eq!(times, vec![10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0]);
}
