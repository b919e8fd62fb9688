// Renders a synthetic dance track with known tempo and key and runs the
// full pipeline over it. Handy for eyeballing analyzer changes without a
// music library at hand.

use std::f32::consts::PI;

use anyhow::Result;
use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use deck_analyzer::{AnalysisPipeline, SampleBuffer};

#[derive(Parser)]
#[command(name = "synthetic_track", about = "Analyze a generated track with known tempo and key")]
struct Cli {
    /// Tempo of the rendered kick drum
    #[arg(long, default_value_t = 124.0)]
    bpm: f32,

    /// Track length in seconds
    #[arg(long, default_value_t = 90.0)]
    seconds: f32,

    /// Sample rate of the rendered buffer
    #[arg(long, default_value_t = 22_050)]
    sample_rate: u32,

    /// Genre hint passed to the tempo detector
    #[arg(long)]
    genre: Option<String>,

    /// Seed for the hi-hat noise
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Rendering {:.0}s at {} BPM, A minor pad", cli.seconds, cli.bpm);
    let buffer = render_track(&cli)?;

    let pipeline = AnalysisPipeline::new();
    let result = pipeline.analyze(&buffer, cli.genre.as_deref())?;

    println!("\nTempo:    {} BPM (confidence {:.2})", result.bpm, result.bpm_confidence);
    println!("Key:      {} / {} (confidence {:.2})", result.key, result.camelot_key, result.key_confidence);
    println!(
        "Energy:   {:.2} (peak {:.3}, dynamic range {:.1})",
        result.energy, result.peak_energy, result.dynamic_range
    );
    println!("Loudness: {:.1} LUFS, range {:.1} LU", result.loudness_lufs, result.loudness_range);
    println!("Cues:     in {:.1}s, out {:.1}s", result.cue_in, result.cue_out);
    for (i, cue) in result.hot_cues.iter().enumerate() {
        println!("  Hot cue {}: {:>6.1}s {}", i + 1, cue.time, cue.label);
    }

    let expected = cli.bpm.round() as u32;
    if result.bpm != expected {
        println!("\nNote: rendered {} BPM, detected {}", expected, result.bpm);
    }

    Ok(())
}

/// Pad-only intro and breakdown, kick and hats in the middle sections
fn render_track(cli: &Cli) -> Result<SampleBuffer> {
    let sample_rate = cli.sample_rate as f32;
    let len = (cli.seconds * sample_rate) as usize;
    let beat = 60.0 / cli.bpm;
    let mut rng = SmallRng::seed_from_u64(cli.seed);

    // A minor triad
    let pad_notes = [220.0, 261.63, 329.63];

    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let position = t / cli.seconds;
            let drums_on = (0.2..0.45).contains(&position) || (0.6..0.9).contains(&position);

            let pad: f32 = pad_notes
                .iter()
                .map(|&freq| (2.0 * PI * freq * t).sin() * 0.08)
                .sum();

            let mut sample = pad;
            if drums_on {
                let phase = (t % beat) / beat;
                if phase < 0.1 {
                    let envelope = 1.0 - phase * 10.0;
                    sample += (2.0 * PI * 55.0 * t).sin() * 0.6 * envelope;
                }
                if (0.45..0.55).contains(&phase) {
                    sample += rng.gen_range(-0.05..0.05);
                }
            }
            sample.clamp(-1.0, 1.0)
        })
        .collect();

    Ok(SampleBuffer::new(samples, cli.sample_rate)?)
}
