use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_analyzer::{
    batch::{BatchScanner, ScanReport},
    config::Config,
};

#[derive(Parser)]
#[command(
    name = "deck-analyzer",
    version,
    about = "Extract tempo, key, energy, loudness and cue points from audio files",
    long_about = "deck-analyzer decodes each input file to mono, runs the tempo, key, energy, loudness and cue-point analyzers over it, and prints one summary line per track. Use --output to keep the full results as JSON."
)]
struct Cli {
    /// Audio files to analyze (WAV, MP3, FLAC, OGG, M4A)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Genre hint used to pick the tempo octave, e.g. "house" or "dnb"
    #[arg(short, long)]
    genre: Option<String>,

    /// Number of files analyzed at once (defaults to the CPU count)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write the full results to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting deck-analyzer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    if let Some(workers) = cli.workers {
        config.batch.workers = workers;
        config.batch.queue_capacity = workers * 2;
    }
    config.validate()?;

    let mut scanner = BatchScanner::new(&config);
    if let Some(genre) = &cli.genre {
        info!("Genre hint: {}", genre);
        scanner = scanner.with_genre_hint(genre.clone());
    }

    let cancel = scanner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current files and cancelling the rest");
            cancel.cancel();
        }
    });

    let reports = scanner.scan(cli.inputs.clone()).await?;

    for report in &reports {
        match &report.outcome {
            Ok(result) => println!(
                "{}\t{} BPM ({:.0}%)\t{} / {}\tenergy {:.2}\t{:.1} LUFS\tcue {:.1}s-{:.1}s\t{} hot cues",
                report.path.display(),
                result.bpm,
                result.bpm_confidence * 100.0,
                result.key,
                result.camelot_key,
                result.energy,
                result.loudness_lufs,
                result.cue_in,
                result.cue_out,
                result.hot_cues.len()
            ),
            Err(e) => println!("{}\terror: {}", report.path.display(), e.user_message()),
        }
    }

    if let Some(output) = &cli.output {
        ScanReport::from_reports(&reports)
            .write_json(output)
            .with_context(|| format!("writing report to {}", output.display()))?;
        info!("Report saved to: {:?}", output);
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        warn!("{} of {} files could not be analyzed", failed, reports.len());
    }
    Ok(())
}
