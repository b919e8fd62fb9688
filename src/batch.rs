//! Library scans: many files through the pipeline on a bounded worker pool.
//!
//! A producer feeds file paths into a bounded job queue; it waits whenever
//! the queue is full. `workers` tasks share the queue, each decoding and
//! analyzing one file at a time on tokio's blocking pool. A failed file never
//! stops the scan, and the returned reports keep the input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    audio::{AnalysisResult, AudioLoader},
    cancel::CancellationToken,
    config::{BatchConfig, Config, DecodeConfig},
    error::{AnalyzerError, Result},
    pipeline::AnalysisPipeline,
};

/// Outcome of one file in a scan
#[derive(Debug)]
pub struct TrackReport {
    pub path: PathBuf,
    pub outcome: Result<AnalysisResult>,
}

impl TrackReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Analyzes a list of files concurrently
pub struct BatchScanner {
    pipeline: AnalysisPipeline,
    config: Config,
    genre_hint: Option<String>,
    cancel: CancellationToken,
}

impl BatchScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            pipeline: AnalysisPipeline::with_config(config.analysis.clone()),
            config: config.clone(),
            genre_hint: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Apply one genre hint to every file in the scan
    pub fn with_genre_hint<S: Into<String>>(mut self, genre: S) -> Self {
        self.genre_hint = Some(genre.into());
        self
    }

    /// Token that stops the scan; files not yet finished report `Cancelled`
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Decode and analyze every path, returning one report per path in input order.
    ///
    /// Only an invalid configuration fails the scan as a whole.
    pub async fn scan(&self, paths: Vec<PathBuf>) -> Result<Vec<TrackReport>> {
        self.scan_with_progress(paths, |_| {}).await
    }

    /// Like [`scan`](Self::scan), calling `on_report` as each file finishes, in completion order
    pub async fn scan_with_progress<F>(&self, paths: Vec<PathBuf>, mut on_report: F) -> Result<Vec<TrackReport>>
    where
        F: FnMut(&TrackReport),
    {
        self.config.validate()?;
        let BatchConfig { workers: worker_count, queue_capacity } = self.config.batch.clone();

        let total = paths.len();
        info!(
            "Scanning {} files with {} workers (queue capacity {})",
            total, worker_count, queue_capacity
        );

        let (job_tx, job_rx) = mpsc::channel::<(usize, PathBuf)>(queue_capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (report_tx, mut report_rx) = mpsc::channel::<(usize, TrackReport)>(queue_capacity);

        let mut workers = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let jobs = Arc::clone(&job_rx);
            let reports = report_tx.clone();
            let pipeline = self.pipeline.clone();
            let decode = self.config.decode.clone();
            let genre_hint = self.genre_hint.clone();
            let cancel = self.cancel.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let job = jobs.lock().await.recv().await;
                    let Some((index, path)) = job else {
                        break;
                    };
                    debug!(worker, index, path = %path.display(), "picked up file");

                    let outcome = analyze_file(
                        pipeline.clone(),
                        decode.clone(),
                        path.clone(),
                        genre_hint.clone(),
                        cancel.clone(),
                    )
                    .await;

                    if reports.send((index, TrackReport { path, outcome })).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(report_tx);

        let producer = tokio::spawn(async move {
            for job in paths.into_iter().enumerate() {
                if job_tx.send(job).await.is_err() {
                    break;
                }
            }
        });

        let mut collected: Vec<(usize, TrackReport)> = Vec::with_capacity(total);
        while let Some((index, report)) = report_rx.recv().await {
            match &report.outcome {
                Ok(result) => info!(
                    "[{}/{}] {}: {} BPM, {} ({})",
                    collected.len() + 1,
                    total,
                    report.path.display(),
                    result.bpm,
                    result.key,
                    result.camelot_key
                ),
                Err(e) => warn!(
                    "[{}/{}] {} failed: {}",
                    collected.len() + 1,
                    total,
                    report.path.display(),
                    e.user_message()
                ),
            }
            on_report(&report);
            collected.push((index, report));
        }

        producer
            .await
            .map_err(|e| AnalyzerError::generic(format!("Scan producer failed: {}", e)))?;
        for worker in workers {
            worker
                .await
                .map_err(|e| AnalyzerError::generic(format!("Scan worker failed: {}", e)))?;
        }

        collected.sort_by_key(|(index, _)| *index);
        let reports: Vec<TrackReport> = collected.into_iter().map(|(_, report)| report).collect();

        let analyzed = reports.iter().filter(|r| r.is_ok()).count();
        info!("Scan complete: {} analyzed, {} failed", analyzed, reports.len() - analyzed);

        Ok(reports)
    }
}

async fn analyze_file(
    pipeline: AnalysisPipeline,
    decode: DecodeConfig,
    path: PathBuf,
    genre_hint: Option<String>,
    cancel: CancellationToken,
) -> Result<AnalysisResult> {
    cancel.check()?;

    tokio::task::spawn_blocking(move || {
        let buffer = AudioLoader::load(&path, &decode)?;
        cancel.check()?;
        pipeline.analyze_with_cancel(&buffer, genre_hint.as_deref(), &cancel)
    })
    .await
    .map_err(|e| AnalyzerError::generic(format!("Analysis task failed: {}", e)))?
}

/// One line of the JSON report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializable summary of a whole scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// RFC 3339 timestamp of when the report was built
    pub generated_at: String,
    pub analyzed: usize,
    pub failed: usize,
    pub tracks: Vec<ReportEntry>,
}

impl ScanReport {
    pub fn from_reports(reports: &[TrackReport]) -> Self {
        let tracks: Vec<ReportEntry> = reports
            .iter()
            .map(|report| {
                let path = report.path.display().to_string();
                match &report.outcome {
                    Ok(result) => ReportEntry {
                        path,
                        analysis: Some(result.clone()),
                        error: None,
                    },
                    Err(e) => ReportEntry {
                        path,
                        analysis: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect();

        let analyzed = tracks.iter().filter(|t| t.analysis.is_some()).count();
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            analyzed,
            failed: tracks.len() - analyzed,
            tracks,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AnalyzerError::generic(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
