//! Tempo detection by peak-picking the bass energy envelope.
//!
//! The buffer is low-passed to keep kick and bass content, reduced to an RMS
//! envelope, and the spacing between envelope peaks is turned into BPM.

use crate::audio::SampleBuffer;
use crate::cancel::CancellationToken;
use crate::config::TempoConfig;
use crate::dsp::filters::{low_pass, mean, percentile, windowed_rms};
use crate::error::Result;

pub const LOWPASS_CUTOFF_HZ: f32 = 300.0;
pub const WINDOW_SECS: f32 = 0.1;
pub const PEAK_THRESHOLD: f32 = 1.5;
/// Caps the detectable tempo at 200 BPM
pub const MIN_PEAK_SEPARATION_SECS: f32 = 0.3;
pub const MIN_INTERVAL_SECS: f32 = 0.3;
pub const MAX_INTERVAL_SECS: f32 = 2.0;
pub const AGREEMENT_TOLERANCE: f32 = 0.15;
pub const MAX_CONFIDENCE: f32 = 0.95;

pub const MIN_BPM: u32 = 50;
pub const MAX_BPM: u32 = 180;
pub const FALLBACK_BPM: u32 = 80;
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

const MIN_PEAKS: usize = 3;
const IQR_FENCE: f32 = 1.5;

/// Above this the estimate is assumed to be counting subdivisions
const SUBDIVISION_BPM: f32 = 160.0;
/// Open band checked for double-time detections
const DOUBLE_TIME_BAND: (f32, f32) = (120.0, 140.0);
/// Where a halved double-time value has to land
const HALF_TIME_TARGET: (f32, f32) = (60.0, 80.0);

/// Tempo estimate for one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEstimate {
    /// Final BPM after octave correction and clamping
    pub bpm: u32,

    /// BPM straight from the median interval, before any correction
    pub raw_bpm: f32,

    /// Share of intervals agreeing with the median (0.0-0.95)
    pub confidence: f32,

    /// Number of envelope peaks found
    pub peak_count: usize,
}

impl TempoEstimate {
    fn fallback(peak_count: usize) -> Self {
        Self {
            bpm: FALLBACK_BPM,
            raw_bpm: FALLBACK_BPM as f32,
            confidence: FALLBACK_CONFIDENCE,
            peak_count,
        }
    }

    /// Seconds per beat at the final BPM
    pub fn beat_interval_secs(&self) -> f32 {
        60.0 / self.bpm as f32
    }
}

/// Estimate BPM and confidence.
///
/// Too few envelope peaks, or no plausible interval between them, gives the
/// fixed fallback of 80 BPM at confidence 0.3 instead of an error.
pub fn detect_tempo(
    buffer: &SampleBuffer,
    config: &TempoConfig,
    genre_hint: Option<&str>,
    cancel: &CancellationToken,
) -> Result<TempoEstimate> {
    let sample_rate = buffer.sample_rate();
    let filtered = low_pass(buffer.samples(), config.lowpass_cutoff_hz, sample_rate);
    cancel.check()?;

    let window = buffer.samples_for(config.window_secs);
    let hop = (window / 2).max(1);
    let envelope = windowed_rms(&filtered, window, hop);
    cancel.check()?;

    let hop_secs = hop as f32 / sample_rate as f32;
    let peaks = pick_peaks(&envelope, hop_secs, config);
    if peaks.len() < MIN_PEAKS {
        tracing::debug!(peaks = peaks.len(), "too few tempo peaks, using fallback");
        return Ok(TempoEstimate::fallback(peaks.len()));
    }

    let intervals: Vec<f32> = peaks.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let filtered_intervals = filter_intervals(&intervals, config);
    if filtered_intervals.is_empty() {
        tracing::debug!(intervals = intervals.len(), "no plausible beat intervals, using fallback");
        return Ok(TempoEstimate::fallback(peaks.len()));
    }

    let median = percentile(&filtered_intervals, 50.0);
    let raw_bpm = 60.0 / median;
    let corrected = correct_octave(raw_bpm.round());
    let hinted = genre_hint
        .and_then(preferred_tempo_range)
        .map_or(corrected, |range| fit_to_range(corrected, range));
    let bpm = (hinted.round() as u32).clamp(MIN_BPM, MAX_BPM);

    let agreeing = filtered_intervals
        .iter()
        .filter(|&&interval| (interval - median).abs() <= config.agreement_tolerance * median)
        .count();
    let confidence = (agreeing as f32 / filtered_intervals.len() as f32).min(config.max_confidence);

    tracing::debug!(
        peaks = peaks.len(),
        intervals = filtered_intervals.len(),
        raw_bpm,
        bpm,
        confidence,
        "tempo estimated"
    );

    Ok(TempoEstimate {
        bpm,
        raw_bpm,
        confidence,
        peak_count: peaks.len(),
    })
}

/// Times (seconds) of envelope maxima above the mean-relative threshold,
/// at least `min_peak_separation_secs` apart
fn pick_peaks(envelope: &[f32], hop_secs: f32, config: &TempoConfig) -> Vec<f32> {
    let threshold = mean(envelope) * config.peak_threshold;
    let mut peaks: Vec<f32> = Vec::new();

    for i in 1..envelope.len().saturating_sub(1) {
        let energy = envelope[i];
        // strict on the left, lenient on the right: a plateau yields one peak
        let is_local_max = energy > envelope[i - 1] && energy >= envelope[i + 1];
        if !is_local_max || energy <= threshold {
            continue;
        }

        let time = i as f32 * hop_secs;
        if let Some(&last) = peaks.last() {
            if time - last < config.min_peak_separation_secs {
                continue;
            }
        }
        peaks.push(time);
    }

    peaks
}

/// Drop IQR outliers and musically implausible intervals
fn filter_intervals(intervals: &[f32], config: &TempoConfig) -> Vec<f32> {
    let q1 = percentile(intervals, 25.0);
    let q3 = percentile(intervals, 75.0);
    let iqr = q3 - q1;
    let low = (q1 - IQR_FENCE * iqr).max(config.min_interval_secs);
    let high = (q3 + IQR_FENCE * iqr).min(config.max_interval_secs);

    intervals
        .iter()
        .copied()
        .filter(|&interval| interval >= low && interval <= high)
        .collect()
}

/// Undo the two common octave errors of envelope peak-picking
fn correct_octave(bpm: f32) -> f32 {
    if bpm > SUBDIVISION_BPM {
        return bpm / 2.0;
    }

    let (band_low, band_high) = DOUBLE_TIME_BAND;
    let (target_low, target_high) = HALF_TIME_TARGET;
    let half = bpm / 2.0;
    if bpm > band_low && bpm < band_high && (target_low..=target_high).contains(&half) {
        return half;
    }

    bpm
}

/// Typical tempo range for a genre, if the genre is recognised
pub fn preferred_tempo_range(genre: &str) -> Option<(f32, f32)> {
    let genre = genre.trim().to_lowercase();
    let range = match genre.as_str() {
        "drum and bass" | "drum & bass" | "drum n bass" | "dnb" | "jungle" | "neurofunk" => (160.0, 180.0),
        "house" | "deep house" | "tech house" | "progressive house" | "techno" | "trance"
        | "edm" | "disco" | "nu disco" | "electro" => (115.0, 140.0),
        "dubstep" | "grime" => (135.0, 150.0),
        "hip hop" | "hip-hop" | "rap" | "trap" | "r&b" | "rnb" => (70.0, 100.0),
        "reggae" | "dub" | "downtempo" | "trip hop" | "trip-hop" | "lofi" | "lo-fi" => (60.0, 100.0),
        "reggaeton" | "dancehall" => (85.0, 105.0),
        _ => return None,
    };
    Some(range)
}

/// Move `bpm` by one octave if that lands it inside `range`
fn fit_to_range(bpm: f32, (low, high): (f32, f32)) -> f32 {
    let inside = |value: f32| value >= low && value <= high;
    if inside(bpm) {
        bpm
    } else if inside(bpm * 2.0) {
        bpm * 2.0
    } else if inside(bpm / 2.0) {
        bpm / 2.0
    } else {
        bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_signals;

    fn detect(buffer: &SampleBuffer, hint: Option<&str>) -> TempoEstimate {
        detect_tempo(buffer, &TempoConfig::default(), hint, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_impulse_train_at_120_bpm() {
        let buffer = test_signals::impulse_train(0.5, 0.25, 10.0, 22_050);
        let tempo = detect(&buffer, None);

        let near = |target: f32| (tempo.raw_bpm - target).abs() < 2.0;
        assert!(near(120.0) || near(60.0) || near(240.0), "raw bpm {}", tempo.raw_bpm);
        assert_eq!(tempo.bpm, 120);
        assert!(tempo.confidence > 0.7);
        assert!(tempo.confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn test_impulse_train_at_other_sample_rates() {
        for sample_rate in [8_000, 44_100, 48_000] {
            let buffer = test_signals::impulse_train(0.5, 0.25, 10.0, sample_rate);
            let tempo = detect(&buffer, None);
            assert_eq!(tempo.bpm, 120, "sample rate {sample_rate}");
        }
    }

    #[test]
    fn test_silence_falls_back() {
        let buffer = test_signals::silence(5.0, 22_050);
        let tempo = detect(&buffer, None);
        assert_eq!(tempo.bpm, FALLBACK_BPM);
        assert_eq!(tempo.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(tempo.peak_count, 0);
    }

    #[test]
    fn test_two_clicks_fall_back() {
        let buffer = test_signals::impulse_train(2.0, 0.5, 4.0, 22_050);
        let tempo = detect(&buffer, None);
        assert_eq!(tempo.bpm, FALLBACK_BPM);
    }

    #[test]
    fn test_octave_correction_rules() {
        assert_eq!(correct_octave(170.0), 85.0);
        assert_eq!(correct_octave(128.0), 64.0);
        assert_eq!(correct_octave(120.0), 120.0);
        assert_eq!(correct_octave(140.0), 140.0);
        assert_eq!(correct_octave(100.0), 100.0);
    }

    #[test]
    fn test_genre_hint_restores_house_tempo() {
        assert_eq!(fit_to_range(64.0, (115.0, 140.0)), 128.0);
        assert_eq!(fit_to_range(87.0, (160.0, 180.0)), 174.0);
        assert_eq!(fit_to_range(90.0, (70.0, 100.0)), 90.0);
        assert!(preferred_tempo_range("  House ").is_some());
        assert!(preferred_tempo_range("polka").is_none());
    }

    #[test]
    fn test_house_click_track_with_hint() {
        // ~133 BPM: the double-time rule halves it unless the genre says otherwise
        let buffer = test_signals::impulse_train(0.45, 0.25, 12.0, 44_100);

        let plain = detect(&buffer, None);
        let hinted = detect(&buffer, Some("house"));
        assert_eq!(plain.bpm, 67);
        assert_eq!(hinted.bpm, 133);
    }

    #[test]
    fn test_interval_filter_removes_outliers() {
        let config = TempoConfig::default();
        let intervals = [0.5, 0.5, 0.51, 0.49, 0.5, 1.9, 0.1];
        let filtered = filter_intervals(&intervals, &config);
        assert_eq!(filtered, vec![0.5, 0.5, 0.51, 0.49, 0.5]);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let buffer = test_signals::impulse_train(0.5, 0.25, 10.0, 22_050);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = detect_tempo(&buffer, &TempoConfig::default(), None, &cancel);
        assert!(matches!(result, Err(crate::AnalyzerError::Cancelled)));
    }
}
