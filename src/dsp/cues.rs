//! Cue in/out and beat-snapped hot cues from the amplitude envelope.

use crate::audio::{CueLabel, HotCue, SampleBuffer};
use crate::cancel::CancellationToken;
use crate::config::CueConfig;
use crate::dsp::filters::{mean, windowed_mean_abs};
use crate::error::Result;

pub const WINDOW_SECS: f32 = 0.5;
pub const PRESENCE_RATIO: f32 = 0.3;
pub const RISE_RATIO: f32 = 1.5;
pub const AVERAGE_RATIO: f32 = 1.2;
pub const EDGE_MARGIN_SECS: f32 = 8.0;
pub const MAX_HOT_CUES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct CuePoints {
    pub cue_in: f32,
    pub cue_out: f32,

    /// Ascending by time, at most `max_hot_cues`
    pub hot_cues: Vec<HotCue>,
}

/// Find where the track starts and ends playing and where its energy jumps.
///
/// `bpm` sets the beat grid hot cues are snapped to.
pub fn find_cue_points(
    buffer: &SampleBuffer,
    bpm: u32,
    config: &CueConfig,
    cancel: &CancellationToken,
) -> Result<CuePoints> {
    let duration = buffer.duration_secs();
    let window = buffer.samples_for(config.window_secs);
    let energies = windowed_mean_abs(buffer.samples(), window, window);
    cancel.check()?;

    let window_start = |index: usize| buffer.time_for_sample(index * window);
    let average = mean(&energies);

    let presence = average * config.presence_ratio;
    let first = energies.iter().position(|&e| e > presence);
    let last = energies.iter().rposition(|&e| e > presence);
    let (cue_in, cue_out) = match (first, last) {
        (Some(first), Some(last)) => (window_start(first), window_start(last)),
        _ => (0.0, duration),
    };

    let mut hot_cues: Vec<HotCue> = Vec::new();
    if average > 0.0 {
        let beat = if bpm > 0 { 60.0 / bpm as f32 } else { 0.0 };
        let earliest = cue_in + config.edge_margin_secs;
        let latest = cue_out - config.edge_margin_secs;

        for i in 1..energies.len() {
            if hot_cues.len() >= config.max_hot_cues {
                break;
            }
            let rising = energies[i] >= config.rise_ratio * energies[i - 1]
                && energies[i] >= config.average_ratio * average;
            if !rising {
                continue;
            }

            let time = snap_to_beat(window_start(i), beat);
            let after_last = hot_cues.last().map_or(true, |cue| time > cue.time);
            if time >= earliest && time <= latest && after_last {
                hot_cues.push(HotCue {
                    time,
                    label: CueLabel::for_position(time / duration),
                });
            }
        }
    }

    tracing::debug!(
        windows = energies.len(),
        cue_in,
        cue_out,
        hot_cues = hot_cues.len(),
        "cue points found"
    );

    Ok(CuePoints {
        cue_in,
        cue_out,
        hot_cues,
    })
}

/// Nearest multiple of `beat`; a zero beat leaves the time as is
fn snap_to_beat(time: f32, beat: f32) -> f32 {
    if beat <= 0.0 {
        return time;
    }
    (time / beat).round() * beat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_signals;

    const RATE: u32 = 8_000;

    fn find(buffer: &SampleBuffer, bpm: u32) -> CuePoints {
        find_cue_points(buffer, bpm, &CueConfig::default(), &CancellationToken::new()).unwrap()
    }

    /// Steady 0.1 bed with one-second 0.5 bursts every 2 s from 10 s: twenty candidates
    fn twenty_bursts() -> SampleBuffer {
        let mut samples = test_signals::constant_level(0.1, 60.0, RATE);
        for k in 0..20 {
            let start = (10 + 2 * k) * RATE as usize;
            for (offset, sample) in samples[start..start + RATE as usize].iter_mut().enumerate() {
                *sample = if offset % 2 == 0 { 0.5 } else { -0.5 };
            }
        }
        SampleBuffer::new(samples, RATE).unwrap()
    }

    #[test]
    fn test_silence_spans_whole_buffer() {
        let buffer = test_signals::silence(30.0, RATE);
        let cues = find(&buffer, 120);
        assert_eq!(cues.cue_in, 0.0);
        assert_eq!(cues.cue_out, 30.0);
        assert!(cues.hot_cues.is_empty());
    }

    #[test]
    fn test_quiet_edges_are_trimmed() {
        let mut samples = vec![0.0; 10 * RATE as usize];
        samples.extend(test_signals::constant_level(0.4, 30.0, RATE));
        samples.extend(vec![0.0; 10 * RATE as usize]);
        let buffer = SampleBuffer::new(samples, RATE).unwrap();

        let cues = find(&buffer, 120);
        assert_eq!(cues.cue_in, 10.0);
        assert_eq!(cues.cue_out, 39.5);
    }

    #[test]
    fn test_twenty_candidates_keep_earliest_eight() {
        let cues = find(&twenty_bursts(), 120);

        assert_eq!(cues.cue_in, 0.0);
        assert_eq!(cues.cue_out, 59.5);

        let times: Vec<f32> = cues.hot_cues.iter().map(|cue| cue.time).collect();
        assert_eq!(times, vec![10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0]);
        assert_eq!(cues.hot_cues[0].label, CueLabel::Intro);
        assert_eq!(cues.hot_cues[7].label, CueLabel::Verse);
    }

    #[test]
    fn test_configured_cap() {
        let config = CueConfig {
            max_hot_cues: 3,
            ..CueConfig::default()
        };
        let cues = find_cue_points(&twenty_bursts(), 120, &config, &CancellationToken::new()).unwrap();
        assert_eq!(cues.hot_cues.len(), 3);
    }

    #[test]
    fn test_hot_cues_respect_edge_margin() {
        let cues = find(&twenty_bursts(), 120);
        for cue in &cues.hot_cues {
            assert!(cue.time >= cues.cue_in + EDGE_MARGIN_SECS);
            assert!(cue.time <= cues.cue_out - EDGE_MARGIN_SECS);
        }
        assert!(cues.hot_cues.windows(2).all(|pair| pair[0].time < pair[1].time));
    }

    #[test]
    fn test_snap_to_beat() {
        assert_eq!(snap_to_beat(10.2, 0.5), 10.0);
        assert_eq!(snap_to_beat(10.3, 0.5), 10.5);
        assert!((snap_to_beat(10.0, 1.2) - 9.6).abs() < 1e-5);
        assert_eq!(snap_to_beat(7.3, 0.0), 7.3);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = find_cue_points(&twenty_bursts(), 120, &CueConfig::default(), &cancel);
        assert!(matches!(result, Err(crate::AnalyzerError::Cancelled)));
    }
}
