use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::types::SampleBuffer;
use crate::config::DecodeConfig;
use crate::error::DecodeError;

/// Input frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 4096;

type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Decodes audio files into mono [`SampleBuffer`]s at the working sample rate.
///
/// This is the decoder boundary: everything past it sees already downmixed,
/// normalized PCM.
pub struct AudioLoader;

impl AudioLoader {
    /// Load an audio file, downmix to mono and resample per `config`
    pub fn load<P: AsRef<Path>>(path: P, config: &DecodeConfig) -> DecodeResult<SampleBuffer> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        let (mono, sample_rate) = match extension.as_str() {
            "wav" => Self::load_wav(path, config.max_duration_secs)?,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" | "aiff" | "aif" => {
                Self::load_with_symphonia(path, config.max_duration_secs)?
            }
            _ => return Err(DecodeError::UnsupportedFormat { format: extension }),
        };

        let (samples, sample_rate) = match config.target_sample_rate {
            Some(target) if target != sample_rate => {
                tracing::debug!(from = sample_rate, to = target, "resampling decoded audio");
                (resample(&mono, sample_rate, target, path)?, target)
            }
            _ => (mono, sample_rate),
        };

        tracing::debug!(
            path = %path.display(),
            samples = samples.len(),
            sample_rate,
            "decoded audio"
        );

        SampleBuffer::new(samples, sample_rate).map_err(|e| DecodeError::DecodeFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load WAV files using the hound crate (most reliable for WAV)
    fn load_wav(path: &Path, max_duration_secs: Option<f32>) -> DecodeResult<(Vec<f32>, u32)> {
        let reader = hound::WavReader::open(path)
            .map_err(|_| DecodeError::OpenFailed {
                path: path.display().to_string()
            })?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;
        let frame_limit = frame_limit(max_duration_secs, spec.sample_rate);

        let decode_failed = |e: hound::Error| DecodeError::DecodeFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .take(frame_limit.saturating_mul(channels))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_failed)?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .take(frame_limit.saturating_mul(channels))
                    .map(|sample| sample.map(|s| Self::int_to_float(s, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(decode_failed)?
            }
        };

        Ok((downmix(&interleaved, channels), spec.sample_rate))
    }

    /// Load various formats using Symphonia
    fn load_with_symphonia(path: &Path, max_duration_secs: Option<f32>) -> DecodeResult<(Vec<f32>, u32)> {
        let file = File::open(path)
            .map_err(|_| DecodeError::OpenFailed {
                path: path.display().to_string()
            })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| DecodeError::DecodeFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoAudioTrack {
                path: path.display().to_string()
            })?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate
            .ok_or_else(|| DecodeError::DecodeFailed {
                path: path.display().to_string(),
                reason: "no sample rate in track".to_string(),
            })?;

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &dec_opts)
            .map_err(|e| DecodeError::DecodeFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let frame_limit = frame_limit(max_duration_secs, sample_rate);
        let mut mono = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break, // End of stream
                Err(e) => {
                    return Err(DecodeError::DecodeFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })
                }
            };

            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut interleaved = InterleavedBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    interleaved.copy_interleaved_ref(decoded);
                    mono.extend(downmix(interleaved.samples(), spec.channels.count()));
                }
                Err(SymphoniaError::DecodeError(reason)) => {
                    // Corrupt frames are skipped; the stream usually recovers
                    tracing::warn!(path = %path.display(), reason, "skipping undecodable packet");
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => {
                    return Err(DecodeError::DecodeFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })
                }
            }

            if mono.len() >= frame_limit {
                mono.truncate(frame_limit);
                break;
            }
        }

        Ok((mono, sample_rate))
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        let full_scale = match bit_depth {
            1..=32 => (1u64 << (bit_depth - 1)) as f32,
            _ => 32768.0, // Default to 16-bit
        };
        sample as f32 / full_scale
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac" | "aiff" | "aif"
        )
    }
}

fn frame_limit(max_duration_secs: Option<f32>, sample_rate: u32) -> usize {
    max_duration_secs
        .map(|secs| (secs * sample_rate as f32) as usize)
        .unwrap_or(usize::MAX)
}

/// Average interleaved channels into one
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Band-limited sinc resampling, trimmed to `len * to / from` frames with the
/// filter delay removed
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, path: &Path) -> DecodeResult<Vec<f32>> {
    if samples.is_empty() || from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let resample_failed = |reason: String| DecodeError::DecodeFailed {
        path: path.display().to_string(),
        reason,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| resample_failed(format!("failed to create resampler: {e}")))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| resample_failed(format!("resampling failed: {e}")))?;
        output.extend_from_slice(&frames[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let frames = resampler
            .process_partial(Some(&[remainder]), None)
            .map_err(|e| resample_failed(format!("resampling failed: {e}")))?;
        output.extend_from_slice(&frames[0]);
    }

    // flush the filter tail
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| resample_failed(format!("resampling failed: {e}")))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}
