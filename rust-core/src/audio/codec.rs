//! File decoding, WAV export and sample-rate conversion

use super::source::AudioBuffer;
use crate::error::{EqError, Result};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Input frames per resampler call
const RESAMPLE_CHUNK: usize = 1024;

/// Decode an audio file (WAV, MP3, OGG/Vorbis, FLAC) to mono
///
/// Multichannel audio is downmixed by averaging the channels.
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EqError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EqError::UnsupportedFormat(format!("{}: no audio track", path.display())))?;
        (track.id, track.codec_params.clone())
    };

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| EqError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| EqError::UnsupportedFormat(e.to_string()))?;

    let mut mono = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(EqError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping corrupt packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(EqError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let needed = decoded.capacity() * channels;

        if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            mono.extend(
                buf.samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64),
            );
        }
    }

    log::debug!(
        "Decoded {} ({} samples at {} Hz)",
        path.display(),
        mono.len(),
        sample_rate
    );

    AudioBuffer::new(mono, sample_rate)
}

/// Write mono samples as 16-bit PCM WAV, clipping to [-1, 1]
pub fn encode(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(hound_error)?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16;
        writer.write_sample(value).map_err(hound_error)?;
    }
    writer.finalize().map_err(hound_error)?;

    Ok(())
}

fn hound_error(err: hound::Error) -> EqError {
    match err {
        hound::Error::IoError(e) => EqError::Io(e),
        other => EqError::Encode(other.to_string()),
    }
}

/// Convert `buffer` to `target_rate` with band-limited sinc interpolation
///
/// The result is aligned with the input (resampler delay removed) and has
/// `round(len * target_rate / source_rate)` samples.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if target_rate == 0 {
        return Err(EqError::InvalidConfig("sample rate must be positive".into()));
    }
    if buffer.sample_rate() == target_rate || buffer.is_empty() {
        return AudioBuffer::new(buffer.samples().to_vec(), target_rate);
    }

    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let delay = ((params.sinc_len / 2) as f64 * ratio).round() as usize;

    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| EqError::Resample(e.to_string()))?;

    let input = buffer.samples();
    let expected_len = (input.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f64> = Vec::with_capacity(expected_len + delay + RESAMPLE_CHUNK);

    let mut chunks = input.chunks_exact(RESAMPLE_CHUNK);
    for chunk in chunks.by_ref() {
        let out = resampler
            .process(&[chunk][..], None)
            .map_err(|e| EqError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let out = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(|e| EqError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the interpolator's history
    while output.len() < expected_len + delay {
        let out = resampler
            .process_partial(None::<&[&[f64]]>, None)
            .map_err(|e| EqError::Resample(e.to_string()))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    let mut samples: Vec<f64> = output.into_iter().skip(delay).take(expected_len).collect();
    samples.resize(expected_len, 0.0);

    log::debug!(
        "Resampled {} -> {} Hz ({} -> {} samples)",
        buffer.sample_rate(),
        target_rate,
        input.len(),
        samples.len()
    );

    AudioBuffer::new(samples, target_rate)
}
