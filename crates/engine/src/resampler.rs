// crates/engine/src/resampler.rs

use crate::decoder::DecodedBuffer;
use crate::error::{EngineError, EngineResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

/// Sinc resampler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleQuality {
    Fast,
    #[default]
    Balanced,
    Accurate,
}

impl ResampleQuality {
    fn parameters(self) -> SincInterpolationParameters {
        match self {
            ResampleQuality::Fast => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.9,
                oversampling_factor: 128,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::Blackman,
            },
            ResampleQuality::Balanced => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.95,
                oversampling_factor: 256,
                interpolation: SincInterpolationType::Cubic,
                window: WindowFunction::BlackmanHarris,
            },
            ResampleQuality::Accurate => SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                oversampling_factor: 512,
                interpolation: SincInterpolationType::Quintic,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

/// Converts a whole buffer to `target_rate`.
///
/// Previews are short, so the entire clip is a single rubato chunk followed
/// by one flush of the filter delay.
pub fn resample(
    buffer: &DecodedBuffer,
    target_rate: u32,
    quality: ResampleQuality,
) -> EngineResult<DecodedBuffer> {
    if target_rate == 0 {
        return Err(EngineError::Resample("Target rate is zero".to_string()));
    }
    if buffer.sample_rate() == target_rate {
        return Ok(buffer.clone());
    }

    let channels = buffer.channels() as usize;
    let frames = buffer.frames();

    let ratio = f64::from(target_rate) / f64::from(buffer.sample_rate());
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, quality.parameters(), frames, channels)
            .map_err(|e| EngineError::Resample(e.to_string()))?;

    let mut deinterleaved = vec![Vec::with_capacity(frames); channels];
    for frame in buffer.samples().chunks_exact(channels) {
        for (channel, sample) in deinterleaved.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }

    // The filter lags its input by `output_delay` frames; a zero-filled
    // partial chunk pushes the tail of the clip out.
    let delay = resampler.output_delay();
    let mut resampled = resampler
        .process(&deinterleaved, None)
        .map_err(|e| EngineError::Resample(e.to_string()))?;
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| EngineError::Resample(e.to_string()))?;
    for (channel, rest) in resampled.iter_mut().zip(tail) {
        channel.extend(rest);
    }

    let available = resampled
        .first()
        .map(|c| c.len().saturating_sub(delay))
        .unwrap_or(0);
    let output_frames = ((frames as f64 * ratio).round() as usize).min(available);
    let mut interleaved = Vec::with_capacity(output_frames * channels);
    for frame_idx in delay..delay + output_frames {
        for channel in &resampled {
            interleaved.push(channel[frame_idx]);
        }
    }

    log::debug!(
        "Resampled {} frames at {} Hz to {} frames at {} Hz",
        frames,
        buffer.sample_rate(),
        output_frames,
        target_rate
    );

    DecodedBuffer::new(interleaved, target_rate, buffer.channels())
}
