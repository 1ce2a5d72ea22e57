//! Clip sample-rate conversion
//!
//! Decoded clips are converted once, at load time, to the mixer rate. The
//! clip is fed to rubato in fixed chunks; the resampler's delay is trimmed
//! from the front and the output is cut to the exact converted length, so a
//! clip keeps its duration to within one frame.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::error::{Error, Result};

/// Frames handed to rubato per call
const CHUNK_FRAMES: usize = 4096;

/// Convert interleaved stereo `samples` from `from_rate` to `to_rate`
///
/// Samples already at the target rate are returned unchanged.
pub fn resample_stereo(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Decode(format!(
            "Cannot resample from {}Hz to {}Hz",
            from_rate, to_rate
        )));
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let [left, right] = split_channels(&samples);
    let input_frames = left.len();
    let expected_frames = (input_frames as f64 * ratio).round() as usize;

    let mut resampler = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, CHUNK_FRAMES, 2)
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;
    let delay = resampler.output_delay();

    let failed = |e: rubato::ResampleError| Error::Decode(format!("Resampling failed: {}", e));
    let mut out: [Vec<f32>; 2] = [
        Vec::with_capacity(expected_frames + delay),
        Vec::with_capacity(expected_frames + delay),
    ];
    let mut pos = 0;
    while pos + CHUNK_FRAMES <= input_frames {
        let chunk = [&left[pos..pos + CHUNK_FRAMES], &right[pos..pos + CHUNK_FRAMES]];
        append(&mut out, resampler.process(&chunk[..], None).map_err(failed)?);
        pos += CHUNK_FRAMES;
    }
    if pos < input_frames {
        let tail = [&left[pos..], &right[pos..]];
        append(&mut out, resampler.process_partial(Some(&tail[..]), None).map_err(failed)?);
    }
    // Flush until the delayed tail is out
    while out[0].len() < expected_frames + delay {
        let chunk = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(failed)?;
        if chunk.first().map_or(true, |c| c.is_empty()) {
            break;
        }
        append(&mut out, chunk);
    }

    let [left, right] = out;
    let end = (delay + expected_frames).min(left.len());
    let start = delay.min(end);
    debug!(
        "Resampled {} frames at {}Hz to {} frames at {}Hz",
        input_frames,
        from_rate,
        end - start,
        to_rate
    );
    Ok(join_channels(&left[start..end], &right[start..end]))
}

fn append(out: &mut [Vec<f32>; 2], chunk: Vec<Vec<f32>>) {
    for (dst, src) in out.iter_mut().zip(chunk) {
        dst.extend_from_slice(&src);
    }
}

fn split_channels(samples: &[f32]) -> [Vec<f32>; 2] {
    let frames = samples.len() / 2;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    [left, right]
}

fn join_channels(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter().zip(right).flat_map(|(&l, &r)| [l, r]).collect()
}
