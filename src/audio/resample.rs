/*
 *  audio/resample.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Whole-buffer rate conversion for finished captures
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use rubato::{FftFixedInOut, Resampler};

use crate::error::DeviceError;

const BLOCK_SIZE: usize = 1024;

/// Convert a mono buffer from `from_hz` to `to_hz`.
///
/// The output is exactly `input.len() * to_hz / from_hz` samples long, with
/// the resampler's group delay trimmed from the front.
pub fn resample(input: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>, DeviceError> {
    if from_hz == to_hz || input.is_empty() {
        return Ok(input.to_vec());
    }
    if from_hz == 0 || to_hz == 0 {
        return Err(DeviceError::Resample(format!("invalid rate {from_hz} -> {to_hz}")));
    }

    let mut resampler = FftFixedInOut::<f32>::new(from_hz as usize, to_hz as usize, BLOCK_SIZE, 1)
        .map_err(|e| DeviceError::Resample(e.to_string()))?;

    let wanted = (input.len() as u64 * to_hz as u64 / from_hz as u64) as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(wanted + delay + BLOCK_SIZE);
    let mut block = vec![0.0f32; resampler.input_frames_next()];
    let mut pos = 0;

    // keep feeding (zero padded past the end) until the delayed tail is out
    while out.len() < wanted + delay {
        let need = resampler.input_frames_next();
        block.resize(need, 0.0);
        let end = (pos + need).min(input.len());
        let take = end.saturating_sub(pos);
        block[..take].copy_from_slice(&input[pos.min(input.len())..end]);
        block[take..].fill(0.0);
        pos += need;

        let chunk = resampler
            .process(&[&block], None)
            .map_err(|e| DeviceError::Resample(e.to_string()))?;
        if let Some(channel) = chunk.into_iter().next() {
            out.extend(channel);
        }
    }

    out.drain(..delay.min(out.len()));
    out.truncate(wanted);
    Ok(out)
}
