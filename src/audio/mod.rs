/*
 *  audio/mod.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-rate mono waveforms and the sampler seam the loop captures through
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

pub mod capture;
pub mod resample;
pub mod wav;

use std::time::Duration;

use crate::error::DeviceError;

pub use capture::CpalSampler;

/// Mono samples in [-1, 1] at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Peak magnitude of the raw capture, before normalisation and gain.
    pub input_peak: f32,
}

impl Waveform {
    /// Wrap already conditioned samples; the input peak is taken from them.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let input_peak = peak(&samples);
        Self { samples, sample_rate, input_peak }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}

/// Source of fixed-duration captures.
#[allow(async_fn_in_trait)]
pub trait AudioSampler {
    async fn capture(&mut self, duration: Duration) -> Result<Waveform, DeviceError>;
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Peak-normalise, apply `gain`, clip to [-1, 1]. Silence stays silent.
pub fn condition(samples: &mut [f32], gain: f32) {
    let p = peak(samples);
    let scale = if p > 0.0 { gain / p } else { 0.0 };
    for s in samples.iter_mut() {
        *s = (*s * scale).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_normalises_then_clips() {
        let mut samples = vec![0.1, -0.05, 0.02];
        condition(&mut samples, 3.0);
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[1], -1.0);
        assert!((samples[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn condition_leaves_silence() {
        let mut samples = vec![0.0; 8];
        condition(&mut samples, 3.0);
        assert!(samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn duration_from_rate() {
        let wf = Waveform::new(vec![0.0; 16_000 * 2], 16_000);
        assert_eq!(wf.duration(), Duration::from_secs(2));
        assert_eq!(wf.rms(), 0.0);
    }
}
