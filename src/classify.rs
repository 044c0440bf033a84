/*
 *  classify.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Music or not. The shipped gate is loudness plus spectral flatness:
 *  music is loud enough and tonal, noise and hiss are flat.
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

use log::debug;
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::audio::Waveform;
use crate::config::ClassifierConfig;
use crate::error::InferenceError;

const FRAME: usize = 1024;
const POWER_FLOOR: f32 = 1e-12;

pub trait MusicClassifier {
    fn classify(&mut self, waveform: &Waveform) -> Result<bool, InferenceError>;
}

pub struct SpectralGate {
    floor_dbfs: f32,
    max_flatness: f32,
    fft: Arc<dyn rustfft::Fft<f32> + Send + Sync>,
    window: Vec<f32>,
    buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralGate {
    pub fn new(floor_dbfs: f32, max_flatness: f32) -> Self {
        let mut planner = rustfft::FftPlanner::<f32>::new();
        let fft: Arc<dyn rustfft::Fft<f32> + Send + Sync> = planner.plan_fft_forward(FRAME);

        // Hann
        let window = (0..FRAME)
            .map(|i| 0.5f32 * (1.0 - (2.0 * std::f32::consts::PI * (i as f32) / (FRAME as f32)).cos()))
            .collect();

        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            floor_dbfs,
            max_flatness,
            fft,
            window,
            buf: vec![Complex::new(0.0, 0.0); FRAME],
            scratch,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.floor_dbfs.unwrap_or(-45.0), config.max_flatness.unwrap_or(0.45))
    }

    /// Geometric over arithmetic mean of one frame's power spectrum, DC excluded.
    fn frame_flatness(&mut self, frame: &[f32]) -> f32 {
        for (i, c) in self.buf.iter_mut().enumerate() {
            let s = frame.get(i).copied().unwrap_or(0.0);
            *c = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process_with_scratch(&mut self.buf, &mut self.scratch);

        let half = FRAME / 2;
        let (mut log_sum, mut sum) = (0.0f64, 0.0f64);
        for c in &self.buf[1..half] {
            let p = (c.norm_sqr()).max(POWER_FLOOR) as f64;
            log_sum += p.ln();
            sum += p;
        }
        let n = (half - 1) as f64;
        ((log_sum / n).exp() / (sum / n)) as f32
    }

    /// Mean flatness over consecutive frames.
    pub fn flatness(&mut self, samples: &[f32]) -> f32 {
        let mut total = 0.0f32;
        let mut frames = 0usize;
        for frame in samples.chunks(FRAME) {
            total += self.frame_flatness(frame);
            frames += 1;
        }
        if frames == 0 { 1.0 } else { total / frames as f32 }
    }
}

pub fn to_dbfs(level: f32) -> f32 {
    if level <= 0.0 { f32::NEG_INFINITY } else { 20.0 * level.log10() }
}

impl MusicClassifier for SpectralGate {
    fn classify(&mut self, waveform: &Waveform) -> Result<bool, InferenceError> {
        if waveform.is_empty() {
            return Err(InferenceError::EmptyWaveform);
        }

        let level = to_dbfs(waveform.input_peak);
        if level < self.floor_dbfs {
            debug!("input peak {:.1} dBFS under floor {:.1}", level, self.floor_dbfs);
            return Ok(false);
        }

        let flatness = self.flatness(&waveform.samples);
        if !flatness.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        debug!("input peak {:.1} dBFS, flatness {:.3}", level, flatness);
        Ok(flatness <= self.max_flatness)
    }
}
