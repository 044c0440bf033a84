/*
 *  audio/capture.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Microphone capture through cpal. The stream lives on a blocking worker
 *  for the length of one sample window.
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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use log::{debug, error, info};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::{condition, peak, resample::resample, AudioSampler, Waveform};
use crate::config::AudioConfig;
use crate::error::DeviceError;

/// Extra time allowed past the window before a stream counts as stalled.
const STALL_SLACK: Duration = Duration::from_secs(2);

pub struct CpalSampler {
    device_name: String,
    target_rate: u32,
    gain: f32,
}

impl CpalSampler {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            device_name: config.device_name.clone().unwrap_or_else(|| "USB".to_string()),
            target_rate: config.target_rate_hz.unwrap_or(16_000),
            gain: config.gain.unwrap_or(3.0),
        }
    }
}

impl AudioSampler for CpalSampler {
    async fn capture(&mut self, duration: Duration) -> Result<Waveform, DeviceError> {
        let device_name = self.device_name.clone();
        let (target_rate, gain) = (self.target_rate, self.gain);

        tokio::task::spawn_blocking(move || {
            let (raw, rate) = record(&device_name, duration)?;
            let input_peak = peak(&raw);
            let mut samples = resample(&raw, rate, target_rate)?;
            condition(&mut samples, gain);
            debug!("captured {} samples @ {}Hz, input peak {:.4}", samples.len(), target_rate, input_peak);
            Ok::<_, DeviceError>(Waveform { samples, sample_rate: target_rate, input_peak })
        })
        .await
        .map_err(|e| DeviceError::Worker(e.to_string()))?
    }
}

/// Prefer the first input whose name contains `wanted`, else the host default.
fn select_device(host: &cpal::Host, wanted: &str) -> Result<cpal::Device, DeviceError> {
    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            if name.contains(wanted) {
                debug!("using input device '{}'", name);
                return Ok(device);
            }
        }
    }
    let device = host
        .default_input_device()
        .ok_or_else(|| DeviceError::NoDevice(wanted.to_string()))?;
    info!(
        "no input matching '{}', falling back to default '{}'",
        wanted,
        device.name().unwrap_or_default()
    );
    Ok(device)
}

/// Record `duration` of mono audio at the device's native rate.
fn record(wanted: &str, duration: Duration) -> Result<(Vec<f32>, u32), DeviceError> {
    let host = cpal::default_host();
    let device = select_device(&host, wanted)?;
    let supported = device.default_input_config()?;
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let rate = config.sample_rate.0;
    let wanted_len = (rate as f64 * duration.as_secs_f64()) as usize;

    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let stream = match format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, tx)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config, tx)?,
        other => return Err(DeviceError::SampleFormat(format!("{other:?}"))),
    };
    stream.play()?;

    let mut samples = Vec::with_capacity(wanted_len);
    let deadline = Instant::now() + duration + STALL_SLACK;
    while samples.len() < wanted_len {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(chunk) => samples.extend(chunk),
            Err(_) => {
                return Err(DeviceError::Stalled { got: samples.len(), wanted: wanted_len });
            }
        }
    }
    drop(stream);

    samples.truncate(wanted_len);
    Ok((samples, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<Vec<f32>>,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono: Vec<f32> = data
                .chunks(channels)
                .map(|frame| frame.iter().map(|s| f32::from_sample(*s)).sum::<f32>() / channels as f32)
                .collect();
            // receiver gone means the window closed
            let _ = tx.send(mono);
        },
        |err| error!("audio input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
