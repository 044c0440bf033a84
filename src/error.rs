/*
 *  error.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Failure taxonomy for the collaborators driven by the listening loop
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

use std::time::Duration;
use thiserror::Error;

use crate::display::error::DisplayError;

/// Audio hardware is unavailable or the capture failed. The tick is skipped.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no audio input device available (wanted '{0}')")]
    NoDevice(String),
    #[error("failed to read input devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("failed to read device config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format: {0}")]
    SampleFormat(String),
    #[error("input stream stalled after {got} of {wanted} samples")]
    Stalled { got: usize, wanted: usize },
    #[error("resampler error: {0}")]
    Resample(String),
    #[error("capture worker failed: {0}")]
    Worker(String),
}

/// The classifier could not score a waveform. Treated as silence.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("waveform is empty")]
    EmptyWaveform,
    #[error("inference produced a non-finite score")]
    NonFinite,
    #[error("inference failed: {0}")]
    Failed(String),
}

/// Network failure talking to a remote service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("missing data: {0}")]
    MissingData(String),
}

/// Identification failed. Either kind means "no identity" for the tick.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("recognition error: {0}")]
    Recognition(String),
    #[error("recognition network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for IdentifyError {
    fn from(err: reqwest::Error) -> Self {
        IdentifyError::Network(NetworkError::Http(err))
    }
}

/// Display I/O failed. Logged only; never retried within a tick.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("display error: {0}")]
    Display(#[from] DisplayError),
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("composition failed: {0}")]
    Compose(String),
}
