/*
 *  weather.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Current conditions for the idle view, cached with a staleness window.
 *  OpenWeatherMap is the shipped provider.
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

use chrono::{DateTime, Local};
use flate2::read::GzDecoder;
use log::{debug, error, info, warn};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{TempUnits, WeatherConfig};
use crate::error::NetworkError;

const VERSION: &str = concat!("Earshot/v", env!("CARGO_PKG_VERSION"));
const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

pub const UNAVAILABLE_TEMPERATURE: &str = "unavailable";
pub const UNAVAILABLE_SUMMARY: &str = "no weather info";

/// One reading of the current conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: String,
    pub summary: String,
    pub fetched_at: Instant,
    /// Wall clock of the fetch, logged with each reading.
    pub observed: DateTime<Local>,
}

impl WeatherSnapshot {
    pub fn new(temperature: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            temperature: temperature.into(),
            summary: summary.into(),
            fetched_at: Instant::now(),
            observed: Local::now(),
        }
    }

    /// Stand-in used when a fetch fails. Ages like any other snapshot.
    pub fn unavailable() -> Self {
        Self::new(UNAVAILABLE_TEMPERATURE, UNAVAILABLE_SUMMARY)
    }

    pub fn is_unavailable(&self) -> bool {
        self.temperature == UNAVAILABLE_TEMPERATURE
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// Source of current conditions. Location and units are fixed at construction.
#[allow(async_fn_in_trait)]
pub trait WeatherProvider {
    async fn fetch(&mut self) -> Result<WeatherSnapshot, NetworkError>;
}

/// Last snapshot plus the provider that refreshes it. A cache built without a
/// provider never holds weather and never reports itself stale.
pub struct WeatherCache<P> {
    provider: Option<P>,
    snapshot: Option<WeatherSnapshot>,
}

impl<P: WeatherProvider> WeatherCache<P> {
    pub fn new(provider: Option<P>) -> Self {
        Self { provider, snapshot: None }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn get(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        if self.provider.is_none() {
            return false;
        }
        match &self.snapshot {
            None => true,
            Some(s) => s.age(now) >= threshold,
        }
    }

    /// Fetch when there is no snapshot or it is at least `threshold` old.
    /// Returns true when a fetch was attempted.
    pub async fn refresh_if_stale(&mut self, threshold: Duration) -> bool {
        if !self.is_stale(Instant::now(), threshold) {
            return false;
        }
        self.refresh().await;
        true
    }

    /// Unconditional fetch. Failures are swapped for the sentinel snapshot.
    pub async fn refresh(&mut self) {
        let Some(provider) = self.provider.as_mut() else {
            return;
        };
        let snapshot = match provider.fetch().await {
            Ok(s) => {
                info!("Weather at {}: {} / {}", s.observed.format("%H:%M"), s.temperature, s.summary);
                s
            }
            Err(e) => {
                error!("Weather fetch failed: {}", e);
                WeatherSnapshot::unavailable()
            }
        };
        self.snapshot = Some(snapshot);
    }
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// OpenWeatherMap current-weather client.
pub struct OpenWeather {
    client: Client,
    base_url: String,
    api_key: String,
    lat: f64,
    lng: f64,
    units: TempUnits,
}

impl OpenWeather {
    pub fn new(config: &WeatherConfig) -> Result<Self, NetworkError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Accept-Encoding", header::HeaderValue::from_static("deflate, gzip"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone().unwrap_or_else(|| OPENWEATHER_URL.to_string()),
            api_key: config.api_key.clone().unwrap_or_default(),
            lat: config.lat.unwrap_or_default(),
            lng: config.lng.unwrap_or_default(),
            units: config.units.unwrap_or_default(),
        })
    }

    async fn send_with_retries<T: Serialize + ?Sized>(
        &self,
        params: &T,
        max_retries: u8,
    ) -> Result<String, NetworkError> {
        let mut retries = 0;
        loop {
            match self.client.get(&self.base_url).query(params).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(NetworkError::Status(status.as_u16()));
                    }
                    let raw = response.bytes().await?;
                    return Ok(decode_body(&raw));
                }
                Err(e) => {
                    retries += 1;
                    if retries >= max_retries {
                        return Err(e.into());
                    }
                    warn!("Weather request failed ({}), retry {}/{}", e, retries, max_retries);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

impl WeatherProvider for OpenWeather {
    async fn fetch(&mut self) -> Result<WeatherSnapshot, NetworkError> {
        debug!("Fetching weather for {:.4},{:.4}", self.lat, self.lng);
        let params = [
            ("lat", self.lat.to_string()),
            ("lon", self.lng.to_string()),
            ("units", self.units.as_query().to_string()),
            ("appid", self.api_key.clone()),
        ];
        let body = self.send_with_retries(&params, 3).await?;
        let conditions: CurrentConditions = serde_json::from_str(&body)?;
        snapshot_from(&conditions, self.units)
    }
}

/// Responses may arrive gzipped even when not asked; fall back to plain text.
fn decode_body(raw: &[u8]) -> String {
    let mut decoder = GzDecoder::new(raw);
    let mut decoded = String::new();
    match decoder.read_to_string(&mut decoded) {
        Ok(_) => decoded,
        Err(_) => String::from_utf8_lossy(raw).to_string(),
    }
}

fn snapshot_from(conditions: &CurrentConditions, units: TempUnits) -> Result<WeatherSnapshot, NetworkError> {
    let description = conditions
        .weather
        .first()
        .map(|c| c.description.as_str())
        .ok_or_else(|| NetworkError::MissingData("weather[0].description".to_string()))?;

    let unit = units.label();
    let temperature = format!("{}{}", conditions.main.temp.round() as i64, unit);
    let feels_like = format!("{}{}", conditions.main.feels_like.round() as i64, unit);
    let summary = title_case(&format!("Feels like {feels_like}. {description}"));

    Ok(WeatherSnapshot::new(temperature, summary))
}

/// Upper-case every letter that follows a non-letter, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        let cased = c.is_lowercase() || c.is_uppercase();
        if cased && !prev_cased {
            out.extend(c.to_uppercase());
        } else if cased {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev_cased = cased;
    }
    out
}
