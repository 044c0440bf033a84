/*
 *  identify.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Song recognition. The shipped recognizer uploads a WAV clip to an HTTP
 *  recognition endpoint, then asks MusicBrainz how long the track runs.
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

use log::{debug, info, warn};
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::{wav::encode_wav, Waveform};
use crate::config::RecognizerConfig;
use crate::error::{IdentifyError, NetworkError};
use crate::song::{SongIdentity, NO_COVER_ART};

const VERSION: &str = concat!("Earshot/v", env!("CARGO_PKG_VERSION"));
const MUSICBRAINZ_URL: &str = "https://musicbrainz.org";
/// Upload budget. Together with the lookup budget it stays under the
/// loop's identification timeout.
const RECOGNIZE_TIMEOUT: Duration = Duration::from_secs(12);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);
const UNKNOWN: &str = "Unknown";

#[allow(async_fn_in_trait)]
pub trait SongIdentifier {
    /// `Ok(None)` when the recognizer heard nothing it knows.
    async fn identify(&mut self, waveform: &Waveform) -> Result<Option<SongIdentity>, IdentifyError>;
}

#[derive(Debug, Deserialize)]
struct MatchDocument {
    track: Option<Track>,
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Track {
    title: Option<String>,
    subtitle: Option<String>,
    images: Option<Images>,
    isrc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Images {
    coverart: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Match {
    offset: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    /// milliseconds
    length: Option<u64>,
}

pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    musicbrainz: Option<String>,
    lookup_timeout: Duration,
}

impl HttpRecognizer {
    pub fn new(config: &RecognizerConfig) -> Result<Self, NetworkError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| NetworkError::MissingData("recognizer endpoint".to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(RECOGNIZE_TIMEOUT)
            .default_headers(headers)
            .build()?;

        let musicbrainz = if config.musicbrainz.unwrap_or(true) {
            Some(config.musicbrainz_url.clone().unwrap_or_else(|| MUSICBRAINZ_URL.to_string()))
        } else {
            None
        };

        let lookup_timeout = config
            .lookup_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(LOOKUP_TIMEOUT);

        Ok(Self { client, endpoint, api_key: config.api_key.clone(), musicbrainz, lookup_timeout })
    }

    async fn search_recordings(&self, url: &str, query: &[(&str, String)]) -> Result<RecordingSearch, NetworkError> {
        let request = self.client.get(url).query(query).timeout(self.lookup_timeout);
        let response = tokio::time::timeout(self.lookup_timeout, request.send())
            .await
            .map_err(|_| NetworkError::Timeout(self.lookup_timeout))??;
        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Track length by ISRC. Any failure just means the length stays unknown.
    async fn track_length(&self, isrc: &str) -> Option<Duration> {
        let base = self.musicbrainz.as_ref()?;
        let url = format!("{}/ws/2/recording/", base.trim_end_matches('/'));
        let query = [("query", format!("isrc:{isrc}")), ("fmt", "json".to_string())];

        match self.search_recordings(&url, &query).await {
            Ok(search) => {
                let ms = search.recordings.first().and_then(|r| r.length);
                if ms.is_none() {
                    debug!("MusicBrainz has no length for ISRC {}", isrc);
                }
                ms.map(Duration::from_millis)
            }
            Err(e) => {
                warn!("MusicBrainz lookup for ISRC {} failed: {}", isrc, e);
                None
            }
        }
    }
}

impl SongIdentifier for HttpRecognizer {
    async fn identify(&mut self, waveform: &Waveform) -> Result<Option<SongIdentity>, IdentifyError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "audio/wav")
            .body(encode_wav(waveform));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()).into());
        }
        let body = response.bytes().await?;
        let document: MatchDocument = serde_json::from_slice(&body)
            .map_err(|e| IdentifyError::Recognition(format!("unreadable match document: {e}")))?;

        let Some((song, isrc)) = parse_match(document) else {
            debug!("recognizer found no match");
            return Ok(None);
        };

        let duration = match isrc.as_deref() {
            Some(isrc) => self.track_length(isrc).await,
            None => None,
        };
        let song = SongIdentity { duration, ..song };
        info!("recognized '{}' by {} (offset {:?}, length {:?})", song.title, song.artist, song.offset, song.duration);
        Ok(Some(song))
    }
}

fn parse_match(document: MatchDocument) -> Option<(SongIdentity, Option<String>)> {
    let track = document.track?;
    let offset = document
        .matches
        .first()
        .and_then(|m| m.offset)
        .filter(|o| o.is_finite() && *o >= 0.0)
        .map(Duration::from_secs_f64);

    let song = SongIdentity::new(
        track.title.unwrap_or_else(|| UNKNOWN.to_string()),
        track.subtitle.unwrap_or_else(|| UNKNOWN.to_string()),
    )
    .with_cover_art(
        track
            .images
            .and_then(|i| i.coverart)
            .unwrap_or_else(|| NO_COVER_ART.to_string()),
    )
    .with_timing(offset, None);

    Some((song, track.isrc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::{get, post}, Json, Router};
    use serde_json::json;

    fn doc(v: serde_json::Value) -> MatchDocument {
        serde_json::from_value(v).expect("match document")
    }

    #[test]
    fn parse_full_match() {
        let (song, isrc) = parse_match(doc(json!({
            "track": {
                "title": "Teardrop",
                "subtitle": "Massive Attack",
                "images": {"coverart": "https://img/cover.jpg"},
                "isrc": "GBAAA9800322"
            },
            "matches": [{"offset": 42.5}]
        })))
        .expect("match");
        assert_eq!(song.title, "Teardrop");
        assert_eq!(song.artist, "Massive Attack");
        assert_eq!(song.cover_art, "https://img/cover.jpg");
        assert_eq!(song.offset, Some(Duration::from_millis(42_500)));
        assert_eq!(isrc.as_deref(), Some("GBAAA9800322"));
    }

    #[test]
    fn parse_sparse_match_uses_defaults() {
        let (song, isrc) = parse_match(doc(json!({"track": {}, "matches": []}))).expect("match");
        assert_eq!(song.title, UNKNOWN);
        assert_eq!(song.artist, UNKNOWN);
        assert_eq!(song.cover_art, NO_COVER_ART);
        assert!(song.offset.is_none());
        assert!(isrc.is_none());
    }

    #[test]
    fn no_track_is_no_match() {
        assert!(parse_match(doc(json!({"matches": []}))).is_none());
    }

    async fn stub_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn identify_enriches_duration() {
        let app = Router::new()
            .route(
                "/recognize",
                post(|| async {
                    Json(json!({
                        "track": {"title": "Song A", "subtitle": "Band", "isrc": "X1"},
                        "matches": [{"offset": 10.0}]
                    }))
                }),
            )
            .route("/ws/2/recording/", get(|| async { Json(json!({"recordings": [{"length": 200000}]})) }));
        let base = stub_server(app).await;

        let config = RecognizerConfig {
            endpoint: Some(format!("{base}/recognize")),
            musicbrainz_url: Some(base),
            ..Default::default()
        };
        let mut recognizer = HttpRecognizer::new(&config).expect("recognizer");
        let song = recognizer
            .identify(&Waveform::new(vec![0.1; 160], 16_000))
            .await
            .expect("identify")
            .expect("a match");
        assert_eq!(song.title, "Song A");
        assert_eq!(song.duration, Some(Duration::from_secs(200)));
        assert_eq!(song.offset, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn failed_length_lookup_keeps_identity() {
        let app = Router::new().route(
            "/recognize",
            post(|| async { Json(json!({"track": {"title": "Song B", "isrc": "X2"}})) }),
        );
        let base = stub_server(app).await;

        let config = RecognizerConfig {
            endpoint: Some(format!("{base}/recognize")),
            musicbrainz_url: Some(base),
            ..Default::default()
        };
        let mut recognizer = HttpRecognizer::new(&config).expect("recognizer");
        let song = recognizer
            .identify(&Waveform::new(vec![0.1; 160], 16_000))
            .await
            .expect("identify")
            .expect("a match");
        assert_eq!(song.title, "Song B");
        assert!(song.duration.is_none());
    }

    #[tokio::test]
    async fn stalled_length_lookup_keeps_identity() {
        let app = Router::new()
            .route(
                "/recognize",
                post(|| async { Json(json!({"track": {"title": "Song C", "isrc": "X3"}})) }),
            )
            .route(
                "/ws/2/recording/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Json(json!({"recordings": [{"length": 200000}]}))
                }),
            );
        let base = stub_server(app).await;

        let config = RecognizerConfig {
            endpoint: Some(format!("{base}/recognize")),
            musicbrainz_url: Some(base),
            lookup_timeout_secs: Some(1),
            ..Default::default()
        };
        let mut recognizer = HttpRecognizer::new(&config).expect("recognizer");
        let song = tokio::time::timeout(
            Duration::from_secs(5),
            recognizer.identify(&Waveform::new(vec![0.1; 160], 16_000)),
        )
        .await
        .expect("lookup budget bounds the identification")
        .expect("identify")
        .expect("a match");
        assert_eq!(song.title, "Song C");
        assert!(song.duration.is_none());
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let app = Router::new().route(
            "/recognize",
            post(|| async { axum::http::StatusCode::TOO_MANY_REQUESTS }),
        );
        let base = stub_server(app).await;
        let config = RecognizerConfig {
            endpoint: Some(format!("{base}/recognize")),
            musicbrainz: Some(false),
            ..Default::default()
        };
        let mut recognizer = HttpRecognizer::new(&config).expect("recognizer");
        let err = recognizer
            .identify(&Waveform::new(vec![0.1; 160], 16_000))
            .await
            .expect_err("429");
        assert!(matches!(err, IdentifyError::Network(NetworkError::Status(429))));
    }
}
