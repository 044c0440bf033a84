/*
 *  ingress.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  HTTP push endpoint: lets a player announce the song directly
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

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::PushConfig;
use crate::orchestrator::PushUpdate;
use crate::song::{SongIdentity, NO_COVER_ART};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
/// Pushed updates waiting for the next tick boundary.
pub const QUEUE_DEPTH: usize = 16;

/// `{"data": {...}}` for a song, `{"data": null}` to fall back to weather.
#[derive(Debug, Deserialize)]
pub struct PushPayload {
    pub data: Option<PushSong>,
}

#[derive(Debug, Deserialize)]
pub struct PushSong {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_art: Option<String>,
}

impl From<PushPayload> for PushUpdate {
    fn from(payload: PushPayload) -> Self {
        match payload.data {
            None => PushUpdate::Fallback,
            Some(song) => {
                let art = song
                    .album_art
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_COVER_ART.to_string());
                PushUpdate::Song(SongIdentity::new(song.title, song.artist).with_cover_art(art))
            }
        }
    }
}

#[derive(Clone)]
struct PushState {
    tx: mpsc::Sender<PushUpdate>,
}

/// Bind early so a busy port stops start-up instead of a background task.
pub async fn bind(config: &PushConfig) -> std::io::Result<TcpListener> {
    let addr = format!(
        "{}:{}",
        config.bind.as_deref().unwrap_or(DEFAULT_BIND),
        config.port.unwrap_or(DEFAULT_PORT)
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Push endpoint listening on http://{}", addr);
    Ok(listener)
}

pub fn router(tx: mpsc::Sender<PushUpdate>) -> Router {
    Router::new()
        .route("/", post(push_song))
        .route("/song", post(push_song))
        .with_state(PushState { tx })
}

pub fn start_server(
    listener: TcpListener,
    tx: mpsc::Sender<PushUpdate>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(tx)).await {
            error!("Push server error: {}", e);
        }
    })
}

async fn push_song(
    State(state): State<PushState>,
    payload: Result<Json<PushPayload>, JsonRejection>,
) -> StatusCode {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!("Rejected push: {}", rejection.body_text());
            return StatusCode::BAD_REQUEST;
        }
    };

    let update = PushUpdate::from(payload);
    info!("Push received: {:?}", update);
    if state.tx.send(update).await.is_err() {
        error!("Listening loop is gone, dropping push");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn song_payload_is_queued() {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        let body = r#"{"data": {"title": "Hyperballad", "artist": "Björk", "album_art": "http://x/a.jpg"}}"#;
        let response = router(tx).oneshot(post_json("/", body)).await.expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        match rx.try_recv().expect("queued") {
            PushUpdate::Song(song) => {
                assert_eq!(song.title, "Hyperballad");
                assert_eq!(song.artist, "Björk");
                assert_eq!(song.cover_art, "http://x/a.jpg");
            }
            other => panic!("unexpected update {:?}", other),
        }
    }

    #[tokio::test]
    async fn null_data_means_fallback() {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        let response = router(tx)
            .oneshot(post_json("/song", r#"{"data": null}"#))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.try_recv().expect("queued"), PushUpdate::Fallback);
    }

    #[tokio::test]
    async fn missing_art_gets_placeholder() {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        let body = r#"{"data": {"title": "T", "artist": "A"}}"#;
        router(tx).oneshot(post_json("/", body)).await.expect("response");

        let Ok(PushUpdate::Song(song)) = rx.try_recv() else { panic!("expected song") };
        assert_eq!(song.cover_art, NO_COVER_ART);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        let app = router(tx);

        let response = app.clone().oneshot(post_json("/", "{not json")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // well formed but the wrong shape
        let response = app
            .oneshot(post_json("/", r#"{"data": {"title": 3}}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_loop_is_unavailable() {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        drop(rx);
        let response = router(tx)
            .oneshot(post_json("/", r#"{"data": null}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
