/*
 *  main.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
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

use anyhow::Context;
use env_logger::Env;
use log::{error, info, warn};
use tokio::sync::{mpsc, watch};

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind};

use earshot::audio::CpalSampler;
use earshot::classify::SpectralGate;
use earshot::config;
use earshot::display::DisplayRendererFactory;
use earshot::identify::HttpRecognizer;
use earshot::ingress;
use earshot::orchestrator::{LoopSettings, Orchestrator};
use earshot::weather::{OpenWeather, WeatherCache};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

#[cfg(unix)]
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    env_logger::Builder::from_env(
        Env::default().default_filter_or(cfg.log_level.as_deref().unwrap_or("info")),
    )
    .format_timestamp_secs()
    .init();

    info!("{} is listening", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let settings = LoopSettings::from_config(cfg.timing.as_ref());
    let sampler = CpalSampler::new(&cfg.audio.clone().unwrap_or_default());
    let classifier = SpectralGate::from_config(&cfg.classifier.clone().unwrap_or_default());
    let identifier = HttpRecognizer::new(&cfg.recognizer.clone().unwrap_or_default())
        .context("building the song recognizer")?;

    let provider = cfg
        .weather
        .as_ref()
        .map(OpenWeather::new)
        .transpose()
        .context("building the weather client")?;
    let weather = WeatherCache::new(provider);
    if !weather.is_enabled() {
        warn!("No weather configured, the idle view shows a placeholder");
    }

    let renderer = DisplayRendererFactory::create_from_config(&cfg.display.clone().unwrap_or_default())
        .context("creating the display renderer")?;

    let push_config = cfg.push.clone().unwrap_or_default();
    let push_rx = if push_config.enabled.unwrap_or(false) {
        let listener = ingress::bind(&push_config)
            .await
            .context("binding the push endpoint")?;
        let (tx, rx) = mpsc::channel(ingress::QUEUE_DEPTH);
        ingress::start_server(listener, tx);
        Some(rx)
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal_handler().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Could not install signal handlers: {}", e);
                // hold the sender so the loop keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    let mut orchestrator = Orchestrator::new(sampler, classifier, identifier, weather, renderer, settings);
    orchestrator.run(push_rx, shutdown_rx).await;

    info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
