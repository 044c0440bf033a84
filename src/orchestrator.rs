/*
 *  orchestrator.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  The listening loop: sample, classify, identify when due, and decide
 *  what the panel shows and when it gets a full clean
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

use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::audio::{AudioSampler, Waveform};
use crate::classify::MusicClassifier;
use crate::config::LoopConfig;
use crate::display::DisplayRenderer;
use crate::identify::SongIdentifier;
use crate::song::{CooldownPolicy, SongIdentity, SongSession};
use crate::view::{RefreshCounter, ViewContent, ViewState};
use crate::weather::{WeatherCache, WeatherProvider};

/// Timing knobs for the loop, resolved from config.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub policy: CooldownPolicy,
    pub idle_grace: Duration,
    pub weather_stale: Duration,
    pub refresh_threshold: u32,
    pub identify_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            policy: CooldownPolicy::default(),
            idle_grace: Duration::from_secs(60),
            weather_stale: Duration::from_secs(30 * 60),
            refresh_threshold: 20,
            identify_timeout: Duration::from_secs(20),
        }
    }
}

impl LoopSettings {
    pub fn from_config(config: Option<&LoopConfig>) -> Self {
        let d = Self::default();
        let Some(c) = config else { return d };
        let secs = |v: Option<u64>, fallback: Duration| v.map(Duration::from_secs).unwrap_or(fallback);
        Self {
            policy: CooldownPolicy {
                min_delay: secs(c.min_delay_secs, d.policy.min_delay),
                override_delay: c.delay_override_secs.map(Duration::from_secs),
                retry: secs(c.retry_secs, d.policy.retry),
                sample: secs(c.sample_secs, d.policy.sample),
            },
            idle_grace: secs(c.idle_grace_secs, d.idle_grace),
            weather_stale: c
                .weather_stale_mins
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(d.weather_stale),
            refresh_threshold: c.refresh_threshold.unwrap_or(d.refresh_threshold),
            identify_timeout: secs(c.identify_timeout_secs, d.identify_timeout),
        }
    }

    pub fn sample(&self) -> Duration {
        self.policy.sample
    }
}

/// Song updates arriving from outside the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PushUpdate {
    Song(SongIdentity),
    /// nothing is playing, show the idle view
    Fallback,
}

/// How a recognized or pushed song landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Adoption {
    NewTitle,
    SameTitle,
    NotShown,
}

/// What one tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No waveform this tick.
    CaptureFailed,
    /// Music, but the cooldown has not run out.
    Listening,
    /// The recognizer matched; `changed` when a new title went up.
    Identified { changed: bool },
    /// The recognizer matched but the panel refused the new title; it is
    /// tried again after the miss interval.
    RenderFailed,
    /// The recognizer came back empty, failed or timed out.
    Unidentified,
    /// Silence, nothing to do yet.
    Quiet,
    /// Silence long enough to switch to the idle view.
    WentIdle,
    /// Idle view re-rendered with fresh weather.
    IdleRefreshed,
}

pub struct Orchestrator<S, C, I, W, R> {
    sampler: S,
    classifier: C,
    identifier: I,
    weather: WeatherCache<W>,
    renderer: R,
    settings: LoopSettings,
    session: SongSession,
    view: ViewState,
    counter: RefreshCounter,
    was_music: bool,
}

impl<S, C, I, W, R> Orchestrator<S, C, I, W, R>
where
    S: AudioSampler,
    C: MusicClassifier,
    I: SongIdentifier,
    W: WeatherProvider,
    R: DisplayRenderer,
{
    pub fn new(
        sampler: S,
        classifier: C,
        identifier: I,
        weather: WeatherCache<W>,
        renderer: R,
        settings: LoopSettings,
    ) -> Self {
        let counter = RefreshCounter::new(settings.refresh_threshold);
        Self {
            sampler,
            classifier,
            identifier,
            weather,
            renderer,
            settings,
            session: SongSession::new(Instant::now()),
            view: ViewState::Unknown,
            counter,
            was_music: false,
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn session(&self) -> &SongSession {
        &self.session
    }

    pub fn refresh_counter(&self) -> &RefreshCounter {
        &self.counter
    }

    /// Blank the panel once and prime the weather cache.
    pub async fn start(&mut self) {
        match self.renderer.clean() {
            Ok(()) => self.transition(ViewState::Clean),
            Err(e) => error!("Start-up clean failed: {}", e),
        }
        self.weather.refresh_if_stale(self.settings.weather_stale).await;
    }

    /// Run until `shutdown` flips to true. Pushed updates are applied
    /// between ticks, never during one.
    pub async fn run(
        &mut self,
        mut push: Option<mpsc::Receiver<PushUpdate>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Listening in {:?} windows", self.settings.sample());
        self.start().await;

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, leaving the listening loop");
                break;
            }
            self.drain_push(&mut push).await;

            if self.tick().await == TickOutcome::CaptureFailed {
                // back off for a window so a dead device does not spin
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.sample()) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    async fn drain_push(&mut self, push: &mut Option<mpsc::Receiver<PushUpdate>>) {
        let Some(rx) = push.as_mut() else { return };
        let mut closed = false;
        loop {
            match rx.try_recv() {
                Ok(update) => self.apply_push(update).await,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }
        if closed {
            warn!("Push channel closed, no more pushed updates");
            *push = None;
        }
    }

    /// One capture, classify, decide cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        let waveform = match self.sampler.capture(self.settings.sample()).await {
            Ok(w) => w,
            Err(e) => {
                error!("Audio capture failed: {}", e);
                return TickOutcome::CaptureFailed;
            }
        };

        let is_music = match self.classifier.classify(&waveform) {
            Ok(music) => music,
            Err(e) => {
                warn!("Classifier failed, treating as silence: {}", e);
                false
            }
        };

        let now = Instant::now();
        let outcome = if is_music {
            self.on_music(&waveform, now).await
        } else {
            self.on_silence(now).await
        };
        self.was_music = is_music;
        debug!("tick: music={} view={} outcome={:?}", is_music, self.view, outcome);
        outcome
    }

    async fn on_music(&mut self, waveform: &Waveform, now: Instant) -> TickOutcome {
        self.session.heard_music(now);
        if !self.session.identification_due(now, self.was_music) {
            return TickOutcome::Listening;
        }
        if !self.was_music {
            info!("Music started, identifying");
        }

        let timeout = self.settings.identify_timeout;
        let found = match tokio::time::timeout(timeout, self.identifier.identify(waveform)).await {
            Ok(Ok(Some(song))) => Some(song),
            Ok(Ok(None)) => {
                info!("No match for this sample");
                None
            }
            Ok(Err(e)) => {
                error!("Identification failed: {}", e);
                None
            }
            Err(_) => {
                warn!("Identification timed out after {:?}", timeout);
                None
            }
        };

        match found {
            Some(song) => {
                let cooldown = self.settings.policy.after_match(&song);
                match self.apply_identity(song) {
                    Adoption::NotShown => {
                        self.session.record_detection(now, self.settings.policy.after_miss());
                        TickOutcome::RenderFailed
                    }
                    adoption => {
                        self.session.record_detection(now, cooldown);
                        TickOutcome::Identified { changed: adoption == Adoption::NewTitle }
                    }
                }
            }
            None => {
                let cooldown = self.settings.policy.after_miss();
                debug!("retrying in {:?}", cooldown);
                self.session.record_detection(now, cooldown);
                TickOutcome::Unidentified
            }
        }
    }

    async fn on_silence(&mut self, now: Instant) -> TickOutcome {
        if self.was_music {
            info!("Music stopped");
        }
        if self.session.quiet_for(now) < self.settings.idle_grace {
            return TickOutcome::Quiet;
        }

        let stale = self.settings.weather_stale;
        if self.view != ViewState::NothingPlaying {
            self.weather.refresh_if_stale(stale).await;
            self.show_idle();
            return TickOutcome::WentIdle;
        }
        if self.weather.is_stale(now, stale) {
            self.weather.refresh().await;
            self.show(ViewContent::idle(self.weather.get()));
            return TickOutcome::IdleRefreshed;
        }
        TickOutcome::Quiet
    }

    /// Shared entry for recognized and pushed songs. Only a title change
    /// reaches the panel, and the session takes the new title only once the
    /// panel shows it.
    fn apply_identity(&mut self, song: SongIdentity) -> Adoption {
        if self.session.current_title() == Some(song.title.as_str()) {
            debug!("Same title, render suppressed");
            self.session.adopt(song);
            return Adoption::SameTitle;
        }

        info!("Now playing: '{}' by {}", song.title, song.artist);
        if self.show(ViewContent::Song(song.clone())) {
            self.session.adopt(song);
            Adoption::NewTitle
        } else {
            Adoption::NotShown
        }
    }

    pub async fn apply_push(&mut self, update: PushUpdate) {
        match update {
            PushUpdate::Song(song) => {
                info!("Pushed song '{}'", song.title);
                let cooldown = match self.apply_identity(song.clone()) {
                    Adoption::NotShown => self.settings.policy.after_miss(),
                    _ => self.settings.policy.after_match(&song),
                };
                self.session.record_detection(Instant::now(), cooldown);
            }
            PushUpdate::Fallback => {
                info!("Pushed fallback, showing idle view");
                self.weather.refresh_if_stale(self.settings.weather_stale).await;
                self.show_idle();
            }
        }
    }

    fn show_idle(&mut self) {
        self.session.forget();
        self.show(ViewContent::idle(self.weather.get()));
    }

    /// Render `content`, running the clean cycle first when the counter is
    /// past its threshold. Returns true when the render landed.
    fn show(&mut self, content: ViewContent) -> bool {
        if self.counter.clean_due() {
            info!("{} renders since last clean, cleaning panel", self.counter.count());
            match self.renderer.clean() {
                Ok(()) => self.transition(ViewState::Clean),
                Err(e) => error!("Panel clean failed: {}", e),
            }
            self.counter.reset();
        }

        match self.renderer.render(&content) {
            Ok(()) => {
                self.counter.record_render();
                self.transition(content.view_state());
                true
            }
            Err(e) => {
                error!("Render failed: {}", e);
                false
            }
        }
    }

    fn transition(&mut self, next: ViewState) {
        if self.view != next {
            info!("View {} -> {}", self.view, next);
            self.view = next;
        }
    }
}
