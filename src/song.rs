/*
 *  song.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Song identity, the re-identification cooldown policy and the session
 *  that tracks what is currently on the panel
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
use tokio::time::Instant;
use log::{debug, warn};

pub const NO_COVER_ART: &str = "No cover art available";

/// A recognized (or pushed) song. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct SongIdentity {
    pub title: String,
    pub artist: String,
    pub cover_art: String,
    /// Where in the track the sample matched.
    pub offset: Option<Duration>,
    /// Total track length, when a lookup found one.
    pub duration: Option<Duration>,
}

impl SongIdentity {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            cover_art: NO_COVER_ART.to_string(),
            offset: None,
            duration: None,
        }
    }

    pub fn with_cover_art(mut self, cover_art: impl Into<String>) -> Self {
        self.cover_art = cover_art.into();
        self
    }

    pub fn with_timing(mut self, offset: Option<Duration>, duration: Option<Duration>) -> Self {
        self.offset = offset;
        self.duration = duration;
        self
    }

    /// Time left in the track once the current sample window is accounted for.
    /// `None` when either the offset or the duration is unknown.
    pub fn remaining_after(&self, sample: Duration) -> Option<Duration> {
        let (offset, duration) = (self.offset?, self.duration?);
        Some(duration.saturating_sub(offset).saturating_sub(sample))
    }
}

/// How long to wait before asking the recognizer again.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    pub min_delay: Duration,
    pub override_delay: Option<Duration>,
    pub retry: Duration,
    pub sample: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(120),
            override_delay: None,
            retry: Duration::from_secs(30),
            sample: Duration::from_secs(10),
        }
    }
}

impl CooldownPolicy {
    /// The floor every successful identification is held to.
    /// An operator override replaces the floor as well as the computed value.
    pub fn floor(&self) -> Duration {
        self.override_delay.unwrap_or(self.min_delay)
    }

    /// Cooldown after a confident match.
    pub fn after_match(&self, song: &SongIdentity) -> Duration {
        let cooldown = match (self.override_delay, song.remaining_after(self.sample)) {
            (Some(fixed), _) => fixed,
            (None, Some(remaining)) => remaining.max(self.min_delay),
            (None, None) => self.min_delay,
        };
        if cooldown < self.sample {
            warn!(
                "cooldown {:?} is shorter than the {:?} sample window, every tick will re-identify",
                cooldown, self.sample
            );
        }
        debug!("'{}' cooldown set to {:?}", song.title, cooldown);
        cooldown
    }

    /// Cooldown after the recognizer came back empty or failed.
    pub fn after_miss(&self) -> Duration {
        self.retry
    }
}

/// The song the loop believes is playing and when it may look again.
#[derive(Debug)]
pub struct SongSession {
    current: Option<SongIdentity>,
    last_detection: Instant,
    cooldown: Duration,
    last_heard: Instant,
}

impl SongSession {
    pub fn new(now: Instant) -> Self {
        Self {
            current: None,
            last_detection: now,
            cooldown: Duration::ZERO,
            last_heard: now,
        }
    }

    pub fn current(&self) -> Option<&SongIdentity> {
        self.current.as_ref()
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.title.as_str())
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// A silence-to-music edge always re-identifies; otherwise wait out the cooldown.
    pub fn identification_due(&self, now: Instant, previous_was_music: bool) -> bool {
        !previous_was_music || now.duration_since(self.last_detection) >= self.cooldown
    }

    /// Close an identification attempt, successful or not.
    pub fn record_detection(&mut self, now: Instant, cooldown: Duration) {
        self.last_detection = now;
        self.cooldown = cooldown;
    }

    /// Note that the latest tick heard music.
    pub fn heard_music(&mut self, now: Instant) {
        self.last_heard = now;
    }

    /// How long the room has been quiet, measured from the later of the last
    /// detection and the last tick that heard music.
    pub fn quiet_for(&self, now: Instant) -> Duration {
        let since = self.last_detection.max(self.last_heard);
        now.saturating_duration_since(since)
    }

    /// Replace the current song. Returns true when the title changed and
    /// the panel should be repainted.
    pub fn adopt(&mut self, song: SongIdentity) -> bool {
        let changed = self.current_title() != Some(song.title.as_str());
        self.current = Some(song);
        changed
    }

    pub fn forget(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str, offset: Option<u64>, duration: Option<u64>) -> SongIdentity {
        SongIdentity::new(title, "Artist")
            .with_timing(offset.map(Duration::from_secs), duration.map(Duration::from_secs))
    }

    #[test]
    fn cooldown_uses_remaining_track_time() {
        let policy = CooldownPolicy::default();
        let cooldown = policy.after_match(&song("A", Some(10), Some(200)));
        assert_eq!(cooldown, Duration::from_secs(180));
    }

    #[test]
    fn cooldown_clamps_to_minimum() {
        let policy = CooldownPolicy::default();
        assert_eq!(policy.after_match(&song("A", Some(190), Some(200))), policy.min_delay);
        // offset past the end must not underflow
        assert_eq!(policy.after_match(&song("A", Some(400), Some(200))), policy.min_delay);
    }

    #[test]
    fn cooldown_without_timing_is_minimum() {
        let policy = CooldownPolicy::default();
        assert_eq!(policy.after_match(&song("A", None, Some(200))), policy.min_delay);
        assert_eq!(policy.after_match(&song("A", Some(5), None)), policy.min_delay);
    }

    #[test]
    fn override_always_wins() {
        let policy = CooldownPolicy {
            override_delay: Some(Duration::from_secs(45)),
            ..Default::default()
        };
        assert_eq!(policy.after_match(&song("A", Some(10), Some(600))), Duration::from_secs(45));
        assert_eq!(policy.floor(), Duration::from_secs(45));
    }

    #[test]
    fn miss_uses_retry() {
        assert_eq!(CooldownPolicy::default().after_miss(), Duration::from_secs(30));
    }

    #[test]
    fn adopt_reports_title_change_only() {
        let mut session = SongSession::new(Instant::now());
        assert!(session.adopt(song("A", None, None)));
        assert!(!session.adopt(song("A", Some(3), Some(9))));
        // the newer identity still replaces the held one
        assert_eq!(session.current().and_then(|s| s.offset), Some(Duration::from_secs(3)));
        assert!(session.adopt(song("B", None, None)));
        session.forget();
        assert!(session.current().is_none());
        assert!(session.adopt(song("B", None, None)));
    }

    #[tokio::test(start_paused = true)]
    async fn identification_due_on_edge_or_after_cooldown() {
        let mut session = SongSession::new(Instant::now());
        session.record_detection(Instant::now(), Duration::from_secs(180));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!session.identification_due(Instant::now(), true));
        assert!(session.identification_due(Instant::now(), false));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(session.identification_due(Instant::now(), true));
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_measured_from_latest_activity() {
        let mut session = SongSession::new(Instant::now());
        session.record_detection(Instant::now(), Duration::from_secs(180));
        tokio::time::advance(Duration::from_secs(40)).await;
        session.heard_music(Instant::now());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(session.quiet_for(Instant::now()), Duration::from_secs(30));
    }
}
