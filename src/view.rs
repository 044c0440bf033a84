/*
 *  view.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  What the panel is showing and when it needs a full clean
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

use std::fmt;

use crate::song::SongIdentity;
use crate::weather::WeatherSnapshot;

/// Logical mode of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    Clean,
    Playing,
    NothingPlaying,
    #[default]
    Unknown,
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViewState::Clean => "CLEAN",
            ViewState::Playing => "PLAYING",
            ViewState::NothingPlaying => "NOTHING_PLAYING",
            ViewState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Everything a renderer may be asked to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewContent {
    Song(SongIdentity),
    Weather(WeatherSnapshot),
    /// Idle, with no weather to show.
    Placeholder,
}

impl ViewContent {
    /// The state the panel is in once this content is up.
    pub fn view_state(&self) -> ViewState {
        match self {
            ViewContent::Song(_) => ViewState::Playing,
            ViewContent::Weather(_) | ViewContent::Placeholder => ViewState::NothingPlaying,
        }
    }

    /// Idle content: weather when a snapshot exists, the placeholder otherwise.
    pub fn idle(weather: Option<&WeatherSnapshot>) -> Self {
        weather
            .cloned()
            .map(ViewContent::Weather)
            .unwrap_or(ViewContent::Placeholder)
    }
}

/// Counts renders since the last clean cycle.
#[derive(Debug, Clone)]
pub struct RefreshCounter {
    count: u32,
    threshold: u32,
}

impl RefreshCounter {
    pub fn new(threshold: u32) -> Self {
        Self { count: 0, threshold }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// The next render must be preceded by a clean cycle.
    pub fn clean_due(&self) -> bool {
        self.count > self.threshold
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn record_render(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_unknown() {
        assert_eq!(ViewState::default(), ViewState::Unknown);
    }

    #[test]
    fn content_maps_to_state() {
        let song = ViewContent::Song(SongIdentity::new("A", "B"));
        assert_eq!(song.view_state(), ViewState::Playing);
        assert_eq!(ViewContent::Placeholder.view_state(), ViewState::NothingPlaying);
        assert_eq!(ViewContent::idle(None), ViewContent::Placeholder);
    }

    #[test]
    fn clean_due_only_past_threshold() {
        let mut counter = RefreshCounter::new(2);
        for _ in 0..3 {
            assert!(!counter.clean_due());
            counter.record_render();
        }
        assert_eq!(counter.count(), 3);
        assert!(counter.clean_due());
        counter.reset();
        assert!(!counter.clean_due());
    }
}
