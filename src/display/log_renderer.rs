/*
 *  display/log_renderer.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Headless renderer, logs what would be drawn
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

use log::info;

use crate::display::compose::NO_SONG;
use crate::display::traits::DisplayRenderer;
use crate::error::RenderError;
use crate::view::ViewContent;

#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DisplayRenderer for LogRenderer {
    fn render(&mut self, content: &ViewContent) -> Result<(), RenderError> {
        self.frames += 1;
        match content {
            ViewContent::Song(song) => {
                info!("[frame {}] {} - {} ({})", self.frames, song.title, song.artist, song.cover_art)
            }
            ViewContent::Weather(w) => {
                info!("[frame {}] {} {}", self.frames, w.temperature, w.summary)
            }
            ViewContent::Placeholder => info!("[frame {}] {}", self.frames, NO_SONG),
        }
        Ok(())
    }

    fn clean(&mut self) -> Result<(), RenderError> {
        info!("[clean] after {} frames", self.frames);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::SongIdentity;

    #[test]
    fn counts_frames_across_cleans() {
        let mut renderer = LogRenderer::new();
        renderer.render(&ViewContent::Song(SongIdentity::new("Teardrop", "Massive Attack"))).unwrap();
        renderer.render(&ViewContent::Placeholder).unwrap();
        renderer.clean().unwrap();
        assert_eq!(renderer.frames(), 2);
    }
}
