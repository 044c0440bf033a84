/*
 *  display/compose.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame layout: a headline block and a detail block stacked top down,
 *  each wrapped to the panel width and centred
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

use embedded_graphics::{
    mono_font::{iso_8859_1::{FONT_10X20, FONT_6X10, FONT_6X13_BOLD}, MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{renderer::TextRenderer, Baseline, Text},
};

use crate::textfit::fit_lines;
use crate::view::ViewContent;

pub const NO_SONG: &str = "No song playing";
const GAP: i32 = 4;

/// One positioned line of text.
#[derive(Clone)]
pub struct TextLine {
    pub text: String,
    pub origin: Point,
    pub font: &'static MonoFont<'static>,
}

fn measure(font: &'static MonoFont<'static>) -> impl Fn(&str) -> u32 + Clone {
    let style = MonoTextStyle::new(font, BinaryColor::On);
    move |s: &str| style.measure_string(s, Point::zero(), Baseline::Top).bounding_box.size.width
}

/// Headline and detail text for `content`.
fn blocks(content: &ViewContent) -> [(String, &'static MonoFont<'static>); 2] {
    match content {
        ViewContent::Song(song) => [
            (song.title.clone(), &FONT_6X13_BOLD),
            (song.artist.clone(), &FONT_6X10),
        ],
        ViewContent::Weather(weather) => [
            (weather.temperature.clone(), &FONT_10X20),
            (weather.summary.clone(), &FONT_6X10),
        ],
        ViewContent::Placeholder => [
            (NO_SONG.to_string(), &FONT_6X13_BOLD),
            (env!("CARGO_PKG_NAME").to_string(), &FONT_6X10),
        ],
    }
}

/// Lay out `content` on a `size` panel. Lines that would run past the
/// bottom edge are dropped.
pub fn layout(content: &ViewContent, size: Size) -> Vec<TextLine> {
    let (width, height) = (size.width, size.height as i32);
    let mut lines = Vec::new();
    let mut y = 0i32;

    for (i, (text, font)) in blocks(content).into_iter().enumerate() {
        if i > 0 && !lines.is_empty() {
            y += GAP;
        }
        let line_h = font.character_size.height as i32;
        for (line, w) in fit_lines(&text, width, measure(font)) {
            if y + line_h > height {
                return lines;
            }
            let x = (width.saturating_sub(w) / 2) as i32;
            lines.push(TextLine { text: line, origin: Point::new(x, y), font });
            y += line_h;
        }
    }
    lines
}

/// Clear `target` and draw `content` into it.
pub fn compose<D>(target: &mut D, content: &ViewContent) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    for line in layout(content, target.bounding_box().size) {
        let style = MonoTextStyle::new(line.font, BinaryColor::On);
        Text::with_baseline(&line.text, line.origin, style, Baseline::Top).draw(target)?;
    }
    Ok(())
}
