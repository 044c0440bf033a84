/*
 *  vframebuf.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized framebuffer the composer draws into before a panel flush
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{BinaryColor, PixelColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized framebuffer for embedded-graphics.
#[derive(Debug, Clone)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Row-major pixels
    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn fill(&mut self, color: C) {
        self.buf.fill(color);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<C> {
        if x < self.w && y < self.h { Some(self.buf[y * self.w + x]) } else { None }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl VarFrameBuf<BinaryColor> {
    pub fn lit(&self) -> usize {
        self.buf.iter().filter(|c| c.is_on()).count()
    }

    /// Points of every lit pixel, optionally inverted.
    pub fn lit_points(&self, invert: bool) -> impl Iterator<Item = Point> + '_ {
        let w = self.w;
        self.buf
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.is_on() != invert)
            .map(move |(i, _)| Point::new((i % w) as i32, (i / w) as i32))
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors run over the whole area; anything off-buffer is dropped
        for (p, c) in area.points().zip(colors) {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn clipped_fill_stays_in_bounds() {
        let mut fb = VarFrameBuf::new(8, 4, BinaryColor::Off);
        Rectangle::new(Point::new(6, 2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .expect("infallible");
        assert_eq!(fb.lit(), 4);
        assert_eq!(fb.get(7, 3), Some(BinaryColor::On));
        assert_eq!(fb.get(0, 3), Some(BinaryColor::Off));
    }

    #[test]
    fn lit_points_respect_invert() {
        let mut fb = VarFrameBuf::new(2, 2, BinaryColor::Off);
        Pixel(Point::new(1, 0), BinaryColor::On).draw(&mut fb).expect("infallible");
        assert_eq!(fb.lit_points(false).collect::<Vec<_>>(), vec![Point::new(1, 0)]);
        assert_eq!(fb.lit_points(true).count(), 3);
    }
}
