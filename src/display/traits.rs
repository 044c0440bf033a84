/*
 *  display/traits.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for renderers and panel drivers
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

use crate::display::error::DisplayError;
use crate::error::RenderError;
use crate::view::ViewContent;

/// What the loop draws through. Implementations own their panel.
pub trait DisplayRenderer: Send {
    /// Draw `content` as the whole frame.
    fn render(&mut self, content: &ViewContent) -> Result<(), RenderError>;

    /// Full clean cycle against ghosting. Leaves the panel blank.
    fn clean(&mut self) -> Result<(), RenderError>;
}

impl<R: DisplayRenderer + ?Sized> DisplayRenderer for Box<R> {
    fn render(&mut self, content: &ViewContent) -> Result<(), RenderError> {
        (**self).render(content)
    }

    fn clean(&mut self) -> Result<(), RenderError> {
        (**self).clean()
    }
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Whether the display supports hardware rotation
    pub supports_rotation: bool,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,

    /// Whether the display supports inversion
    pub supports_invert: bool,
}

/// Minimal hardware abstraction for a monochrome panel.
///
/// Drawing happens through the driver's embedded-graphics `DrawTarget`
/// into a framebuffer; `flush` pushes that framebuffer out.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported("brightness"))
    }

    /// Flush the current framebuffer to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Blank the framebuffer and flush it
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Set display inversion (if supported)
    fn set_invert(&mut self, _inverted: bool) -> Result<(), DisplayError> {
        Err(DisplayError::Unsupported("invert"))
    }

    /// Set display rotation (if supported)
    ///
    /// Rotation angle should be 0, 90, 180, or 270 degrees.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if !matches!(degrees, 0 | 90 | 180 | 270) {
            return Err(DisplayError::Rotation(degrees));
        }
        Err(DisplayError::Unsupported("rotation"))
    }
}
