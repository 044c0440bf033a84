/*
 *  display/panel.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Renderer for framebuffer panels: compose, flush, and the ghost-busting
 *  clean cycle
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

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::debug;
use std::fmt::Debug;

use crate::display::compose::compose;
use crate::display::traits::{DisplayDriver, DisplayRenderer};
use crate::error::RenderError;
use crate::view::ViewContent;

pub struct PanelRenderer<D> {
    driver: D,
    clean_passes: u8,
}

impl<D> PanelRenderer<D> {
    pub fn new(driver: D, clean_passes: u8) -> Self {
        Self { driver, clean_passes: clean_passes.max(1) }
    }
}

impl<D> DisplayRenderer for PanelRenderer<D>
where
    D: DisplayDriver + DrawTarget<Color = BinaryColor>,
    D::Error: Debug,
{
    fn render(&mut self, content: &ViewContent) -> Result<(), RenderError> {
        compose(&mut self.driver, content).map_err(|e| RenderError::Compose(format!("{e:?}")))?;
        self.driver.flush()?;
        Ok(())
    }

    /// Each pass drives every pixel on, then off.
    fn clean(&mut self) -> Result<(), RenderError> {
        for pass in 0..self.clean_passes {
            debug!("clean pass {}/{}", pass + 1, self.clean_passes);
            DrawTarget::clear(&mut self.driver, BinaryColor::On)
                .map_err(|e| RenderError::Compose(format!("{e:?}")))?;
            self.driver.flush()?;
            DisplayDriver::clear(&mut self.driver)?;
        }
        Ok(())
    }
}
