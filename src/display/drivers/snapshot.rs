/*
 *  display/drivers/snapshot.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  File-backed panel: every flush rewrites a plain PBM image
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
use embedded_graphics::primitives::Rectangle;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::vframebuf::VarFrameBuf;

pub const DEFAULT_SNAPSHOT_PATH: &str = "earshot.pbm";

pub struct SnapshotDriver {
    framebuffer: VarFrameBuf<BinaryColor>,
    capabilities: DisplayCapabilities,
    path: PathBuf,
    invert: bool,
}

impl SnapshotDriver {
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let width = config.width.unwrap_or(128);
        let height = config.height.unwrap_or(64);
        if width == 0 || height == 0 {
            return Err(DisplayError::Size { width, height });
        }
        let path = config
            .snapshot_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));

        info!("Snapshot panel {}x{} writing to {}", width, height, path.display());
        Ok(Self {
            framebuffer: VarFrameBuf::new(width, height, BinaryColor::Off),
            capabilities: DisplayCapabilities {
                width,
                height,
                supports_rotation: false,
                supports_brightness: false,
                supports_invert: true,
            },
            path,
            invert: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plain (P1) PBM: 1 is black, so lit pixels are written as 1.
    fn to_pbm(&self) -> String {
        let (w, h) = (self.framebuffer.width(), self.framebuffer.height());
        let mut out = String::with_capacity(16 + w * h * 2);
        out.push_str(&format!("P1\n{} {}\n", w, h));
        for row in self.framebuffer.as_slice().chunks(w.max(1)) {
            let line: Vec<&str> = row
                .iter()
                .map(|c| if c.is_on() != self.invert { "1" } else { "0" })
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

impl DisplayDriver for SnapshotDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    /// Written beside the target then renamed, so readers never see half a frame.
    fn flush(&mut self) -> Result<(), DisplayError> {
        let tmp = self.path.with_extension("pbm.tmp");
        fs::write(&tmp, self.to_pbm())?;
        fs::rename(&tmp, &self.path)?;
        debug!("snapshot written to {}", self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.framebuffer.fill(BinaryColor::Off);
        self.flush()
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.invert = inverted;
        Ok(())
    }
}

impl DrawTarget for SnapshotDriver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.framebuffer.fill_contiguous(area, colors)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.fill(color);
        Ok(())
    }
}

impl OriginDimensions for SnapshotDriver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_at(name: &str, invert: bool) -> SnapshotDriver {
        let path = std::env::temp_dir().join(format!("earshot-{}-{}.pbm", name, std::process::id()));
        let config = DisplayConfig {
            width: Some(4),
            height: Some(2),
            snapshot_path: Some(path),
            ..Default::default()
        };
        let mut driver = SnapshotDriver::new(&config).expect("snapshot driver");
        driver.set_invert(invert).expect("invert");
        driver
    }

    #[test]
    fn flush_writes_pbm() {
        let mut driver = driver_at("flush", false);
        Pixel(Point::new(1, 0), BinaryColor::On).draw(&mut driver).expect("infallible");
        driver.flush().expect("flush");

        let written = fs::read_to_string(driver.path()).expect("read back");
        assert_eq!(written, "P1\n4 2\n0 1 0 0\n0 0 0 0\n");
        fs::remove_file(driver.path()).ok();
    }

    #[test]
    fn invert_flips_output_and_clear_blanks() {
        let mut driver = driver_at("invert", true);
        DisplayDriver::clear(&mut driver).expect("clear");

        let written = fs::read_to_string(driver.path()).expect("read back");
        assert_eq!(written, "P1\n4 2\n1 1 1 1\n1 1 1 1\n");
        fs::remove_file(driver.path()).ok();
    }

    #[test]
    fn zero_size_is_rejected() {
        let config = DisplayConfig { width: Some(0), ..Default::default() };
        assert!(SnapshotDriver::new(&config).is_err());
    }
}
