/*
 *  display/drivers/ssd1306.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 I2C OLED panel
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::{BufferedGraphicsMode, DisplayConfig as _},
    prelude::*,
    size::{DisplaySize, DisplaySize128x64, DisplaySize128x32},
    I2CDisplayInterface,
    Ssd1306,
};

use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::geometry::Size;

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::vframebuf::VarFrameBuf;

use log::info;

type Panel<S> = Ssd1306<I2CInterface<I2cdev>, S, BufferedGraphicsMode<S>>;

/// Enum to handle different SSD1306 display sizes
enum Ssd1306Variants {
    Size128x64(Panel<DisplaySize128x64>),
    Size128x32(Panel<DisplaySize128x32>),
}

/// SSD1306 display driver wrapper. Drawing lands in `framebuffer`;
/// `flush` copies it into the controller buffer and out over I2C.
pub struct Ssd1306Driver {
    display: Ssd1306Variants,
    framebuffer: VarFrameBuf<BinaryColor>,
    capabilities: DisplayCapabilities,
    /// unrotated panel size
    native: (u32, u32),
    /// applied in software while copying the frame
    invert: bool,
}

/// Run `$body` against whichever panel size is wired up.
macro_rules! with_panel {
    ($variants:expr, $panel:ident => $body:expr) => {
        match $variants {
            Ssd1306Variants::Size128x64($panel) => $body,
            Ssd1306Variants::Size128x32($panel) => $body,
        }
    };
}

/// Drawable size once the controller is turned `degrees`.
fn oriented_size(native: (u32, u32), degrees: u16) -> Result<(u32, u32), DisplayError> {
    match degrees {
        0 | 180 => Ok(native),
        90 | 270 => Ok((native.1, native.0)),
        _ => Err(DisplayError::Rotation(degrees)),
    }
}

fn push_frame<S: DisplaySize>(
    panel: &mut Panel<S>,
    framebuffer: &VarFrameBuf<BinaryColor>,
    invert: bool,
) -> Result<(), DisplayError> {
    panel.clear(BinaryColor::Off)?;
    panel.draw_iter(framebuffer.lit_points(invert).map(|p| Pixel(p, BinaryColor::On)))?;
    panel.flush()?;
    Ok(())
}

impl Ssd1306Driver {
    /// Open `i2c_bus_path` and bring up a 128x64 or 128x32 panel at `address`
    /// (typically 0x3C or 0x3D).
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Initializing SSD1306 on {} at address 0x{:02X}", i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::Bus(format!("cannot open {}: {}", i2c_bus_path, e)))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);

        let width = config.width.unwrap_or(128);
        let height = config.height.unwrap_or(64);

        let display = match (width, height) {
            (128, 64) => {
                let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode();
                panel.init()?;
                Ssd1306Variants::Size128x64(panel)
            }
            (128, 32) => {
                let mut panel = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode();
                panel.init()?;
                Ssd1306Variants::Size128x32(panel)
            }
            _ => return Err(DisplayError::Size { width, height }),
        };

        let driver = Self {
            display,
            framebuffer: VarFrameBuf::new(width, height, BinaryColor::Off),
            capabilities: DisplayCapabilities {
                width,
                height,
                supports_rotation: true,
                supports_brightness: true,
                supports_invert: true,
            },
            native: (width, height),
            invert: false,
        };

        info!("SSD1306 initialized successfully ({}x{})", width, height);
        Ok(driver)
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = match value {
            0..=63 => Brightness::DIMMEST,
            64..=127 => Brightness::DIM,
            128..=191 => Brightness::NORMAL,
            _ => Brightness::BRIGHTEST,
        };
        with_panel!(&mut self.display, panel => panel.set_brightness(brightness))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let (framebuffer, invert) = (&self.framebuffer, self.invert);
        with_panel!(&mut self.display, panel => push_frame(panel, framebuffer, invert))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.framebuffer.fill(BinaryColor::Off);
        self.flush()
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.invert = inverted;
        Ok(())
    }

    /// Quarter turns swap the drawable size, so the framebuffer is rebuilt.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let (width, height) = oriented_size(self.native, degrees)?;
        let rotation = match degrees {
            90 => DisplayRotation::Rotate90,
            180 => DisplayRotation::Rotate180,
            270 => DisplayRotation::Rotate270,
            _ => DisplayRotation::Rotate0,
        };
        with_panel!(&mut self.display, panel => panel.set_rotation(rotation))?;
        self.framebuffer = VarFrameBuf::new(width, height, BinaryColor::Off);
        self.capabilities.width = width;
        self.capabilities.height = height;
        Ok(())
    }
}

// Provide direct DrawTarget access on the driver itself
impl DrawTarget for Ssd1306Driver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.fill(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.framebuffer.fill_contiguous(area, colors)
    }
}

impl OriginDimensions for Ssd1306Driver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_swap_the_frame() {
        assert_eq!(oriented_size((128, 64), 0).unwrap(), (128, 64));
        assert_eq!(oriented_size((128, 64), 180).unwrap(), (128, 64));
        assert_eq!(oriented_size((128, 64), 90).unwrap(), (64, 128));
        assert_eq!(oriented_size((128, 32), 270).unwrap(), (32, 128));
        assert!(matches!(oriented_size((128, 64), 45), Err(DisplayError::Rotation(45))));
    }
}
