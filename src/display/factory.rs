/*
 *  display/factory.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the configured renderer at start-up
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

use crate::config::{DisplayConfig, PanelKind};
use crate::display::drivers::snapshot::SnapshotDriver;
use crate::display::error::{DisplayError, DisplayFactoryError};
use crate::display::log_renderer::LogRenderer;
use crate::display::panel::PanelRenderer;
use crate::display::traits::{DisplayDriver, DisplayRenderer};
use log::{info, warn};

#[cfg(feature = "driver-ssd1306")]
use crate::config::BusConfig;

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

/// Type alias for boxed renderer trait objects
pub type BoxedRenderer = Box<dyn DisplayRenderer>;

const DEFAULT_CLEAN_PASSES: u8 = 2;

/// Factory for creating renderers from configuration
pub struct DisplayRendererFactory;

impl DisplayRendererFactory {
    /// Create the renderer named by `config.driver` (the log renderer when unset).
    ///
    /// Hardware panels need a bus; asking for one whose feature was not
    /// compiled in is a configuration error rather than a silent fallback.
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedRenderer, DisplayFactoryError> {
        Self::validate_config(config)?;
        let kind = config.driver.unwrap_or_default();
        let passes = config.clean_passes.unwrap_or(DEFAULT_CLEAN_PASSES);
        info!("Creating {:?} renderer ({} clean passes)", kind, passes);

        match kind {
            PanelKind::Log => Ok(Box::new(LogRenderer::new())),

            PanelKind::Snapshot => {
                let mut driver = SnapshotDriver::new(config)?;
                apply_panel_settings(&mut driver, config)?;
                Ok(Box::new(PanelRenderer::new(driver, passes)))
            }

            #[cfg(feature = "driver-ssd1306")]
            PanelKind::Ssd1306 => {
                let bus = config.bus.as_ref().ok_or(DisplayFactoryError::NoBus)?;
                match bus {
                    BusConfig::I2c { bus, address } => {
                        let mut driver = Ssd1306Driver::new_i2c(bus, *address, config)?;
                        apply_panel_settings(&mut driver, config)?;
                        Ok(Box::new(PanelRenderer::new(driver, passes)))
                    }
                }
            }

            #[cfg(not(feature = "driver-ssd1306"))]
            PanelKind::Ssd1306 => Err(DisplayFactoryError::Config(
                "SSD1306 driver not enabled. Enable with --features driver-ssd1306".to_string()
            )),
        }
    }

    /// Validate a configuration without creating a renderer
    ///
    /// This is useful for checking configuration at startup before attempting
    /// to initialize hardware.
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayFactoryError> {
        if config.driver == Some(PanelKind::Ssd1306) && config.bus.is_none() {
            return Err(DisplayFactoryError::NoBus);
        }

        if let Some(rotation) = config.rotate_deg {
            if !matches!(rotation, 0 | 90 | 180 | 270) {
                return Err(DisplayFactoryError::Config(
                    format!("Invalid rotation angle: {} (must be 0, 90, 180, or 270)", rotation)
                ));
            }
        }

        if config.clean_passes == Some(0) {
            return Err(DisplayFactoryError::Config(
                "clean_passes must be at least 1".to_string()
            ));
        }

        Ok(())
    }
}

/// Push brightness, invert and rotation from config into a fresh driver.
/// Controls the panel lacks are skipped with a warning.
pub fn apply_panel_settings<D: DisplayDriver>(
    driver: &mut D,
    config: &DisplayConfig,
) -> Result<(), DisplayError> {
    let caps = driver.capabilities().clone();
    let (width, height) = driver.dimensions();

    if let Some(brightness) = config.brightness {
        if caps.supports_brightness {
            driver.set_brightness(brightness)?;
        } else {
            warn!("{}x{} panel has no brightness control, ignoring {}", width, height, brightness);
        }
    }
    if let Some(invert) = config.invert {
        if caps.supports_invert {
            driver.set_invert(invert)?;
        } else {
            warn!("{}x{} panel cannot invert, ignoring", width, height);
        }
    }
    if let Some(degrees) = config.rotate_deg.filter(|d| *d != 0) {
        if caps.supports_rotation {
            driver.set_rotation(degrees)?;
        } else {
            warn!("{}x{} panel cannot rotate, ignoring {} degrees", width, height, degrees);
        }
    }
    Ok(())
}
