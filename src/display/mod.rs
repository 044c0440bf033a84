/*
 *  display/mod.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - renderers the loop draws through, and the panel
 *  drivers behind them
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod factory;

// Frame composition and the renderers built on it
pub mod compose;
pub mod panel;
pub mod log_renderer;

// Panel drivers (hardware ones gated by feature)
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplayCapabilities, DisplayDriver, DisplayRenderer};
pub use error::{DisplayError, DisplayFactoryError};
pub use factory::{BoxedRenderer, DisplayRendererFactory};
pub use log_renderer::LogRenderer;
pub use panel::PanelRenderer;
