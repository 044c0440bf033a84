/*
 *  display/error.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for panel drivers and renderer construction
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

use std::error::Error;
use std::fmt;

/// What a panel driver can fail with.
#[derive(Debug)]
pub enum DisplayError {
    /// The bus device could not be opened
    Bus(String),

    /// A panel size the driver cannot drive
    Size { width: u32, height: u32 },

    /// The panel has no such control
    Unsupported(&'static str),

    Rotation(u16),

    /// Controller rejected a command or data write
    Interface(display_interface::DisplayError),

    /// Snapshot file could not be written
    Io(std::io::Error),

    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Bus(msg) => write!(f, "panel bus: {}", msg),
            DisplayError::Size { width, height } => {
                write!(f, "panel size {}x{} is not supported", width, height)
            }
            DisplayError::Unsupported(what) => write!(f, "panel has no {} control", what),
            DisplayError::Rotation(degrees) => {
                write!(f, "rotation {} is not a quarter turn", degrees)
            }
            // display_interface errors carry no Display impl
            DisplayError::Interface(err) => write!(f, "panel controller: {:?}", err),
            DisplayError::Io(err) => write!(f, "snapshot write: {}", err),
            DisplayError::Other(msg) => f.write_str(msg),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::Interface(err)
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Io(err)
    }
}

/// Why no renderer could be built at start-up.
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// A hardware panel was chosen without a `bus` section
    NoBus,

    /// The panel was found but would not come up
    Panel(DisplayError),

    Config(String),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayFactoryError::NoBus => write!(f, "display driver needs a bus section"),
            DisplayFactoryError::Panel(err) => write!(f, "panel start-up failed: {}", err),
            DisplayFactoryError::Config(msg) => write!(f, "display config: {}", msg),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayFactoryError::Panel(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        DisplayFactoryError::Panel(err)
    }
}
