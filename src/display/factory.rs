/*
 *  display/factory.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Picks the panel driver from the resolved settings
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

use crate::config::{DisplaySettings, DriverKind};
use crate::display::drivers::mock::MockDriver;
use crate::display::error::DisplayError;
use crate::display::traits::DisplayDriver;
use log::info;

#[cfg(feature = "epd7in3e")]
use crate::display::drivers::epd7in3e::Epd7in3eDriver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create the configured driver, opening its bus but not initializing it.
    ///
    /// `init()` runs later, during startup verification.
    pub fn create_from_config(settings: &DisplaySettings) -> Result<BoxedDriver, DisplayError> {
        match settings.driver {
            DriverKind::Mock => {
                info!("Using mock display, no hardware will be touched");
                Ok(Box::new(MockDriver::new(settings)?))
            }

            #[cfg(feature = "epd7in3e")]
            DriverKind::Epd7in3e => Ok(Box::new(Epd7in3eDriver::new_spi(settings)?)),

            #[cfg(not(feature = "epd7in3e"))]
            DriverKind::Epd7in3e => Err(DisplayError::InvalidConfiguration(
                "epd7in3e driver not enabled. Enable with --features epd7in3e".to_string(),
            )),
        }
    }
}
