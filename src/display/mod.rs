/*
 *  display/mod.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Display subsystem - composition, frames and panel drivers
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

// Core trait definitions
pub mod traits;
pub mod error;
pub mod factory;
pub mod color;
pub mod frame;

// Panel drivers, the e-paper one behind the epd7in3e feature
pub mod drivers;

// Fixed dashboard layout and the composer that fills it
pub mod layout;
pub mod compose;

// Re-exports for convenience
pub use traits::{DisplayDriver, DisplayCapabilities, ColorDepth};
pub use error::{ComposeError, DisplayError};
pub use factory::{DisplayDriverFactory, BoxedDriver};
pub use color::PanelColor;
pub use frame::DisplayFrame;
pub use layout::DashboardLayout;
pub use compose::{Annotations, ChangeDirection, DashboardComposer};
pub use drivers::mock::{DisplayOp, MockDriver};

#[cfg(feature = "epd7in3e")]
pub use drivers::epd7in3e::Epd7in3eDriver;
