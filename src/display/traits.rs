/*
 *  display/traits.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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
use crate::display::frame::DisplayFrame;

/// Color depth capabilities of the supported panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// Six fixed inks, 4 bits per pixel on the wire
    /// Used by: Waveshare 7.3" (E) Spectra 6
    Palette6,

    /// Full 24-bit color, used by the mock panel
    Rgb888,
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Color depth
    pub color_depth: ColorDepth,

    /// Rough full refresh duration, e-paper panels are slow
    pub refresh_secs: u32,
}

impl DisplayCapabilities {
    /// Bytes in a packed panel buffer, two pixels per byte
    pub fn buffer_len(&self) -> usize {
        (self.width as usize).div_ceil(2) * self.height as usize
    }
}

/// Minimal hardware abstraction - all display drivers must implement this trait
///
/// Operations run in the order init, clear, any number of pushes, then
/// sleep and release_resources at shutdown.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the panel controller
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Blank the panel to white
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Write a packed 4bpp buffer and refresh the panel
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// Push a composed frame, one full refresh
    fn push(&mut self, frame: &DisplayFrame) -> Result<(), DisplayError> {
        let (w, h) = self.dimensions();
        if frame.width() != w || frame.height() != h {
            return Err(DisplayError::BufferSizeMismatch {
                expected: self.capabilities().buffer_len(),
                actual: frame.width().div_ceil(2) as usize * frame.height() as usize,
            });
        }
        self.write_buffer(&frame.to_panel_buffer())
    }

    /// Deep sleep, the image persists without power
    fn sleep(&mut self) -> Result<(), DisplayError>;

    /// Release bus and pin handles, power the panel down
    fn release_resources(&mut self) -> Result<(), DisplayError>;
}
