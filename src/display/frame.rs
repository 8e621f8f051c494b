/*
 *  display/frame.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  A composed dashboard image ready for the panel
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

use chrono::{DateTime, Local};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::bmp;
use crate::display::color::PanelColor;
use crate::vframebuf::VarFrameBuf;

/// Composed frame, owned by the loop until pushed
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    canvas: VarFrameBuf<Rgb888>,
    symbol: String,
    composed_at: DateTime<Local>,
    degraded: bool,
}

impl DisplayFrame {
    pub fn new(canvas: VarFrameBuf<Rgb888>, symbol: &str, composed_at: DateTime<Local>, degraded: bool) -> Self {
        Self { canvas, symbol: symbol.to_string(), composed_at, degraded }
    }

    pub fn width(&self) -> u32 { self.canvas.width() as u32 }
    pub fn height(&self) -> u32 { self.canvas.height() as u32 }
    pub fn symbol(&self) -> &str { &self.symbol }
    pub fn composed_at(&self) -> DateTime<Local> { self.composed_at }

    /// True when drawn without a chart
    pub fn is_degraded(&self) -> bool { self.degraded }

    pub fn canvas(&self) -> &VarFrameBuf<Rgb888> { &self.canvas }

    /// Ink at (x,y)
    pub fn ink_at(&self, x: u32, y: u32) -> Option<PanelColor> {
        self.canvas.pixel(x, y).map(PanelColor::nearest)
    }

    /// Pack to the 4bpp controller format, left pixel in the high nibble.
    pub fn to_panel_buffer(&self) -> Vec<u8> {
        let w = self.canvas.width();
        let mut out = Vec::with_capacity(w.div_ceil(2) * self.canvas.height());
        for row in self.canvas.rows() {
            for pair in row.chunks(2) {
                let hi = PanelColor::nearest(pair[0]).code();
                let lo = pair.get(1).map_or(PanelColor::White.code(), |&c| PanelColor::nearest(c).code());
                out.push((hi << 4) | lo);
            }
        }
        out
    }

    /// 24-bit BMP of the frame as the panel would show it
    pub fn to_bmp(&self) -> Vec<u8> {
        let px: Vec<[u8; 3]> = self
            .canvas
            .as_slice()
            .iter()
            .map(|&c| {
                let ink = PanelColor::nearest(c).rgb();
                [ink.r(), ink.g(), ink.b()]
            })
            .collect();
        bmp::encode_rgb24(self.width(), self.height(), &px)
    }
}
