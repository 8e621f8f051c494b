/*
 *  display/color.rs
 *
 *  LyTicker - ticks on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Six ink palette of the e-paper panel
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

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// Panel ink
///
/// The dashboard is drawn in Rgb888 using only these inks, anything else
/// (the resized chart) is snapped to the nearest ink when packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelColor {
    Black,
    White,
    Yellow,
    Red,
    Blue,
    Green,
}

impl PanelColor {
    pub const ALL: [PanelColor; 6] = [
        PanelColor::Black,
        PanelColor::White,
        PanelColor::Yellow,
        PanelColor::Red,
        PanelColor::Blue,
        PanelColor::Green,
    ];

    /// Drawing color for this ink
    pub const fn rgb(self) -> Rgb888 {
        match self {
            PanelColor::Black => Rgb888::new(0, 0, 0),
            PanelColor::White => Rgb888::new(255, 255, 255),
            PanelColor::Yellow => Rgb888::new(255, 255, 0),
            PanelColor::Red => Rgb888::new(255, 0, 0),
            PanelColor::Blue => Rgb888::new(0, 0, 255),
            PanelColor::Green => Rgb888::new(0, 255, 0),
        }
    }

    /// Controller nibble, 0x4 is unused on the 7.3" (E)
    pub const fn code(self) -> u8 {
        match self {
            PanelColor::Black => 0x0,
            PanelColor::White => 0x1,
            PanelColor::Yellow => 0x2,
            PanelColor::Red => 0x3,
            PanelColor::Blue => 0x5,
            PanelColor::Green => 0x6,
        }
    }

    /// Closest ink by squared RGB distance
    pub fn nearest(c: Rgb888) -> PanelColor {
        let dist = |p: PanelColor| {
            let q = p.rgb();
            let dr = c.r() as i32 - q.r() as i32;
            let dg = c.g() as i32 - q.g() as i32;
            let db = c.b() as i32 - q.b() as i32;
            dr * dr + dg * dg + db * db
        };
        Self::ALL
            .into_iter()
            .min_by_key(|&p| dist(p))
            .unwrap_or(PanelColor::White)
    }
}

impl From<PanelColor> for Rgb888 {
    fn from(c: PanelColor) -> Self {
        c.rgb()
    }
}
