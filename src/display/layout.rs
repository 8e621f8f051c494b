/*
 *  display/layout.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Fixed dashboard layout for the 800x480 panel
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

use embedded_graphics::prelude::{Point, Size};

use crate::constants::{CANVAS_HEIGHT, CANVAS_WIDTH};

/// Where every dashboard element goes.
///
/// All positions are top-left corners in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardLayout {
    /// Canvas size
    pub canvas: Size,

    /// Anchor of the direction triangle, which spans 65x50 from here
    pub triangle: Point,

    /// Triangle extent
    pub triangle_size: Size,

    /// Ticker, bold
    pub symbol: Point,

    /// Symbol text scale
    pub symbol_scale: u32,

    /// Company name, wrapped inside `full_name_box`
    pub full_name: Point,
    pub full_name_box: Size,

    /// Latest price, bold
    pub price: Point,

    /// Price text scale
    pub price_scale: u32,

    /// "{change} ({pct}%)"
    pub change: Point,

    /// Market Open / Market Closed
    pub market: Point,

    /// Previous close, open, high, low and volume, one per line
    pub details: Point,

    /// Vertical distance between detail lines
    pub detail_line_height: i32,

    /// Trend chart blit position
    pub chart: Point,

    /// Date and time label
    pub clock: Point,

    /// Temperature label
    pub temperature: Point,
}

impl DashboardLayout {
    /// Layout of the 7.3" panel.
    pub const fn standard() -> Self {
        DashboardLayout {
            canvas: Size::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            triangle: Point::new(49, 43),
            triangle_size: Size::new(65, 50),
            symbol: Point::new(130, 35),
            symbol_scale: 2,
            full_name: Point::new(300, 43),
            full_name_box: Size::new(480, 40),
            price: Point::new(45, 92),
            price_scale: 4,
            change: Point::new(580, 124),
            market: Point::new(580, 161),
            details: Point::new(47, 257),
            detail_line_height: 30,
            chart: Point::new(370, 235),
            clock: Point::new(580, 20),
            temperature: Point::new(580, 55),
        }
    }

    /// Corners of the up triangle, apex at the top.
    pub fn up_triangle(&self) -> [Point; 3] {
        let (x, y) = (self.triangle.x, self.triangle.y);
        let (w, h) = (self.triangle_size.width as i32, self.triangle_size.height as i32);
        [Point::new(x, y + h), Point::new(x + w / 2, y), Point::new(x + w, y + h)]
    }

    /// Corners of the down triangle, apex at the bottom.
    pub fn down_triangle(&self) -> [Point; 3] {
        let (x, y) = (self.triangle.x, self.triangle.y);
        let (w, h) = (self.triangle_size.width as i32, self.triangle_size.height as i32);
        [Point::new(x, y), Point::new(x + w / 2, y + h), Point::new(x + w, y)]
    }
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self::standard()
    }
}
