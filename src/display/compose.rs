/*
 *  display/compose.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Dashboard composition, one frame per symbol
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

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use embedded_graphics::{
    image::Image,
    mono_font::{iso_8859_1::FONT_10X20, MonoFont},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
};
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use log::{debug, warn};
use tinybmp::Bmp;

use crate::config::{FontSettings, Resolution};
use crate::display::color::PanelColor;
use crate::display::error::ComposeError;
use crate::display::frame::DisplayFrame;
use crate::display::layout::DashboardLayout;
use crate::draw;
use crate::quote::SymbolRecord;
use crate::vframebuf::VarFrameBuf;
use crate::weather::WeatherReading;

/// Direction of the change indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Up,
    Down,
}

impl ChangeDirection {
    /// Down only when both the change and the percentage are negative.
    pub fn from_change(change: f64, percent_change: f64) -> Self {
        if change < 0.0 && percent_change < 0.0 {
            ChangeDirection::Down
        } else {
            ChangeDirection::Up
        }
    }

    pub fn ink(self) -> PanelColor {
        match self {
            ChangeDirection::Up => PanelColor::Green,
            ChangeDirection::Down => PanelColor::Red,
        }
    }
}

/// What the composer knows about one pass besides the record
#[derive(Debug, Clone, Copy, Default)]
pub struct Annotations<'a> {
    /// `None` leaves the market label off
    pub market_open: Option<bool>,
    /// Last good reading, shown as `--°C` when absent
    pub weather: Option<&'a WeatherReading>,
}

/// Lays out a `SymbolRecord` and its chart on the panel canvas.
pub struct DashboardComposer {
    layout: DashboardLayout,
    light: &'static MonoFont<'static>,
    bold: &'static MonoFont<'static>,
    chart_size: Size,
    timezone: Option<Tz>,
    show_temperature: bool,
}

fn resolve_font(name: &str) -> &'static MonoFont<'static> {
    draw::mono_font(name).unwrap_or_else(|| {
        warn!("Unknown font '{}', using 10x20", name);
        &FONT_10X20
    })
}

fn draw_err(e: core::convert::Infallible) -> ComposeError {
    ComposeError::Draw(format!("{:?}", e))
}

impl DashboardComposer {
    /// `timezone` formats the clock label, local time when `None`.
    pub fn new(fonts: &FontSettings, chart: Resolution, timezone: Option<Tz>, show_temperature: bool) -> Self {
        DashboardComposer {
            layout: DashboardLayout::standard(),
            light: resolve_font(&fonts.light),
            bold: resolve_font(&fonts.bold),
            chart_size: Size::new(chart.width, chart.height),
            timezone,
            show_temperature,
        }
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.layout
    }

    /// Compose one frame.
    ///
    /// `chart` is the artifact to blit; `None` draws the degraded layout
    /// with a placeholder. A chart path that does not exist is reported as
    /// `MissingArtifact` and nothing is drawn.
    pub fn compose(
        &self,
        record: &SymbolRecord,
        chart: Option<&Path>,
        notes: Annotations<'_>,
        now: DateTime<Utc>,
    ) -> Result<DisplayFrame, ComposeError> {
        let chart_data = match chart {
            Some(path) => Some(read_artifact(path)?),
            None => None,
        };

        let l = &self.layout;
        let black = PanelColor::Black.rgb();
        let mut canvas = VarFrameBuf::new(l.canvas.width, l.canvas.height, PanelColor::White.rgb());

        let direction = ChangeDirection::from_change(record.change, record.percent_change);
        let corners = match direction {
            ChangeDirection::Up => l.up_triangle(),
            ChangeDirection::Down => l.down_triangle(),
        };
        draw::fill_triangle(&mut canvas, corners, direction.ink().rgb()).map_err(draw_err)?;
        draw::draw_text(
            &mut canvas,
            &format!("{:.2} ({:.2}%)", record.change, record.percent_change),
            l.change.x,
            l.change.y,
            self.light,
            direction.ink().rgb(),
        )
        .map_err(draw_err)?;

        draw::draw_text_scaled(&mut canvas, &record.symbol, l.symbol, self.bold, l.symbol_scale, black).map_err(draw_err)?;
        draw::draw_text_region_align(
            &mut canvas,
            &record.full_name,
            l.full_name,
            l.full_name_box,
            HorizontalAlignment::Left,
            VerticalAlignment::Top,
            self.light,
            black,
        )
        .map_err(draw_err)?;
        draw::draw_text_scaled(&mut canvas, &format!("{:.2}", record.latest_price), l.price, self.bold, l.price_scale, black)
            .map_err(draw_err)?;

        if let Some(open) = notes.market_open {
            let (label, ink) = if open {
                ("Market Open", PanelColor::Green)
            } else {
                ("Market Closed", PanelColor::Red)
            };
            draw::draw_text(&mut canvas, label, l.market.x, l.market.y, self.light, ink.rgb()).map_err(draw_err)?;
        }

        let details = [
            format!("Previous Close: ${:.2}", record.previous_close),
            format!("Open: ${:.2}", record.open),
            format!("High: ${:.2}", record.high),
            format!("Low: ${:.2}", record.low),
            format!("Volume: {}", record.volume),
        ];
        for (i, line) in details.iter().enumerate() {
            let y = l.details.y + i as i32 * l.detail_line_height;
            draw::draw_text(&mut canvas, line, l.details.x, y, self.light, black).map_err(draw_err)?;
        }

        let stamp = match self.timezone {
            Some(tz) => now.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string(),
            None => now.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        };
        draw::draw_text(&mut canvas, &stamp, l.clock.x, l.clock.y, self.light, black).map_err(draw_err)?;

        if self.show_temperature {
            let label = match notes.weather {
                Some(reading) => format!("{}°C", reading.temperature_c),
                None => "--°C".to_string(),
            };
            draw::draw_text(&mut canvas, &label, l.temperature.x, l.temperature.y, self.light, black).map_err(draw_err)?;
        }

        let degraded = match &chart_data {
            Some(data) => {
                let path = chart.unwrap_or(Path::new(""));
                let bmp = Bmp::<Rgb888>::from_slice(data).map_err(|e| ComposeError::InvalidArtifact {
                    path: path.to_path_buf(),
                    reason: format!("{:?}", e),
                })?;
                Image::new(&bmp, l.chart).draw(&mut canvas).map_err(draw_err)?;
                false
            }
            None => {
                self.draw_chart_placeholder(&mut canvas)?;
                true
            }
        };

        debug!("Composed {} (degraded: {})", record.symbol, degraded);
        Ok(DisplayFrame::new(canvas, &record.symbol, now.with_timezone(&Local), degraded))
    }

    fn draw_chart_placeholder(&self, canvas: &mut VarFrameBuf<Rgb888>) -> Result<(), ComposeError> {
        let region = Rectangle::new(self.layout.chart, self.chart_size);
        draw::draw_frame(canvas, region, PanelColor::Black.rgb(), 2).map_err(draw_err)?;
        draw::draw_text_region_align(
            canvas,
            "chart unavailable",
            region.top_left,
            region.size,
            HorizontalAlignment::Center,
            VerticalAlignment::Middle,
            self.light,
            PanelColor::Black.rgb(),
        )
        .map_err(draw_err)
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ComposeError> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ComposeError::MissingArtifact(path.to_path_buf())
        } else {
            ComposeError::InvalidArtifact { path: path.to_path_buf(), reason: e.to_string() }
        }
    })
}
