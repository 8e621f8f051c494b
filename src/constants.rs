/*
 *  constants.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
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

//! Global constants shared by the composer, the chart generator and the drivers.

/// The total width of the dashboard canvas in pixels.
pub const CANVAS_WIDTH: u32 = 800;
/// The total height of the dashboard canvas in pixels.
pub const CANVAS_HEIGHT: u32 = 480;

/// Full resolution plot before it is resized for the dashboard (10x5 inch figure).
pub const PLOT_WIDTH: u32 = 1000;
pub const PLOT_HEIGHT: u32 = 500;

/// Chart artifact file extension (the resized, composable bitmap).
pub const ARTIFACT_EXT: &str = "bmp";
/// Intermediate full resolution plot extension.
pub const PLOT_EXT: &str = "png";
/// Suffix used while an artifact is being written.
pub const PARTIAL_EXT: &str = "tmp";

/// Identifies us to the quote and weather endpoints.
pub const USER_AGENT: &str = concat!("LyTicker v", env!("CARGO_PKG_VERSION"));

// network reachability probe
pub const PROBE_HOST: &str = "www.google.com";
pub const PROBE_PORT: u16 = 80;
pub const PROBE_TIMEOUT_SECS: u64 = 5;

// defaults applied when the YAML and the CLI are silent
pub const DEFAULT_TREND_DAYS: u32 = 30;
pub const DEFAULT_REFRESH_SECONDS: u64 = 60;
pub const DEFAULT_GRAPH_PATH: &str = "./graphs";
pub const DEFAULT_TREND_RESOLUTION: (u32, u32) = (400, 225);
pub const DEFAULT_WEATHER_REFRESH_HOURS: f64 = 1.0;
pub const DEFAULT_MARKET: &str = "NYSE";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
