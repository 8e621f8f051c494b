/*
 *  chart.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Closing price trend chart, plotted as SVG and resampled to a bitmap
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

//! Trend chart artifacts.
//!
//! For each symbol two files are produced in the output directory: the full
//! resolution plot `<symbol>.png` and the resized `<symbol>.bmp` that the
//! composer blits onto the dashboard. Both are written to a `.tmp` sibling
//! first and renamed into place, so a reader never sees a partial file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info, warn};
use usvg::Options as ResvgUsvgOptions;
use thiserror::Error;

use crate::bmp;
use crate::config::Resolution;
use crate::constants::{ARTIFACT_EXT, PARTIAL_EXT, PLOT_EXT, PLOT_HEIGHT, PLOT_WIDTH};
use crate::func_timer::FunctionTimer;
use crate::quote::{ClosePoint, QuoteError, StockSource};
use crate::svgimage::{self, SvgImageError, SvgImageRenderer};

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no price history for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
    #[error("invalid date range {start} .. {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid chart resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("chart render failed: {0}")]
    Render(String),
    #[error("chart I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SvgImageError> for ChartError {
    fn from(err: SvgImageError) -> Self {
        ChartError::Render(err.to_string())
    }
}

/// A bitmap on disk for one symbol and date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendChartArtifact {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolution: Resolution,
    pub path: PathBuf,
    pub plot_path: PathBuf,
}

/// `<dir>/<symbol>.bmp`
pub fn artifact_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}.{}", symbol, ARTIFACT_EXT))
}

/// `<dir>/<symbol>.png`
pub fn plot_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}.{}", symbol, PLOT_EXT))
}

/// Write to a sibling temp file then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".");
    partial.push(PARTIAL_EXT);
    let partial = PathBuf::from(partial);
    fs::write(&partial, bytes)?;
    fs::rename(&partial, path).inspect_err(|_| {
        let _ = fs::remove_file(&partial);
    })
}

/// Delete every regular file in `dir`, returns the number removed.
///
/// A missing directory counts as already empty. A file that cannot be
/// removed does not stop the sweep; the first such error is returned.
pub fn remove_artifacts(dir: &Path) -> std::io::Result<usize> {
    remove_files_with(dir, |path| fs::remove_file(path))
}

fn remove_files_with<F>(dir: &Path, mut remove: F) -> std::io::Result<usize>
where
    F: FnMut(&Path) -> std::io::Result<()>,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    let mut first_error = None;
    for entry in entries {
        let outcome = entry.and_then(|entry| {
            if !entry.file_type()?.is_file() {
                return Ok(false);
            }
            let path = entry.path();
            remove(&path).map(|()| true).inspect_err(|e| warn!("Could not remove {}: {}", path.display(), e))
        });
        match outcome {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(removed),
    }
}

// plot area inside the PLOT_WIDTH x PLOT_HEIGHT document
const LEFT: f64 = 90.0;
const RIGHT: f64 = 20.0;
const TOP: f64 = 20.0;
const BOTTOM: f64 = 30.0;
const GRID_LINES: usize = 5;
const LINE_COLOR: &str = "#1f77b4";
const GRID_COLOR: &str = "#D9D9D9";

fn price_bounds(closes: &[ClosePoint]) -> (f64, f64) {
    let lo = closes.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let hi = closes.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);
    if (hi - lo).abs() < f64::EPSILON {
        let pad = (lo.abs() * 0.01).max(1.0);
        return (lo - pad, hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// The close price plot as an SVG document.
pub fn build_svg(closes: &[ClosePoint]) -> String {
    let (w, h) = (PLOT_WIDTH as f64, PLOT_HEIGHT as f64);
    let (plot_w, plot_h) = (w - LEFT - RIGHT, h - TOP - BOTTOM);
    let (lo, hi) = price_bounds(closes);
    let y_of = |v: f64| TOP + (hi - v) / (hi - lo) * plot_h;

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(svg, r##"<rect width="{w}" height="{h}" fill="#ffffff"/>"##);

    for i in 0..=GRID_LINES {
        let v = lo + (hi - lo) * i as f64 / GRID_LINES as f64;
        let y = y_of(v);
        let _ = write!(
            svg,
            r#"<line x1="{LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID_COLOR}" stroke-width="1.5" stroke-dasharray="8,6"/>"#,
            LEFT + plot_w
        );
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="16" text-anchor="end" fill="#333333">{v:.2}</text>"##,
            LEFT - 8.0,
            y + 5.0
        );
    }
    let _ = write!(
        svg,
        r##"<text transform="translate(22 {:.1}) rotate(-90)" font-family="sans-serif" font-size="16" text-anchor="middle" fill="#333333">Price (USD)</text>"##,
        TOP + plot_h / 2.0
    );
    let _ = write!(
        svg,
        r##"<rect x="{LEFT}" y="{TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#000000" stroke-width="1"/>"##
    );

    let points: Vec<(f64, f64)> = match closes {
        [] => Vec::new(),
        [only] => vec![(LEFT, y_of(only.close)), (LEFT + plot_w, y_of(only.close))],
        [first, .., last] => {
            let span = (last.date - first.date).num_days().max(1) as f64;
            closes
                .iter()
                .map(|p| {
                    let x = LEFT + (p.date - first.date).num_days() as f64 / span * plot_w;
                    (x, y_of(p.close))
                })
                .collect()
        }
    };
    if !points.is_empty() {
        svg.push_str(r#"<polyline fill="none" stroke=""#);
        svg.push_str(LINE_COLOR);
        svg.push_str(r#"" stroke-width="3" stroke-linejoin="round" points=""#);
        for (x, y) in &points {
            let _ = write!(svg, "{x:.1},{y:.1} ");
        }
        svg.push_str(r#""/>"#);
    }

    // legend, upper left
    let (lx, ly) = (LEFT + 12.0, TOP + 12.0);
    let _ = write!(
        svg,
        r##"<rect x="{lx}" y="{ly}" width="150" height="32" fill="#ffffff" stroke="#cccccc"/><line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{LINE_COLOR}" stroke-width="3"/><text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="16" fill="#000000">Close Price</text>"##,
        lx + 8.0,
        ly + 16.0,
        lx + 38.0,
        ly + 16.0,
        lx + 46.0,
        ly + 22.0
    );
    svg.push_str("</svg>");
    svg
}

/// Encoded outputs of one chart render.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub plot_png: Vec<u8>,
    pub bitmap: Vec<u8>,
}

/// Plot `closes` at full size and resample to `resolution`.
pub fn render_closes(
    closes: &[ClosePoint],
    resolution: Resolution,
    options: &ResvgUsvgOptions,
) -> Result<RenderedChart, ChartError> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(ChartError::InvalidResolution { width: resolution.width, height: resolution.height });
    }
    let svg = build_svg(closes);
    let full = SvgImageRenderer::new(&svg, PLOT_WIDTH, PLOT_HEIGHT, options)?.render_pixmap()?;
    let plot_png = full.encode_png().map_err(|e| ChartError::Render(e.to_string()))?;

    let small = svgimage::resize_pixmap(&full, resolution.width, resolution.height)?;
    let bitmap = bmp::encode_rgb24(resolution.width, resolution.height, &svgimage::pixmap_rgb(&small));
    Ok(RenderedChart { plot_png, bitmap })
}

/// Produces the per-symbol chart artifacts.
pub struct TrendChartGenerator {
    options: ResvgUsvgOptions<'static>,
}

impl Default for TrendChartGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendChartGenerator {
    pub fn new() -> Self {
        Self { options: svgimage::default_options() }
    }

    /// Fetch closes for `start <= d < end` and write `<output_dir>/<symbol>.bmp`.
    ///
    /// On any error the previous artifact, if there is one, is left untouched.
    pub async fn generate<S: StockSource>(
        &self,
        source: &S,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        output_dir: &Path,
        resolution: Resolution,
    ) -> Result<TrendChartArtifact, ChartError> {
        let _timer = FunctionTimer::new("TrendChartGenerator::generate");
        if start >= end {
            return Err(ChartError::InvalidRange { start, end });
        }
        if resolution.width == 0 || resolution.height == 0 {
            return Err(ChartError::InvalidResolution { width: resolution.width, height: resolution.height });
        }

        let closes = source.fetch_closes(symbol, start, end).await.map_err(|e| match e {
            QuoteError::DataUnavailable { reason, .. } => {
                ChartError::DataUnavailable { symbol: symbol.to_string(), reason }
            }
            other => ChartError::DataUnavailable { symbol: symbol.to_string(), reason: other.to_string() },
        })?;
        if closes.is_empty() {
            return Err(ChartError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no closes between {} and {}", start, end),
            });
        }
        debug!("{}: {} closes from {} to {}", symbol, closes.len(), start, end);

        let rendered = render_closes(&closes, resolution, &self.options)?;

        fs::create_dir_all(output_dir)?;
        let plot = plot_path(output_dir, symbol);
        let path = artifact_path(output_dir, symbol);
        write_atomic(&plot, &rendered.plot_png)?;
        write_atomic(&path, &rendered.bitmap)?;
        info!("Graph for {} generated: {}", symbol, path.display());

        Ok(TrendChartArtifact {
            symbol: symbol.to_string(),
            start,
            end,
            resolution,
            path,
            plot_path: plot,
        })
    }
}
