/*
 *  svgimage.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	SVG to RGBA pixmap rendering, and pixmap resampling
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

//! Rendering of generated SVG documents with `usvg` + `resvg`.
//!
//! The output is a full colour `tiny_skia::Pixmap`, later resampled and
//! written out as a bitmap for the dashboard.

use resvg::render;
use usvg::{Options as ResvgUsvgOptions, Transform, Tree as ResvgTree};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint};
use log::debug;
use std::error::Error;
use std::fmt;

/// Custom error type for SVG rendering operations.
#[derive(Debug)]
pub enum SvgImageError {
    /// Error parsing the SVG data.
    SvgParseError(String),
    /// Error creating a pixmap for rendering.
    PixmapCreationError(String),
}

impl fmt::Display for SvgImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgImageError::SvgParseError(msg) => write!(f, "SVG parse error: {}", msg),
            SvgImageError::PixmapCreationError(msg) => write!(f, "Pixmap creation error: {}", msg),
        }
    }
}

impl Error for SvgImageError {}

/// Options with the system fonts loaded, text in the SVG needs them.
pub fn default_options() -> ResvgUsvgOptions<'static> {
    let mut opts = ResvgUsvgOptions::default();
    opts.fontdb_mut().load_system_fonts();
    debug!("loaded {} font faces", opts.fontdb.len());
    opts
}

/// Renders SVG data to an RGBA pixmap.
#[derive(Debug)]
pub struct SvgImageRenderer {
    tree: ResvgTree,
    target_width: u32,
    target_height: u32,
}

impl SvgImageRenderer {
    /// Parse `svg_data`; it will be scaled to fit `target_width` x `target_height`.
    pub fn new(
        svg_data: &str,
        target_width: u32,
        target_height: u32,
        options: &ResvgUsvgOptions,
    ) -> Result<Self, SvgImageError> {
        let tree = ResvgTree::from_str(svg_data, options)
            .map_err(|e| SvgImageError::SvgParseError(format!("Failed to parse SVG: {:?}", e)))?;
        Ok(SvgImageRenderer {
            tree,
            target_width,
            target_height,
        })
    }

    pub fn render_pixmap(&self) -> Result<Pixmap, SvgImageError> {
        let mut pixmap = Pixmap::new(self.target_width, self.target_height).ok_or_else(|| {
            SvgImageError::PixmapCreationError(format!("{}x{}", self.target_width, self.target_height))
        })?;

        // the documents we render have their viewBox at the origin
        let svg_size = self.tree.size();
        let scale_x = self.target_width as f32 / svg_size.width();
        let scale_y = self.target_height as f32 / svg_size.height();
        render(&self.tree, Transform::from_scale(scale_x, scale_y), &mut pixmap.as_mut());

        debug!("SVG rendered to {}x{} pixmap", self.target_width, self.target_height);
        Ok(pixmap)
    }
}

/// Bicubic resample of `src` to exactly `width` x `height`.
pub fn resize_pixmap(src: &Pixmap, width: u32, height: u32) -> Result<Pixmap, SvgImageError> {
    let mut dst = Pixmap::new(width, height)
        .ok_or_else(|| SvgImageError::PixmapCreationError(format!("{}x{}", width, height)))?;
    let paint = PixmapPaint { quality: FilterQuality::Bicubic, ..PixmapPaint::default() };
    let transform = Transform::from_scale(
        width as f32 / src.width() as f32,
        height as f32 / src.height() as f32,
    );
    dst.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
    Ok(dst)
}

/// Flatten onto white and drop alpha, row-major.
pub fn pixmap_rgb(pixmap: &Pixmap) -> Vec<[u8; 3]> {
    pixmap
        .pixels()
        .iter()
        .map(|p| {
            // premultiplied, so over-white is c + (255 - a)
            let bg = 255 - p.alpha();
            [p.red().saturating_add(bg), p.green().saturating_add(bg), p.blue().saturating_add(bg)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50" viewBox="0 0 100 50">
        <rect width="100" height="50" fill="#ffffff"/><rect x="0" y="0" width="50" height="50" fill="#ff0000"/></svg>"##;

    #[test]
    fn test_render_scales_to_target() {
        let opts = ResvgUsvgOptions::default();
        let pixmap = SvgImageRenderer::new(SQUARE, 200, 100, &opts).unwrap().render_pixmap().unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (200, 100));
        let rgb = pixmap_rgb(&pixmap);
        assert_eq!(rgb[10], [255, 0, 0]);
        assert_eq!(rgb[190], [255, 255, 255]);
    }

    #[test]
    fn test_resize_exact_dimensions() {
        let opts = ResvgUsvgOptions::default();
        let pixmap = SvgImageRenderer::new(SQUARE, 100, 50, &opts).unwrap().render_pixmap().unwrap();
        let small = resize_pixmap(&pixmap, 33, 17).unwrap();
        assert_eq!((small.width(), small.height()), (33, 17));
    }

    #[test]
    fn test_bad_svg_is_parse_error() {
        let opts = ResvgUsvgOptions::default();
        assert!(matches!(
            SvgImageRenderer::new("<svg", 10, 10, &opts),
            Err(SvgImageError::SvgParseError(_))
        ));
    }

    #[test]
    fn test_transparent_flattens_to_white() {
        let pixmap = Pixmap::new(2, 2).unwrap();
        assert!(pixmap_rgb(&pixmap).iter().all(|p| *p == [255, 255, 255]));
    }
}
