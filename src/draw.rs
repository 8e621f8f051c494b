/*
 *  draw.rs
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

use embedded_graphics::{
    mono_font::{iso_8859_1, MonoFont, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::PixelColor,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment, Triangle},
    text::{Baseline, Text},
};

use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};

/// Resolve a font name such as `9x18_bold`; latin-1 so the degree sign renders.
pub fn mono_font(name: &str) -> Option<&'static MonoFont<'static>> {
    let font = match name.to_ascii_lowercase().as_str() {
        "6x10" => &iso_8859_1::FONT_6X10,
        "6x13" => &iso_8859_1::FONT_6X13,
        "6x13_bold" => &iso_8859_1::FONT_6X13_BOLD,
        "7x13" => &iso_8859_1::FONT_7X13,
        "7x13_bold" => &iso_8859_1::FONT_7X13_BOLD,
        "7x14" => &iso_8859_1::FONT_7X14,
        "7x14_bold" => &iso_8859_1::FONT_7X14_BOLD,
        "8x13" => &iso_8859_1::FONT_8X13,
        "8x13_bold" => &iso_8859_1::FONT_8X13_BOLD,
        "9x15" => &iso_8859_1::FONT_9X15,
        "9x15_bold" => &iso_8859_1::FONT_9X15_BOLD,
        "9x18" => &iso_8859_1::FONT_9X18,
        "9x18_bold" => &iso_8859_1::FONT_9X18_BOLD,
        "10x20" => &iso_8859_1::FONT_10X20,
        _ => return None,
    };
    Some(font)
}

/// Clears a rectangular region to `color`.
pub fn clear_region<D, C>(target: &mut D, region: Rectangle, color: C) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    target.fill_solid(&region, color)
}

pub fn draw_text<D, C>(target: &mut D, text: &str, x: i32, y: i32, font: &MonoFont, color: C) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    Text::with_baseline(
        text,
        Point::new(x, y),
        MonoTextStyleBuilder::new().font(font).text_color(color).build(),
        Baseline::Top,
    )
    .draw(target)?;
    Ok(())
}

/// Word wrapped text inside `size` at `top_left`, overflow is cut.
#[allow(clippy::too_many_arguments)]
pub fn draw_text_region_align<D, C>(
    target: &mut D,
    text: &str,
    top_left: Point,
    size: Size,
    halign: HorizontalAlignment,
    valign: VerticalAlignment,
    font: &MonoFont,
    color: C,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    let character_style = MonoTextStyle::new(font, color);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(halign)
        .vertical_alignment(valign)
        .build();
    let label_rect = Rectangle::new(top_left, size);
    TextBox::with_textbox_style(text, label_rect, character_style, textbox_style).draw(target)?;
    Ok(())
}

/// Text at `scale` times the font size; each font pixel becomes a square block.
pub fn draw_text_scaled<D, C>(
    target: &mut D,
    text: &str,
    top_left: Point,
    font: &MonoFont,
    scale: u32,
    color: C,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    let mut magnified = Magnify { target, origin: top_left, scale: scale.max(1) };
    draw_text(&mut magnified, text, top_left.x, top_left.y, font, color)
}

/// Filled triangle.
pub fn fill_triangle<D, C>(target: &mut D, points: [Point; 3], color: C) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    Triangle::new(points[0], points[1], points[2])
        .into_styled(PrimitiveStyleBuilder::new().fill_color(color).stroke_color(color).stroke_width(1).build())
        .draw(target)
}

/// Rectangle outline, drawn inside `region`.
pub fn draw_frame<D, C>(target: &mut D, region: Rectangle, color: C, stroke_width: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    region
        .into_styled(
            PrimitiveStyleBuilder::new()
                .stroke_color(color)
                .stroke_width(stroke_width)
                .stroke_alignment(StrokeAlignment::Inside)
                .build(),
        )
        .draw(target)
}

/// Width in pixels of `text` in a mono font, scaled.
pub fn text_width(text: &str, font: &MonoFont, scale: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    (n * font.character_size.width + (n - 1) * font.character_spacing) * scale.max(1)
}

// Draws every pixel as a scale x scale block, anchored at origin.
struct Magnify<'a, D> {
    target: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<D: DrawTarget> Dimensions for Magnify<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let bb = self.target.bounding_box();
        let s = self.scale;
        Rectangle::new(self.origin, Size::new(bb.size.width.div_ceil(s), bb.size.height.div_ceil(s)))
    }
}

impl<D: DrawTarget> DrawTarget for Magnify<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let s = self.scale as i32;
        for Pixel(p, color) in pixels {
            let top_left = self.origin + (p - self.origin) * s;
            self.target.fill_solid(&Rectangle::new(top_left, Size::new(self.scale, self.scale)), color)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vframebuf::VarFrameBuf;
    use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

    #[test]
    fn test_font_lookup() {
        assert!(mono_font("10x20").is_some());
        assert!(mono_font("9X18_BOLD").is_some());
        assert!(mono_font("comic-sans").is_none());
    }

    #[test]
    fn test_scaled_text_covers_scaled_box() {
        let font = mono_font("6x10").unwrap();
        let mut fb = VarFrameBuf::new(100, 60, Rgb888::WHITE);
        draw_text_scaled(&mut fb, "8", Point::new(10, 5), font, 3, Rgb888::BLACK).unwrap();

        let inked: Vec<(u32, u32)> = (0..60)
            .flat_map(|y| (0..100).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(Rgb888::BLACK))
            .collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(x, y)| (10..28).contains(&x) && (5..35).contains(&y)));
    }

    #[test]
    fn test_triangle_filled() {
        let mut fb = VarFrameBuf::new(80, 60, Rgb888::WHITE);
        fill_triangle(&mut fb, [Point::new(0, 50), Point::new(32, 0), Point::new(65, 50)], Rgb888::GREEN).unwrap();
        assert_eq!(fb.pixel(32, 40), Some(Rgb888::GREEN));
        assert_eq!(fb.pixel(2, 2), Some(Rgb888::WHITE));
    }

    #[test]
    fn test_text_width() {
        let font = mono_font("10x20").unwrap();
        assert_eq!(text_width("abc", font, 1), 30);
        assert_eq!(text_width("abc", font, 2), 60);
        assert_eq!(text_width("", font, 2), 0);
    }
}
