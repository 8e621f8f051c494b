/*
 *  bmp.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	Uncompressed 24-bit BMP writer, read back with tinybmp
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

const FILE_HEADER_LEN: u32 = 14;
const INFO_HEADER_LEN: u32 = 40;
// 2835 px/m ~ 72 dpi
const PELS_PER_METER: i32 = 2835;

/// Encode row-major RGB pixels as a bottom-up BITMAPINFOHEADER file.
///
/// `pixels` must hold exactly `width * height` entries.
pub fn encode_rgb24(width: u32, height: u32, pixels: &[[u8; 3]]) -> Vec<u8> {
    debug_assert_eq!(pixels.len(), (width * height) as usize);
    let row_len = (width * 3) as usize;
    let stride = (row_len + 3) & !3;
    let image_len = (stride * height as usize) as u32;
    let offset = FILE_HEADER_LEN + INFO_HEADER_LEN;

    let mut out = Vec::with_capacity((offset + image_len) as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + image_len).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());

    out.extend_from_slice(&INFO_HEADER_LEN.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // BI_RGB
    out.extend_from_slice(&image_len.to_le_bytes());
    out.extend_from_slice(&PELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&PELS_PER_METER.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let pad = stride - row_len;
    for row in pixels.chunks(width.max(1) as usize).rev() {
        for &[r, g, b] in row {
            out.extend_from_slice(&[b, g, r]);
        }
        out.extend(std::iter::repeat_n(0u8, pad));
    }
    out
}
