//! Clipped copy of BGRA bitmaps into the framebuffer.

use super::framebuffer::{encode, Framebuffer, BYTES_PER_PIXEL};

/// Bytes per source pixel (blue, green, red, alpha).
const SOURCE_BYTES_PER_PIXEL: usize = 4;

/// A borrowed BGRA bitmap.
///
/// Rows are `stride` bytes apart, which may be more than `width * 4`.
/// Alpha is ignored: the bitmap is expected to be composited against the
/// background already.
#[derive(Debug, Clone, Copy)]
pub struct SourceBitmap<'a> {
    pub pixels: &'a [u8],
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl<'a> SourceBitmap<'a> {
    /// Describes a tightly packed bitmap.
    pub fn packed(pixels: &'a [u8], width: usize, height: usize) -> Self {
        Self {
            pixels,
            width,
            height,
            stride: width * SOURCE_BYTES_PER_PIXEL,
        }
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Framebuffer {
    /// Copies `source` into the framebuffer with its pixel
    /// `(offset_x, offset_y)` landing at `(x, y)`.
    ///
    /// Returns true when the copy was cut short at the right or bottom edge
    /// of the canvas (or the source ran out of bytes). Parts left of or above
    /// the canvas are skipped without counting as truncation, so a glyph with
    /// a negative bearing at the start of a line still renders.
    pub fn blit_bgra(
        &mut self,
        x: i32,
        y: i32,
        offset_x: usize,
        offset_y: usize,
        source: &SourceBitmap<'_>,
    ) -> bool {
        let canvas_width = i64::from(self.width());
        let canvas_height = i64::from(self.height());
        let (x, y) = (i64::from(x), i64::from(y));

        if x >= canvas_width || y >= canvas_height {
            return true;
        }

        let mut truncated = false;
        let mut width = to_i64(source.width);
        let mut height = to_i64(source.height);

        if y.saturating_add(height) > canvas_height {
            height = canvas_height - y;
            truncated = true;
        }
        if x.saturating_add(width) > canvas_width {
            width = canvas_width - x;
            truncated = true;
        }

        // Source pixel (c, r) lands on (x + c - offset_x, y + r - offset_y).
        let first_col = to_i64(offset_x).saturating_add((-x).max(0));
        let first_row = to_i64(offset_y).saturating_add((-y).max(0));
        if first_col >= width || first_row >= height {
            return truncated;
        }

        let cols = (width - first_col) as usize;
        let dest_x = x.max(0) as usize;
        let mut dest_y = y.max(0) as usize;
        let row_len = self.row_len();
        let skip = first_col as usize * SOURCE_BYTES_PER_PIXEL;
        let span = cols * SOURCE_BYTES_PER_PIXEL;

        for row in first_row as usize..height as usize {
            let source_row = row
                .checked_mul(source.stride)
                .and_then(|start| start.checked_add(skip))
                .and_then(|start| Some(start..start.checked_add(span)?))
                .and_then(|range| source.pixels.get(range));
            let Some(source_row) = source_row else {
                return true;
            };

            let start = dest_y * row_len + dest_x * BYTES_PER_PIXEL;
            let dest_row = &mut self.data_mut()[start..start + cols * BYTES_PER_PIXEL];
            for (dest, bgra) in dest_row
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(source_row.chunks_exact(SOURCE_BYTES_PER_PIXEL))
            {
                dest.copy_from_slice(&encode(bgra[2], bgra[1], bgra[0]));
            }
            dest_y += 1;
        }

        truncated
    }
}
