//! Glyph rasterization using fontdue, and compositing to BGRA.

use fontdue::{Font, FontSettings};
use thiserror::Error;
use tracing::info;

use crate::config::FontConfig;
use crate::theme::Color;

/// Bytes per composited pixel.
pub const BGRA_BYTES: usize = 4;

/// Errors from glyph lookup and font loading.
#[derive(Debug, Error)]
pub enum GlyphError {
    /// The face has no outline for this codepoint.
    #[error("font has no glyph for U+{:04X}", u32::from(*.0))]
    Missing(char),

    /// Font file could not be read.
    #[error("cannot read font {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Font data could not be parsed.
    #[error("cannot parse font {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// An 8-bit coverage bitmap with its placement metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glyph {
    /// Coverage, 0 (background) to 255 (foreground).
    pub coverage: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Bytes between coverage rows.
    pub stride: usize,
    /// Pen position to left edge of the bitmap.
    pub left: i32,
    /// Baseline to top edge of the bitmap, positive upwards.
    pub top: i32,
    /// Horizontal pen advance in pixels.
    pub advance: i32,
}

/// Turns codepoints into coverage bitmaps.
pub trait GlyphRasterizer {
    fn rasterize(&self, ch: char) -> Result<Glyph, GlyphError>;
}

/// A font face rendered at one pixel size.
pub struct FontFace {
    font: Font,
    size: f32,
}

impl FontFace {
    /// Loads the face described by `config`.
    pub fn load(config: &FontConfig) -> Result<Self, GlyphError> {
        let data = std::fs::read(&config.path).map_err(|source| GlyphError::Read {
            path: config.path.clone(),
            source,
        })?;
        let settings = FontSettings {
            collection_index: config.index,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(data, settings).map_err(|reason| GlyphError::Parse {
            path: config.path.clone(),
            reason: reason.to_string(),
        })?;
        info!("Loaded font {} at {}px", config.path, config.size);
        Ok(Self {
            font,
            size: config.size,
        })
    }
}

impl GlyphRasterizer for FontFace {
    fn rasterize(&self, ch: char) -> Result<Glyph, GlyphError> {
        if self.font.lookup_glyph_index(ch) == 0 {
            return Err(GlyphError::Missing(ch));
        }
        let (metrics, coverage) = self.font.rasterize(ch, self.size);
        Ok(Glyph {
            coverage,
            width: metrics.width,
            height: metrics.height,
            stride: metrics.width,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            advance: metrics.advance_width.round() as i32,
        })
    }
}

/// Blends `glyph` over a solid background into a tightly packed BGRA
/// bitmap, reusing `out`'s allocation.
pub fn composite(glyph: &Glyph, foreground: Color, background: Color, out: &mut Vec<u8>) {
    out.clear();
    out.resize(glyph.width * glyph.height * BGRA_BYTES, 0);

    for (row, dest) in out
        .chunks_exact_mut(glyph.width.max(1) * BGRA_BYTES)
        .enumerate()
        .take(glyph.height)
    {
        let start = row * glyph.stride;
        let coverage = glyph
            .coverage
            .get(start..start + glyph.width)
            .unwrap_or(&[]);
        for (pixel, col) in dest.chunks_exact_mut(BGRA_BYTES).zip(0..glyph.width) {
            let alpha = coverage.get(col).copied().unwrap_or(0);
            pixel.copy_from_slice(&[
                blend(foreground.blue, background.blue, alpha),
                blend(foreground.green, background.green, alpha),
                blend(foreground.red, background.red, alpha),
                0xff,
            ]);
        }
    }
}

#[inline]
fn blend(foreground: u8, background: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    ((u32::from(foreground) * a + u32::from(background) * (255 - a) + 127) / 255) as u8
}
