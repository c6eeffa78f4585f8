//! Text rendering: UTF-8 decoding, glyph rasterization and compositing, and
//! the scrolling message line.

pub mod glyph;
pub mod scroll;
pub mod utf8;

pub use glyph::{FontFace, GlyphError, GlyphRasterizer};
pub use scroll::{LineRenderer, Pen, ScrollCursor};
