//! Single-line text drawing and the scroll cursor of the message line.

use lcd_clock_hw::{Framebuffer, SourceBitmap};
use tracing::debug;

use super::glyph::{composite, GlyphRasterizer, BGRA_BYTES};
use super::utf8::{decode_into, is_continuation};
use crate::theme::Color;

/// Where and in which colours a line is drawn. `y` is the baseline.
#[derive(Debug, Clone, Copy)]
pub struct Pen {
    pub x: i32,
    pub y: i32,
    pub foreground: Color,
    pub background: Color,
}

/// Draws lines of text into the framebuffer, reusing its decode and
/// compositing buffers between frames.
pub struct LineRenderer {
    chars: Vec<char>,
    scratch: Vec<u8>,
}

impl LineRenderer {
    /// `batch` is the most codepoints decoded for one line.
    pub fn new(batch: usize) -> Self {
        Self {
            chars: vec!['\0'; batch.max(1)],
            scratch: Vec::new(),
        }
    }

    /// Draws `text` with the first glyph shifted left by `pixel_offset`.
    ///
    /// Drawing stops after the first glyph that runs off the right or bottom
    /// edge. Returns true when the first glyph has scrolled far enough that
    /// the line should move on to the next character: what is left of its
    /// advance is no more than `increment`. An empty line and a first glyph
    /// the font cannot render also return true so the cursor never stalls.
    pub fn draw<R: GlyphRasterizer + ?Sized>(
        &mut self,
        framebuffer: &mut Framebuffer,
        font: &R,
        pen: Pen,
        text: &[u8],
        pixel_offset: i32,
        increment: i32,
    ) -> bool {
        let (count, _) = decode_into(text, &mut self.chars);
        if count == 0 {
            return true;
        }

        let mut x = pen.x;
        let mut offset = pixel_offset;
        let mut wrap_ready = false;

        for (n, &ch) in self.chars[..count].iter().enumerate() {
            let glyph = match font.rasterize(ch) {
                Ok(glyph) => glyph,
                Err(e) => {
                    debug!("Skipping glyph: {}", e);
                    if n == 0 {
                        wrap_ready = true;
                    }
                    offset = 0;
                    continue;
                }
            };

            composite(&glyph, pen.foreground, pen.background, &mut self.scratch);
            let source = SourceBitmap {
                pixels: &self.scratch,
                width: glyph.width,
                height: glyph.height,
                stride: glyph.width * BGRA_BYTES,
            };
            let truncated = framebuffer.blit_bgra(
                x.saturating_add(glyph.left),
                pen.y.saturating_sub(glyph.top),
                offset.max(0) as usize,
                0,
                &source,
            );

            let advance = glyph.advance.saturating_sub(offset);
            if n == 0 && advance <= increment {
                wrap_ready = true;
            }
            x = x.saturating_add(advance);
            offset = 0;

            if truncated {
                break;
            }
        }

        wrap_ready
    }
}

/// Position of the message line: the byte where drawing starts and how many
/// pixels of that character have already scrolled off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollCursor {
    /// Always the first byte of a sequence, or the terminator.
    pub position: usize,
    pub offset: i32,
}

impl ScrollCursor {
    /// Back to the start of the message.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The part of `message` drawn this frame.
    pub fn remaining<'a>(&self, message: &'a [u8]) -> &'a [u8] {
        message.get(self.position..).unwrap_or(&[])
    }

    /// Moves on after a frame.
    ///
    /// When the line reported `wrap_ready`, steps past one character
    /// (skipping its continuation bytes) and starts over at the beginning
    /// once the end of the message is reached. Otherwise scrolls the current
    /// character by `increment` more pixels.
    pub fn advance(&mut self, message: &[u8], wrap_ready: bool, increment: i32) {
        if !wrap_ready {
            self.offset = self.offset.saturating_add(increment);
            return;
        }

        self.offset = 0;
        let mut position = self.position + 1;
        while message.get(position).is_some_and(|&b| is_continuation(b)) {
            position += 1;
        }
        self.position = match message.get(position) {
            None | Some(0) => 0,
            Some(_) => position,
        };
    }
}
