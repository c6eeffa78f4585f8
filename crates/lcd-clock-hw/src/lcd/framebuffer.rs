//! Three-byte-per-pixel framebuffer in the panel's native channel order.

use crate::{Error, Result, LCD_HEIGHT, LCD_WIDTH};

/// Bytes per framebuffer pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// Byte order of the three colour channels in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Order the panel reads pixel bytes in. The panel runs with its BGR flag
/// set, which makes red-first memory come out as red on the glass.
pub const NATIVE_ORDER: ChannelOrder = ChannelOrder::Rgb;

/// Framebuffer for the panel. Its length is fixed at creation.
#[derive(Clone, Default)]
pub struct Framebuffer {
    /// Pixel bytes, row-major, `BYTES_PER_PIXEL` per pixel.
    data: Vec<u8>,
    /// Width of the framebuffer.
    width: u16,
    /// Height of the framebuffer.
    height: u16,
}

impl Framebuffer {
    /// Creates a black framebuffer the size of the panel.
    pub fn new() -> Result<Self> {
        Self::with_dimensions(LCD_WIDTH, LCD_HEIGHT)
    }

    /// Creates a black framebuffer with custom dimensions.
    pub fn with_dimensions(width: u16, height: u16) -> Result<Self> {
        let size = width as usize * height as usize * BYTES_PER_PIXEL;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::FramebufferAlloc(size))?;
        data.resize(size, 0);
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the width of the framebuffer.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the height of the framebuffer.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns a reference to the raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes in one row.
    pub fn row_len(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Returns the bytes of row `y`, or an empty slice past the bottom.
    pub fn row(&self, y: u16) -> &[u8] {
        let len = self.row_len();
        let start = y as usize * len;
        self.data.get(start..start + len).unwrap_or(&[])
    }

    /// Fills every pixel with one colour.
    pub fn clear(&mut self, red: u8, green: u8, blue: u8) {
        let pixel = encode(red, green, blue);
        for chunk in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&pixel);
        }
    }

    /// Sets a pixel at the given coordinates.
    pub fn set_pixel(&mut self, x: u16, y: u16, red: u8, green: u8, blue: u8) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&encode(red, green, blue));
        }
    }

    /// Gets a pixel as `(red, green, blue)`.
    pub fn pixel(&self, x: u16, y: u16) -> Option<(u8, u8, u8)> {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            Some(decode(&self.data[idx..idx + BYTES_PER_PIXEL]))
        } else {
            None
        }
    }

    fn index(&self, x: u16, y: u16) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}

/// Encodes a colour in the native channel order.
#[inline]
pub(crate) fn encode(red: u8, green: u8, blue: u8) -> [u8; BYTES_PER_PIXEL] {
    match NATIVE_ORDER {
        ChannelOrder::Rgb => [red, green, blue],
        ChannelOrder::Bgr => [blue, green, red],
    }
}

#[inline]
fn decode(bytes: &[u8]) -> (u8, u8, u8) {
    match NATIVE_ORDER {
        ChannelOrder::Rgb => (bytes[0], bytes[1], bytes[2]),
        ChannelOrder::Bgr => (bytes[2], bytes[1], bytes[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_black_and_panel_sized() {
        let fb = Framebuffer::new().unwrap();
        assert_eq!(fb.width(), 480);
        assert_eq!(fb.height(), 320);
        assert_eq!(fb.data().len(), 480 * 320 * 3);
        assert!(fb.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clear_fills_every_pixel() {
        let mut fb = Framebuffer::with_dimensions(4, 3).unwrap();
        fb.clear(0x12, 0x34, 0x56);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(fb.pixel(x, y), Some((0x12, 0x34, 0x56)));
            }
        }
        assert_eq!(fb.data().len(), 4 * 3 * 3);
    }

    #[test]
    fn test_native_order_bytes() {
        let mut fb = Framebuffer::with_dimensions(1, 1).unwrap();
        fb.clear(1, 2, 3);
        assert_eq!(fb.data(), &encode(1, 2, 3));
    }

    #[test]
    fn test_set_pixel_out_of_bounds_is_ignored() {
        let mut fb = Framebuffer::with_dimensions(2, 2).unwrap();
        fb.set_pixel(2, 0, 255, 255, 255);
        fb.set_pixel(1, 1, 255, 0, 0);
        assert!(fb.data()[..9].iter().all(|&b| b == 0));
        assert_eq!(fb.pixel(1, 1), Some((255, 0, 0)));
        assert_eq!(fb.pixel(2, 2), None);
    }

    #[test]
    fn test_row() {
        let mut fb = Framebuffer::with_dimensions(3, 2).unwrap();
        fb.set_pixel(0, 1, 9, 9, 9);
        assert_eq!(fb.row(0), &[0; 9]);
        assert_eq!(&fb.row(1)[..3], &encode(9, 9, 9));
        assert!(fb.row(2).is_empty());
    }
}
