//! LCD Clock Hardware Library
//!
//! Drives an ILI9486 colour LCD attached to a single-board computer over
//! SPI, with the reset and data/command lines on the GPIO character device.
//! Drawing happens in an in-memory [`Framebuffer`]; [`Ili9486::refresh`]
//! pushes the whole buffer to the panel.

pub mod error;
pub mod gpio;
pub mod lcd;
pub mod rotation;
pub mod spi;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use gpio::{Gpio, PinMode};
pub use lcd::{DriverState, Framebuffer, Ili9486, PanelPins, PanelSettings, SourceBitmap};
pub use rotation::Rotation;
pub use spi::{ChipSelect, SpiChannel, SpiMode};

/// LCD display dimensions (landscape, X/Y swapped by the panel).
pub const LCD_WIDTH: u16 = 480;
pub const LCD_HEIGHT: u16 = 320;

/// Default GPIO character device.
pub const GPIO_DEVICE: &str = "/dev/gpiochip0";

/// Default SPI bus device (chip select is appended, e.g. `/dev/spidev0.0`).
pub const SPI_DEVICE: &str = "/dev/spidev0";

/// SPI clock frequency used for the panel.
pub const SPI_SPEED_HZ: u32 = 30_000_000;
