//! LCD display module.
//!
//! Provides the 480x320 ILI9486 panel driver, its framebuffer and the
//! clipped bitmap blitter that writes into it.

mod blit;
mod device;

pub mod framebuffer;
pub mod protocol;

pub use blit::SourceBitmap;
pub use device::{DriverState, Ili9486, PanelPins, PanelSettings};
pub use framebuffer::Framebuffer;
pub use protocol::{Command, PanelProfile};
