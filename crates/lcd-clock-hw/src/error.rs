//! Error types for the LCD clock hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// GPIO character device could not be opened.
    #[error("cannot open GPIO device {path}: {source}")]
    GpioOpen {
        path: String,
        #[source]
        source: gpio_cdev::Error,
    },

    /// GPIO line request or transfer failure.
    #[error("GPIO error: {0}")]
    Gpio(#[from] gpio_cdev::Error),

    /// GPIO device is not set up.
    #[error("GPIO device is not open")]
    GpioClosed,

    /// GPIO line was used before its mode was configured.
    #[error("GPIO pin {0} is not configured")]
    PinNotConfigured(u32),

    /// SPI device could not be opened or configured.
    #[error("cannot open SPI device {path}: {source}")]
    SpiOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// SPI I/O error.
    #[error("SPI I/O error: {0}")]
    SpiIo(#[from] std::io::Error),

    /// Invalid rotation value.
    #[error("Invalid rotation: {0}")]
    InvalidRotation(String),

    /// Framebuffer memory could not be allocated.
    #[error("cannot allocate framebuffer of {0} bytes")]
    FramebufferAlloc(usize),

    /// Driver was used after it was destroyed.
    #[error("display driver is not ready")]
    NotReady,

    /// One or more resources failed to release during teardown.
    #[error("{} resource(s) failed to release: {}", .0.len(), join(.0))]
    Teardown(Vec<Error>),
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
