//! GPIO line control via the Linux GPIO character device.
//!
//! A [`Gpio`] owns at most one open controller handle. [`Gpio::setup`] and
//! [`Gpio::teardown`] are idempotent, so the handle is opened once for the
//! life of the process no matter how often setup is requested.

use std::collections::HashMap;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Highest addressable pin number.
pub const MAX_PIN: u32 = 63;

/// Consumer label reported to the kernel for requested lines.
const CONSUMER: &str = "lcd-clock";

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// A GPIO controller that can configure, read and drive individual lines.
pub trait GpioChip {
    /// Opens the controller at `path`.
    fn open(path: &str) -> Result<Self>
    where
        Self: Sized;

    /// Sets the direction of a line.
    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()>;

    /// Reads the current level of a line.
    fn read(&mut self, pin: u32) -> Result<bool>;

    /// Drives an output line.
    fn write(&mut self, pin: u32, high: bool) -> Result<()>;

    /// Releases the controller.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// GPIO controller backed by `/dev/gpiochipN`.
pub struct CdevChip {
    chip: Chip,
    lines: HashMap<u32, LineHandle>,
}

impl GpioChip for CdevChip {
    fn open(path: &str) -> Result<Self> {
        let chip = Chip::new(path).map_err(|source| Error::GpioOpen {
            path: path.to_string(),
            source,
        })?;
        Ok(Self {
            chip,
            lines: HashMap::new(),
        })
    }

    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        // A line can only be requested once; release any previous request first.
        self.lines.remove(&pin);

        let flags = match mode {
            PinMode::Input => LineRequestFlags::INPUT,
            PinMode::Output => LineRequestFlags::OUTPUT,
        };
        let handle = self.chip.get_line(pin)?.request(flags, 0, CONSUMER)?;
        self.lines.insert(pin, handle);
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<bool> {
        let line = self.lines.get(&pin).ok_or(Error::PinNotConfigured(pin))?;
        Ok(line.get_value()? != 0)
    }

    fn write(&mut self, pin: u32, high: bool) -> Result<()> {
        let line = self.lines.get(&pin).ok_or(Error::PinNotConfigured(pin))?;
        line.set_value(u8::from(high))?;
        Ok(())
    }
}

/// Owner of the process-wide GPIO controller handle.
pub struct Gpio<C: GpioChip = CdevChip> {
    chip: Option<C>,
}

impl<C: GpioChip> Default for Gpio<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: GpioChip> Gpio<C> {
    /// Creates a closed GPIO owner; call [`Gpio::setup`] before use.
    pub fn new() -> Self {
        Self { chip: None }
    }

    /// Wraps an already opened controller.
    pub fn from_chip(chip: C) -> Self {
        Self { chip: Some(chip) }
    }

    /// Opens the controller unless it is already open.
    pub fn setup(&mut self, path: &str) -> Result<()> {
        if self.chip.is_none() {
            let chip = C::open(path).inspect_err(|e| warn!("cannot open gpio: {}", e))?;
            info!("GPIO controller opened: {}", path);
            self.chip = Some(chip);
        }
        Ok(())
    }

    /// Closes the controller. Does nothing when already closed.
    pub fn teardown(&mut self) -> Result<()> {
        match self.chip.take() {
            Some(chip) => {
                debug!("GPIO controller closed");
                chip.close()
            }
            None => Ok(()),
        }
    }

    /// Returns true while the controller handle is open.
    pub fn is_open(&self) -> bool {
        self.chip.is_some()
    }

    /// Sets the direction of a line. Failures are returned to the caller
    /// because they only happen during start-up.
    pub fn mode(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        if pin > MAX_PIN {
            return Ok(());
        }
        let chip = self.chip.as_mut().ok_or(Error::GpioClosed)?;
        chip.configure(pin, mode)?;
        debug!("GPIO pin {} set to {:?}", pin, mode);
        Ok(())
    }

    /// Reads a line level; out-of-range pins and read failures read as low.
    pub fn read(&mut self, pin: u32) -> bool {
        if pin > MAX_PIN {
            return false;
        }
        match self.chip.as_mut().map(|chip| chip.read(pin)) {
            Some(Ok(level)) => level,
            Some(Err(e)) => {
                warn!("GPIO read error on pin {}: {}", pin, e);
                false
            }
            None => {
                warn!("GPIO read on pin {} while closed", pin);
                false
            }
        }
    }

    /// Drives a line, logging and otherwise ignoring failures.
    pub fn write(&mut self, pin: u32, high: bool) {
        if let Err(e) = self.try_write(pin, high) {
            warn!("GPIO write error on pin {}: {}", pin, e);
        }
    }

    /// Drives a line and reports failure. Out-of-range pins are a no-op.
    pub fn try_write(&mut self, pin: u32, high: bool) -> Result<()> {
        if pin > MAX_PIN {
            return Ok(());
        }
        let chip = self.chip.as_mut().ok_or(Error::GpioClosed)?;
        chip.write(pin, high)
    }
}
