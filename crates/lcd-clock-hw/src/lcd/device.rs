//! ILI9486 panel driver over SPI with GPIO reset and data/command lines.

use std::thread;
use std::time::Duration;

use spidev::Spidev;
use tracing::{debug, info, warn};

use crate::gpio::{CdevChip, Gpio, GpioChip, PinMode};
use crate::rotation::Rotation;
use crate::spi::{ChipSelect, SpiChannel, SpiMode, SpiTransport};
use crate::{Error, Result, GPIO_DEVICE, SPI_DEVICE, SPI_SPEED_HZ};

use super::framebuffer::Framebuffer;
use super::protocol::{
    column_window, init_sequence, row_window, Command, PanelProfile, Step, RESET_INACTIVE_MS,
    RESET_PULSE_MS, RESET_SETTLE_MS,
};

/// GPIO pins the panel board is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelPins {
    /// Controller reset, active low.
    pub reset: u32,
    /// Data/command select: low for a command byte, high for parameters.
    pub data_command: u32,
    /// Touch controller interrupt. Configured as an input only.
    pub touch_interrupt: u32,
}

impl Default for PanelPins {
    fn default() -> Self {
        Self {
            reset: 25,
            data_command: 24,
            touch_interrupt: 17,
        }
    }
}

/// Everything needed to open the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    pub gpio_device: String,
    pub spi_device: String,
    pub chip_select: ChipSelect,
    pub speed_hz: u32,
    pub mode: SpiMode,
    pub pins: PanelPins,
    pub rotation: Rotation,
    pub profile: PanelProfile,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            gpio_device: GPIO_DEVICE.to_string(),
            spi_device: SPI_DEVICE.to_string(),
            chip_select: ChipSelect::Cs0,
            speed_hz: SPI_SPEED_HZ,
            mode: SpiMode::Mode0,
            pins: PanelPins::default(),
            rotation: Rotation::Deg0,
            profile: PanelProfile::default(),
        }
    }
}

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Devices are open but the panel has not been initialised yet.
    Uninitialized,
    /// Panel initialised; refreshes are allowed.
    Ready,
    /// All resources released.
    Destroyed,
}

/// Driver for one ILI9486 panel.
///
/// Owns the framebuffer, the SPI channel and the GPIO controller. Dropping
/// the driver releases all of them and holds the controller in reset.
pub struct Ili9486<S: SpiTransport = Spidev, C: GpioChip = CdevChip> {
    framebuffer: Framebuffer,
    spi: Option<SpiChannel<S>>,
    gpio: Gpio<C>,
    pins: PanelPins,
    profile: PanelProfile,
    rotation: Rotation,
    state: DriverState,
}

impl Ili9486 {
    /// Opens the devices named in `settings` and initialises the panel.
    pub fn open(settings: &PanelSettings) -> Result<Self> {
        let framebuffer = Framebuffer::new()?;

        let mut gpio = Gpio::new();
        gpio.setup(&settings.gpio_device)?;

        let spi = match SpiChannel::create(
            &settings.spi_device,
            settings.chip_select,
            settings.speed_hz,
            settings.mode,
        ) {
            Ok(spi) => spi,
            Err(e) => {
                if let Err(teardown) = gpio.teardown() {
                    warn!("GPIO teardown after failed SPI open: {}", teardown);
                }
                return Err(e);
            }
        };

        Self::assemble(
            framebuffer,
            gpio,
            spi,
            settings.pins,
            settings.profile,
            settings.rotation,
        )
    }
}

impl<S: SpiTransport, C: GpioChip> Ili9486<S, C> {
    /// Initialises a panel on already opened devices.
    ///
    /// On failure every resource handed in is released before returning.
    pub fn with_devices(
        gpio: Gpio<C>,
        spi: SpiChannel<S>,
        pins: PanelPins,
        profile: PanelProfile,
        rotation: Rotation,
    ) -> Result<Self> {
        let framebuffer = match Framebuffer::new() {
            Ok(framebuffer) => framebuffer,
            Err(e) => {
                let mut gpio = gpio;
                release(Some(spi), &mut gpio).unwrap_or_else(|t| warn!("{}", t));
                return Err(e);
            }
        };
        Self::assemble(framebuffer, gpio, spi, pins, profile, rotation)
    }

    fn assemble(
        framebuffer: Framebuffer,
        gpio: Gpio<C>,
        spi: SpiChannel<S>,
        pins: PanelPins,
        profile: PanelProfile,
        rotation: Rotation,
    ) -> Result<Self> {
        let mut driver = Self {
            framebuffer,
            spi: Some(spi),
            gpio,
            pins,
            profile,
            rotation,
            state: DriverState::Uninitialized,
        };

        if let Err(e) = driver.initialize() {
            warn!("Panel initialisation failed: {}", e);
            if let Err(teardown) = driver.destroy() {
                warn!("{}", teardown);
            }
            return Err(e);
        }

        driver.state = DriverState::Ready;
        info!(
            "ILI9486 ready ({}x{}, rotation {})",
            driver.framebuffer.width(),
            driver.framebuffer.height(),
            rotation
        );
        Ok(driver)
    }

    fn initialize(&mut self) -> Result<()> {
        let PanelPins {
            reset,
            data_command,
            touch_interrupt,
        } = self.pins;

        self.gpio.mode(touch_interrupt, PinMode::Input)?;
        self.gpio.mode(data_command, PinMode::Output)?;
        self.gpio.mode(reset, PinMode::Output)?;

        self.gpio.try_write(reset, true)?;
        delay_ms(RESET_INACTIVE_MS);
        self.gpio.try_write(reset, false)?;
        delay_ms(RESET_PULSE_MS);
        self.gpio.try_write(reset, true)?;
        delay_ms(RESET_SETTLE_MS);
        debug!("Panel reset complete");

        self.gpio.try_write(data_command, false)?;

        let steps = init_sequence(&self.profile, self.rotation, self.framebuffer.width());
        for step in &steps {
            match step {
                Step::Write(command, params) => self.write_register(*command, params)?,
                Step::Delay(ms) => delay_ms(*ms),
            }
        }
        debug!("Panel register sequence sent ({} steps)", steps.len());
        Ok(())
    }

    fn write_register(&mut self, command: Command, params: &[u8]) -> Result<()> {
        let spi = self.spi.as_mut().ok_or(Error::NotReady)?;
        send_register(spi, &mut self.gpio, &self.profile, self.pins, command, params);
        Ok(())
    }

    /// Pushes the whole framebuffer to the panel, one row at a time.
    ///
    /// Transfer failures are logged and skipped; the next refresh repaints
    /// everything anyway.
    pub fn refresh(&mut self) -> Result<()> {
        if self.state != DriverState::Ready {
            return Err(Error::NotReady);
        }
        let spi = self.spi.as_mut().ok_or(Error::NotReady)?;

        let width = self.framebuffer.width();
        let height = self.framebuffer.height();
        let columns = column_window(&self.profile, width);

        for y in 0..height {
            let rows = row_window(&self.profile, y, height);
            send_register(
                spi,
                &mut self.gpio,
                &self.profile,
                self.pins,
                Command::ColumnAddressSet,
                &columns,
            );
            send_register(
                spi,
                &mut self.gpio,
                &self.profile,
                self.pins,
                Command::PageAddressSet,
                &rows,
            );
            send_register(
                spi,
                &mut self.gpio,
                &self.profile,
                self.pins,
                Command::MemoryWrite,
                self.framebuffer.row(y),
            );
        }
        Ok(())
    }

    /// Fills the framebuffer with one colour. Call [`Ili9486::refresh`] to
    /// show it.
    pub fn clear(&mut self, red: u8, green: u8, blue: u8) {
        self.framebuffer.clear(red, green, blue);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Level of the touch interrupt line.
    pub fn touch_pending(&mut self) -> bool {
        self.gpio.read(self.pins.touch_interrupt)
    }

    /// Holds the controller in reset and releases the framebuffer, SPI
    /// channel and GPIO controller.
    ///
    /// Every resource is released even if an earlier one fails; all failures
    /// are reported together. Calling this again does nothing.
    pub fn destroy(&mut self) -> Result<()> {
        if self.state == DriverState::Destroyed {
            return Ok(());
        }
        self.state = DriverState::Destroyed;

        let mut errors = Vec::new();
        if let Err(e) = self.gpio.try_write(self.pins.reset, false) {
            errors.push(e);
        }
        self.framebuffer = Framebuffer::default();
        if let Err(Error::Teardown(failed)) = release(self.spi.take(), &mut self.gpio) {
            errors.extend(failed);
        }

        info!("ILI9486 released");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(errors))
        }
    }
}

impl<S: SpiTransport, C: GpioChip> Drop for Ili9486<S, C> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!("{}", e);
        }
    }
}

/// One register write: the command with D/C low, then D/C high and the
/// parameters, if any.
fn send_register<S: SpiTransport, C: GpioChip>(
    spi: &mut SpiChannel<S>,
    gpio: &mut Gpio<C>,
    profile: &PanelProfile,
    pins: PanelPins,
    command: Command,
    params: &[u8],
) {
    gpio.write(pins.data_command, false);
    spi.send(&profile.command_bytes(command));
    gpio.write(pins.data_command, true);
    if !params.is_empty() {
        spi.send(params);
    }
}

/// Closes the SPI channel and the GPIO controller, collecting failures.
fn release<S: SpiTransport, C: GpioChip>(
    spi: Option<SpiChannel<S>>,
    gpio: &mut Gpio<C>,
) -> Result<()> {
    let mut errors = Vec::new();
    if let Some(spi) = spi {
        if let Err(e) = spi.destroy() {
            errors.push(e);
        }
    }
    if let Err(e) = gpio.teardown() {
        errors.push(e);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Teardown(errors))
    }
}

fn delay_ms(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}
