//! Recording GPIO and SPI doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use crate::gpio::{GpioChip, PinMode};
use crate::spi::SpiTransport;
use crate::{Error, Result};

/// Something that reached the hardware boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Pin(u32, bool),
    Spi(Vec<u8>),
}

#[derive(Default)]
struct Bus {
    events: Vec<Event>,
    modes: HashMap<u32, PinMode>,
    levels: HashMap<u32, bool>,
    fail_spi_close: bool,
    fail_gpio_close: bool,
    fail_spi_send: bool,
    spi_closed: bool,
    gpio_closed: bool,
}

/// Shared log that both doubles append to, in wire order.
#[derive(Clone, Default)]
pub struct Recorder {
    bus: Rc<RefCell<Bus>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chip(&self) -> MockChip {
        MockChip { bus: self.bus.clone() }
    }

    pub fn spi(&self) -> MockSpi {
        MockSpi { bus: self.bus.clone() }
    }

    pub fn events(&self) -> Vec<Event> {
        self.bus.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.bus.borrow_mut().events.clear();
    }

    pub fn mode(&self, pin: u32) -> Option<PinMode> {
        self.bus.borrow().modes.get(&pin).copied()
    }

    pub fn level(&self, pin: u32) -> Option<bool> {
        self.bus.borrow().levels.get(&pin).copied()
    }

    pub fn spi_closed(&self) -> bool {
        self.bus.borrow().spi_closed
    }

    pub fn gpio_closed(&self) -> bool {
        self.bus.borrow().gpio_closed
    }

    pub fn fail_spi_close(&self) {
        self.bus.borrow_mut().fail_spi_close = true;
    }

    pub fn fail_gpio_close(&self) {
        self.bus.borrow_mut().fail_gpio_close = true;
    }

    pub fn fail_spi_send(&self, fail: bool) {
        self.bus.borrow_mut().fail_spi_send = fail;
    }
}

pub struct MockChip {
    bus: Rc<RefCell<Bus>>,
}

impl GpioChip for MockChip {
    fn open(_path: &str) -> Result<Self> {
        Err(Error::GpioClosed)
    }

    fn configure(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        self.bus.borrow_mut().modes.insert(pin, mode);
        Ok(())
    }

    fn read(&mut self, pin: u32) -> Result<bool> {
        let bus = self.bus.borrow();
        if !bus.modes.contains_key(&pin) {
            return Err(Error::PinNotConfigured(pin));
        }
        Ok(bus.levels.get(&pin).copied().unwrap_or(false))
    }

    fn write(&mut self, pin: u32, high: bool) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(Error::PinNotConfigured(pin));
        }
        bus.levels.insert(pin, high);
        bus.events.push(Event::Pin(pin, high));
        Ok(())
    }

    fn close(self) -> Result<()> {
        let mut bus = self.bus.borrow_mut();
        bus.gpio_closed = true;
        if bus.fail_gpio_close {
            return Err(Error::GpioClosed);
        }
        Ok(())
    }
}

pub struct MockSpi {
    bus: Rc<RefCell<Bus>>,
}

impl SpiTransport for MockSpi {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut bus = self.bus.borrow_mut();
        if bus.fail_spi_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "bus stuck"));
        }
        bus.events.push(Event::Spi(data.to_vec()));
        Ok(())
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        self.bus.borrow_mut().events.push(Event::Spi(tx.to_vec()));
        for (r, t) in rx.iter_mut().zip(tx) {
            *r = !t;
        }
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let mut bus = self.bus.borrow_mut();
        bus.spi_closed = true;
        if bus.fail_spi_close {
            return Err(io::Error::new(io::ErrorKind::Other, "close failed"));
        }
        Ok(())
    }
}
