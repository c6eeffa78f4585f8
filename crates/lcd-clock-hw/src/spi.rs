//! SPI channel to the panel via Linux spidev.
//!
//! Outgoing bytes are staged in a scratch buffer so each send is a single
//! contiguous transfer. The scratch buffer grows on demand and never shrinks.

use std::io;

use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Initial size of the scratch buffer.
const INITIAL_SCRATCH: usize = 256;

/// Chip-select line on the SPI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipSelect {
    #[default]
    Cs0,
    Cs1,
}

impl ChipSelect {
    /// Converts a chip-select index (0 or 1).
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(ChipSelect::Cs0),
            1 => Some(ChipSelect::Cs1),
            _ => None,
        }
    }

    fn index(&self) -> u8 {
        match self {
            ChipSelect::Cs0 => 0,
            ChipSelect::Cs1 => 1,
        }
    }
}

/// SPI clock polarity/phase mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    #[default]
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl SpiMode {
    /// Converts a mode number (0-3).
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SpiMode::Mode0),
            1 => Some(SpiMode::Mode1),
            2 => Some(SpiMode::Mode2),
            3 => Some(SpiMode::Mode3),
            _ => None,
        }
    }

    fn flags(&self) -> SpiModeFlags {
        match self {
            SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
            SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
            SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
            SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
        }
    }
}

/// A device that can clock bytes out (and optionally in) over SPI.
pub trait SpiTransport {
    /// Sends one contiguous buffer as a single transfer.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    /// Full-duplex transfer; `rx` receives what the device shifted out.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()>;

    /// Releases the device.
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

impl SpiTransport for Spidev {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut transfer = SpidevTransfer::write(data);
        self.transfer(&mut transfer)
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        let mut transfer = SpidevTransfer::read_write(tx, rx);
        self.transfer(&mut transfer)
    }
}

/// SPI channel with a reusable staging buffer.
pub struct SpiChannel<T: SpiTransport = Spidev> {
    transport: T,
    scratch: Vec<u8>,
}

impl SpiChannel<Spidev> {
    /// Opens and configures `{path}.{chip_select}`, e.g. `/dev/spidev0.0`.
    pub fn create(
        path: &str,
        chip_select: ChipSelect,
        speed_hz: u32,
        mode: SpiMode,
    ) -> Result<Self> {
        let device = format!("{}.{}", path, chip_select.index());
        let open_error = |source| Error::SpiOpen {
            path: device.clone(),
            source,
        };

        let mut spi = Spidev::open(&device).map_err(open_error)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(mode.flags())
            .build();
        spi.configure(&options).map_err(open_error)?;

        info!("SPI device opened: {} ({} Hz, {:?})", device, speed_hz, mode);
        Ok(Self::with_transport(spi))
    }
}

impl<T: SpiTransport> SpiChannel<T> {
    /// Wraps an already configured transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            scratch: vec![0; INITIAL_SCRATCH],
        }
    }

    /// Current scratch buffer size in bytes.
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Sends a block of bytes. Failures are logged and the send is dropped;
    /// the next frame sends everything again.
    pub fn send(&mut self, data: &[u8]) {
        if data.len() > self.scratch.len() {
            let additional = data.len() - self.scratch.len();
            if let Err(e) = self.scratch.try_reserve_exact(additional) {
                warn!("SPI: send allocation of {} bytes failed: {}", data.len(), e);
                return;
            }
            self.scratch.resize(data.len(), 0);
            debug!("SPI scratch buffer grown to {} bytes", data.len());
        }

        let staged = &mut self.scratch[..data.len()];
        staged.copy_from_slice(data);
        if let Err(e) = self.transport.send(staged) {
            warn!("SPI: send error: {}", e);
        }
    }

    /// Sends `data` and stores the bytes clocked back by the device in
    /// `received`. Only the common length of both buffers is transferred.
    pub fn read(&mut self, data: &[u8], received: &mut [u8]) {
        let len = data.len().min(received.len());
        if let Err(e) = self.transport.exchange(&data[..len], &mut received[..len]) {
            warn!("SPI: read error: {}", e);
        }
    }

    /// Releases the device and the scratch buffer.
    pub fn destroy(self) -> Result<()> {
        let Self { transport, scratch } = self;
        drop(scratch);
        transport.close()?;
        debug!("SPI channel closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, MockSpi, Recorder};

    fn channel(recorder: &Recorder) -> SpiChannel<MockSpi> {
        SpiChannel::with_transport(recorder.spi())
    }

    #[test]
    fn test_send_small_buffer() {
        let recorder = Recorder::new();
        let mut spi = channel(&recorder);
        spi.send(&[0x00, 0x29]);
        assert_eq!(recorder.events(), vec![Event::Spi(vec![0x00, 0x29])]);
        assert_eq!(spi.scratch_len(), INITIAL_SCRATCH);
    }

    #[test]
    fn test_scratch_grows_and_never_shrinks() {
        let recorder = Recorder::new();
        let mut spi = channel(&recorder);

        let row = vec![0xAB; 1440];
        spi.send(&row);
        assert_eq!(spi.scratch_len(), 1440);

        spi.send(&[1, 2, 3]);
        assert_eq!(spi.scratch_len(), 1440);

        // Only the requested length goes on the wire, not the whole scratch.
        assert_eq!(
            recorder.events(),
            vec![Event::Spi(row), Event::Spi(vec![1, 2, 3])]
        );
    }

    #[test]
    fn test_send_failure_is_not_fatal() {
        let recorder = Recorder::new();
        let mut spi = channel(&recorder);
        recorder.fail_spi_send(true);
        spi.send(&[0x00, 0x11]);
        recorder.fail_spi_send(false);
        spi.send(&[0x00, 0x29]);
        assert_eq!(recorder.events(), vec![Event::Spi(vec![0x00, 0x29])]);
    }

    #[test]
    fn test_read_returns_device_bytes() {
        let recorder = Recorder::new();
        let mut spi = channel(&recorder);
        let mut received = [0u8; 2];
        spi.read(&[0x0F, 0xF0, 0xFF], &mut received);
        assert_eq!(received, [0xF0, 0x0F]);
        assert_eq!(recorder.events(), vec![Event::Spi(vec![0x0F, 0xF0])]);
    }

    #[test]
    fn test_destroy_reports_close_failure() {
        let recorder = Recorder::new();
        recorder.fail_spi_close();
        assert!(channel(&recorder).destroy().is_err());
        assert!(channel(&Recorder::new()).destroy().is_ok());
    }

    #[test]
    fn test_mode_and_chip_select_from_index() {
        assert_eq!(SpiMode::from_index(0), Some(SpiMode::Mode0));
        assert_eq!(SpiMode::from_index(3), Some(SpiMode::Mode3));
        assert_eq!(SpiMode::from_index(4), None);
        assert_eq!(ChipSelect::from_index(1), Some(ChipSelect::Cs1));
        assert_eq!(ChipSelect::from_index(2), None);
    }
}
