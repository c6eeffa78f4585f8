//! ILI9486 register protocol.
//!
//! Every register write is two SPI transfers: the command byte with the
//! data/command line low, then the parameter bytes with it high. Panels
//! wired through a 16-bit shift register (Waveshare 3.5" (C)) need each
//! byte preceded by a zero pad byte.

use crate::rotation::Rotation;

/// Reset line held inactive before the pulse.
pub const RESET_INACTIVE_MS: u64 = 1;

/// Reset pulse width.
pub const RESET_PULSE_MS: u64 = 10;

/// Time for the controller to come out of reset.
pub const RESET_SETTLE_MS: u64 = 120;

/// Delay required after Sleep Out.
pub const SLEEP_OUT_MS: u64 = 120;

/// Memory Access Control register bits.
pub const MAC_HORIZONTAL_REFRESH_ORDER: u8 = 1 << 2;
pub const MAC_BGR_ORDER: u8 = 1 << 3;
pub const MAC_VERTICAL_REFRESH_ORDER: u8 = 1 << 4;
pub const MAC_ROW_COLUMN_EXCHANGE: u8 = 1 << 5;
pub const MAC_COLUMN_ADDRESS_ORDER: u8 = 1 << 6;
pub const MAC_ROW_ADDRESS_ORDER: u8 = 1 << 7;
pub const MAC_ROTATE_180: u8 = MAC_COLUMN_ADDRESS_ORDER | MAC_ROW_ADDRESS_ORDER;

const POSITIVE_GAMMA: [u8; 15] = [
    0x00, 0x2c, 0x2c, 0x0b, 0x0c, 0x04, 0x4c, 0x64, 0x36, 0x03, 0x0e, 0x01, 0x10, 0x01, 0x00,
];

const NEGATIVE_GAMMA: [u8; 15] = [
    0x0f, 0x37, 0x37, 0x0c, 0x0f, 0x05, 0x50, 0x32, 0x36, 0x04, 0x0b, 0x00, 0x19, 0x14, 0x0f,
];

/// ILI9486 command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    SleepOut = 0x11,
    NormalDisplayMode = 0x13,
    InversionOff = 0x20,
    InversionOn = 0x21,
    DisplayOn = 0x29,
    ColumnAddressSet = 0x2a,
    PageAddressSet = 0x2b,
    MemoryWrite = 0x2c,
    MemoryAccessControl = 0x36,
    IdleModeOff = 0x38,
    PixelFormat = 0x3a,
    InterfaceMode = 0xb0,
    InversionControl = 0xb4,
    DisplayFunctionControl = 0xb6,
    PowerControl1 = 0xc0,
    PowerControl2 = 0xc1,
    PowerControl3 = 0xc2,
    VcomControl1 = 0xc5,
    PositiveGamma = 0xe0,
    NegativeGamma = 0xe1,
}

/// Wiring and colour options of a particular panel board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelProfile {
    /// 18-bit (RGB666) pixels rather than 16-bit.
    pub pixel_18bit: bool,
    /// Panel needs display inversion on.
    pub inverted: bool,
    /// Panel expects BGR channel order.
    pub bgr: bool,
    /// Rows and columns exchanged (landscape).
    pub swap_xy: bool,
    /// Bus is a 16-bit shift register; every byte gets a zero pad byte.
    pub spi_16bit: bool,
}

/// Waveshare 3.5" RPi LCD (C).
pub const WAVESHARE_35C: PanelProfile = PanelProfile {
    pixel_18bit: true,
    inverted: false,
    bgr: true,
    swap_xy: true,
    spi_16bit: true,
};

impl Default for PanelProfile {
    fn default() -> Self {
        WAVESHARE_35C
    }
}

impl PanelProfile {
    /// Encodes bytes for the bus, inserting pad bytes when needed.
    pub fn pad(&self, bytes: &[u8]) -> Vec<u8> {
        if self.spi_16bit {
            bytes.iter().flat_map(|&b| [0x00, b]).collect()
        } else {
            bytes.to_vec()
        }
    }

    /// Encodes a command byte.
    pub fn command_bytes(&self, command: Command) -> Vec<u8> {
        self.pad(&[command as u8])
    }

    /// Memory Access Control value for a rotation.
    pub fn memory_access_control(&self, rotation: Rotation) -> u8 {
        let mut mac = 0;
        if self.bgr {
            mac |= MAC_BGR_ORDER;
        }
        if self.swap_xy {
            mac |= MAC_ROW_COLUMN_EXCHANGE;
        }
        mac | rotation.access_bits()
    }
}

/// One step of the initialisation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Register write; parameters are already encoded for the bus.
    Write(Command, Vec<u8>),
    /// Wait in milliseconds.
    Delay(u64),
}

/// Builds the register sequence that follows the hardware reset.
pub fn init_sequence(profile: &PanelProfile, rotation: Rotation, width: u16) -> Vec<Step> {
    let write = |command, params: &[u8]| Step::Write(command, profile.pad(params));

    // Lines per panel row in units of 8 pixels.
    let lines = (width / 8).saturating_sub(1) as u8;

    vec![
        // SPI is selected by the hardware reset; these bytes go out unpadded.
        Step::Write(Command::InterfaceMode, vec![0x00, 0x00]),
        write(Command::SleepOut, &[]),
        Step::Delay(SLEEP_OUT_MS),
        write(
            Command::PixelFormat,
            &[if profile.pixel_18bit { 0x66 } else { 0x55 }],
        ),
        write(Command::InversionControl, &[0x00]),
        write(
            if profile.inverted {
                Command::InversionOn
            } else {
                Command::InversionOff
            },
            &[],
        ),
        write(Command::PowerControl1, &[0x09, 0x09]),
        write(Command::PowerControl2, &[0x41, 0x00]),
        write(Command::PowerControl3, &[0x33]),
        write(Command::VcomControl1, &[0x00, 0x36]),
        write(
            Command::MemoryAccessControl,
            &[profile.memory_access_control(rotation)],
        ),
        write(Command::PositiveGamma, &POSITIVE_GAMMA),
        write(Command::NegativeGamma, &NEGATIVE_GAMMA),
        write(Command::DisplayFunctionControl, &[0x00, 0x02, lines]),
        write(Command::SleepOut, &[]),
        Step::Delay(SLEEP_OUT_MS),
        write(Command::DisplayOn, &[]),
        write(Command::IdleModeOff, &[]),
        write(Command::NormalDisplayMode, &[]),
    ]
}

/// Column address window covering a full row.
pub fn column_window(profile: &PanelProfile, width: u16) -> Vec<u8> {
    let last = width.saturating_sub(1);
    profile.pad(&[0x00, 0x00, (last >> 8) as u8, (last & 0xff) as u8])
}

/// Row address window starting at row `y`.
pub fn row_window(profile: &PanelProfile, y: u16, height: u16) -> Vec<u8> {
    let last = height.saturating_sub(1);
    profile.pad(&[
        (y >> 8) as u8,
        (y & 0xff) as u8,
        (last >> 8) as u8,
        (last & 0xff) as u8,
    ])
}
