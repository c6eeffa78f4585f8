//! Configuration management.

use anyhow::{anyhow, bail, Context, Result};
use lcd_clock_hw::{ChipSelect, PanelPins, PanelSettings, Rotation, SpiMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Message shown until a client sends one
    #[serde(default = "default_message")]
    pub message: String,

    /// Longest wait for a message connection between frames, in milliseconds
    #[serde(default = "default_frame_wait")]
    pub frame_wait_ms: u64,

    /// Poll the kernel clock discipline and show the unsync theme when lost
    #[serde(default = "default_true")]
    pub ntp_check: bool,

    /// Panel wiring
    #[serde(default)]
    pub panel: PanelConfig,

    /// Font faces
    #[serde(default)]
    pub fonts: FontsConfig,

    /// Message line scrolling
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Message sockets
    #[serde(default)]
    pub sockets: SocketsConfig,
}

/// Panel device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// SPI bus device without the chip-select suffix
    #[serde(default = "default_spi_device")]
    pub spi_device: String,

    /// Chip select (0 or 1)
    #[serde(default)]
    pub chip_select: u8,

    /// SPI clock in Hz
    #[serde(default = "default_spi_speed")]
    pub spi_speed: u32,

    /// SPI mode (0-3)
    #[serde(default)]
    pub spi_mode: u8,

    /// GPIO character device
    #[serde(default = "default_gpio_device")]
    pub gpio_device: String,

    /// "0" or "180"
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default = "default_reset_pin")]
    pub reset: u32,

    #[serde(default = "default_data_command_pin")]
    pub data_command: u32,

    #[serde(default = "default_touch_interrupt_pin")]
    pub touch_interrupt: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            spi_device: default_spi_device(),
            chip_select: 0,
            spi_speed: default_spi_speed(),
            spi_mode: 0,
            gpio_device: default_gpio_device(),
            rotation: default_rotation(),
            reset: default_reset_pin(),
            data_command: default_data_command_pin(),
            touch_interrupt: default_touch_interrupt_pin(),
        }
    }
}

impl PanelConfig {
    /// Converts to driver settings, applying an optional rotation override.
    pub fn settings(&self, rotate: bool) -> Result<PanelSettings> {
        let chip_select = ChipSelect::from_index(self.chip_select)
            .ok_or_else(|| anyhow!("invalid chip select: {}", self.chip_select))?;
        let mode = SpiMode::from_index(self.spi_mode)
            .ok_or_else(|| anyhow!("invalid SPI mode: {}", self.spi_mode))?;
        let rotation = if rotate {
            Rotation::Deg180
        } else {
            self.rotation.parse::<Rotation>()?
        };

        Ok(PanelSettings {
            gpio_device: self.gpio_device.clone(),
            spi_device: self.spi_device.clone(),
            chip_select,
            speed_hz: self.spi_speed,
            mode,
            pins: PanelPins {
                reset: self.reset,
                data_command: self.data_command,
                touch_interrupt: self.touch_interrupt,
            },
            rotation,
            ..PanelSettings::default()
        })
    }
}

/// One font face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// TrueType/OpenType file
    pub path: String,

    /// Face index inside a font collection
    #[serde(default)]
    pub index: u32,

    /// Pixel height
    pub size: f32,
}

/// Fonts for each part of the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    #[serde(default = "default_time_font")]
    pub time: FontConfig,

    #[serde(default = "default_date_font")]
    pub date: FontConfig,

    #[serde(default = "default_message_font")]
    pub message: FontConfig,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            time: default_time_font(),
            date: default_date_font(),
            message: default_message_font(),
        }
    }
}

/// Message line scrolling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Pixels scrolled per frame
    #[serde(default = "default_increment")]
    pub increment: i32,

    /// Codepoints decoded per frame
    #[serde(default = "default_batch")]
    pub batch: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            increment: default_increment(),
            batch: default_batch(),
        }
    }
}

/// Message socket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketsConfig {
    /// Socket that sets the first half of the message
    #[serde(default = "default_primary_socket")]
    pub primary: String,

    /// Socket that sets the second half of the message
    #[serde(default = "default_secondary_socket")]
    pub secondary: String,

    /// Permission bits applied to both socket files
    #[serde(default = "default_socket_mode")]
    pub mode: u32,

    /// How long to wait for a connected client to send its line
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

impl Default for SocketsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_socket(),
            secondary: default_secondary_socket(),
            mode: default_socket_mode(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

// Default value functions
fn default_message() -> String {
    format!("{}{}", " ".repeat(15), "Loading ... ".repeat(4))
}

fn default_frame_wait() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_spi_device() -> String {
    lcd_clock_hw::SPI_DEVICE.to_string()
}

fn default_spi_speed() -> u32 {
    lcd_clock_hw::SPI_SPEED_HZ
}

fn default_gpio_device() -> String {
    lcd_clock_hw::GPIO_DEVICE.to_string()
}

fn default_rotation() -> String {
    "0".to_string()
}

fn default_reset_pin() -> u32 {
    25
}

fn default_data_command_pin() -> u32 {
    24
}

fn default_touch_interrupt_pin() -> u32 {
    17
}

fn default_time_font() -> FontConfig {
    FontConfig {
        path: "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf".to_string(),
        index: 0,
        size: 120.0,
    }
}

fn default_date_font() -> FontConfig {
    FontConfig {
        path: "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc".to_string(),
        index: 0,
        size: 92.0,
    }
}

fn default_message_font() -> FontConfig {
    FontConfig {
        size: 64.0,
        ..default_date_font()
    }
}

fn default_increment() -> i32 {
    32
}

fn default_batch() -> usize {
    20
}

fn default_primary_socket() -> String {
    "/tmp/clock.sock".to_string()
}

fn default_secondary_socket() -> String {
    "/tmp/clock2.sock".to_string()
}

fn default_socket_mode() -> u32 {
    0o777
}

fn default_read_timeout() -> u64 {
    1000
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the frame loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.scroll.increment < 1 {
            bail!(
                "scroll.increment must be at least 1, got {}",
                self.scroll.increment
            );
        }
        if self.scroll.batch < 1 {
            bail!("scroll.batch must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            message: default_message(),
            frame_wait_ms: default_frame_wait(),
            ntp_check: default_true(),
            panel: PanelConfig::default(),
            fonts: FontsConfig::default(),
            scroll: ScrollConfig::default(),
            sockets: SocketsConfig::default(),
        }
    }
}
