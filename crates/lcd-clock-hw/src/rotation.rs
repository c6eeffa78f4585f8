//! Display rotation support.
//!
//! The panel is mounted in one of two ways; both are handled in hardware by
//! the Memory Access Control register, so no software rotation is needed.

use crate::lcd::protocol::MAC_ROTATE_180;
use crate::{Error, Result};
use std::str::FromStr;

/// Display rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Origin at pin 1 of the GPIO header, USB on the right.
    #[default]
    Deg0,
    /// Origin at the Ethernet connector, USB on the left.
    Deg180,
}

impl Rotation {
    /// Memory Access Control bits for this rotation.
    ///
    /// The panel scans from the opposite corner, so rotation 0 is the one
    /// that needs both address orders reversed.
    pub fn access_bits(&self) -> u8 {
        match self {
            Rotation::Deg0 => MAC_ROTATE_180,
            Rotation::Deg180 => 0,
        }
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "0" | "deg0" | "normal" => Ok(Rotation::Deg0),
            "180" | "deg180" | "upside-down" | "upside_down" => Ok(Rotation::Deg180),
            _ => Err(Error::InvalidRotation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rotation::Deg0 => write!(f, "0"),
            Rotation::Deg180 => write!(f, "180"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_bits() {
        assert_eq!(Rotation::Deg0.access_bits(), 0xc0);
        assert_eq!(Rotation::Deg180.access_bits(), 0x00);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("0".parse::<Rotation>().unwrap(), Rotation::Deg0);
        assert_eq!("180".parse::<Rotation>().unwrap(), Rotation::Deg180);
        assert_eq!("Upside-Down".parse::<Rotation>().unwrap(), Rotation::Deg180);
        assert!("90".parse::<Rotation>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for rotation in [Rotation::Deg0, Rotation::Deg180] {
            assert_eq!(rotation.to_string().parse::<Rotation>().unwrap(), rotation);
        }
    }
}
