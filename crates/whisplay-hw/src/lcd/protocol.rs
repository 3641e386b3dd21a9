//! LCD controller command set and per-revision register tables.
//!
//! Protocol structure:
//! - Every transfer is a one-byte command (D/C low) optionally followed by
//!   argument or pixel bytes (D/C high).
//! - Address commands take big-endian 16-bit start/end pairs.
//! - Pixel data is RGB565, high byte first.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum bytes written in one SPI burst (spidev's default `bufsiz`).
pub const MAX_CHUNK: usize = 4096;

/// Pixel format argument selecting 16-bit RGB565.
pub const PIXEL_FORMAT_RGB565: u8 = 0x05;

/// Settle time after reset and after sleep-out, in milliseconds.
pub const SETTLE_MS: u32 = 120;

/// Reset line low-pulse width, in milliseconds.
pub const RESET_PULSE_MS: u32 = 100;

/// LCD controller commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Leave sleep mode.
    SleepOut = 0x11,
    /// Invert display colors.
    InversionOn = 0x21,
    /// Turn the display on.
    DisplayOn = 0x29,
    /// Column address window.
    ColumnAddressSet = 0x2A,
    /// Row address window.
    RowAddressSet = 0x2B,
    /// Start streaming pixel data into the window.
    MemoryWrite = 0x2C,
    /// Memory access control (scan direction).
    MemoryAccessControl = 0x36,
    /// Interface pixel format.
    PixelFormat = 0x3A,
}

/// A vendor register write: command byte plus its argument bytes.
pub type RegisterWrite = (u8, &'static [u8]);

/// Porch, gate, VCOM, power and gamma registers for the ST7789V2 240x280 glass.
const ST7789V2_240X280: &[RegisterWrite] = &[
    (0xB2, &[0x0C, 0x0C, 0x00, 0x33, 0x33]),
    (0xB7, &[0x35]),
    (0xBB, &[0x32]),
    (0xC2, &[0x01]),
    (0xC3, &[0x15]),
    (0xC4, &[0x20]),
    (0xC6, &[0x0F]),
    (0xD0, &[0xA4, 0xA1]),
    (
        0xE0,
        &[
            0xD0, 0x08, 0x0E, 0x09, 0x09, 0x05, 0x31, 0x33, 0x48, 0x17, 0x14, 0x15, 0x31, 0x34,
        ],
    ),
    (
        0xE1,
        &[
            0xD0, 0x08, 0x0E, 0x09, 0x09, 0x15, 0x31, 0x33, 0x48, 0x17, 0x14, 0x15, 0x31, 0x34,
        ],
    ),
];

/// Panel hardware revision, selecting the vendor register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelRevision {
    /// ST7789V2 controller with 240x280 rounded-corner glass.
    #[default]
    #[serde(rename = "st7789v2-240x280")]
    St7789v2,
}

impl PanelRevision {
    /// Returns the vendor register table sent between pixel-format setup and
    /// inversion-on.
    pub fn registers(&self) -> &'static [RegisterWrite] {
        match self {
            PanelRevision::St7789v2 => ST7789V2_240X280,
        }
    }
}

impl FromStr for PanelRevision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "st7789v2-240x280" | "st7789v2" => Ok(PanelRevision::St7789v2),
            _ => Err(Error::InvalidPanelRevision(s.to_string())),
        }
    }
}

impl std::fmt::Display for PanelRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanelRevision::St7789v2 => write!(f, "st7789v2-240x280"),
        }
    }
}

/// Encodes an inclusive start/end address pair, big-endian.
pub fn address_args(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}
