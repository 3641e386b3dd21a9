//! Whisplay Hardware Library
//!
//! Drives the Whisplay HAT for Raspberry Pi: a 240x280 ST7789-class SPI LCD,
//! its backlight, an RGB status LED and a push-button.
//!
//! Hardware access goes through the [`Platform`] trait. On Linux,
//! [`LinuxPlatform`] provides it over spidev and the GPIO character device.

pub mod board;
pub mod config;
pub mod error;
pub mod input;
pub mod lcd;
pub mod led;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod orientation;
pub mod platform;
pub mod probe;

#[cfg(test)]
pub(crate) mod mock;

pub use board::{Controller, Whisplay};
pub use config::Config;
pub use error::{Error, Result};
pub use input::{Button, Polarity};
pub use lcd::{parse_hex_color, rgb888_to_rgb565, PanelRevision};
pub use led::{BacklightMode, BacklightSetting, Rgb};
#[cfg(target_os = "linux")]
pub use linux::LinuxPlatform;
pub use orientation::Orientation;
pub use platform::Platform;
pub use probe::Variant;

/// Native panel width in pixels.
pub const LCD_WIDTH: u16 = 240;
/// Native panel height in pixels.
pub const LCD_HEIGHT: u16 = 280;
/// Rows (portrait) or columns (landscape) of controller RAM above the glass.
pub const LCD_OFFSET: u16 = 20;
