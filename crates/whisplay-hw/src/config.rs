//! Board configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::input::Polarity;
use crate::lcd::PanelRevision;
use crate::led::BacklightSetting;
use crate::orientation::Orientation;
use crate::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// SPI bus configuration
    #[serde(default)]
    pub bus: BusConfig,

    /// GPIO line assignments
    #[serde(default)]
    pub pins: PinConfig,

    /// Panel configuration
    #[serde(default)]
    pub panel: PanelConfig,

    /// Backlight and RGB LED configuration
    #[serde(default)]
    pub lighting: LightingConfig,

    /// Button configuration
    #[serde(default)]
    pub input: InputConfig,

    /// Platform probe sources
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// SPI bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// spidev device path
    #[serde(default = "default_spi_device")]
    pub device: String,

    /// Maximum clock speed in Hz
    #[serde(default = "default_speed")]
    pub speed_hz: u32,

    /// SPI mode (0-3)
    #[serde(default)]
    pub mode: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: default_spi_device(),
            speed_hz: default_speed(),
            mode: 0,
        }
    }
}

/// GPIO chip and line offsets (BCM numbering).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    /// GPIO character device
    #[serde(default = "default_chip")]
    pub chip: String,

    /// Data/command select (header pin 13)
    #[serde(default = "default_dc")]
    pub dc: u32,

    /// Panel reset (header pin 7)
    #[serde(default = "default_reset")]
    pub reset: u32,

    /// Backlight enable, active low (header pin 15)
    #[serde(default = "default_backlight")]
    pub backlight: u32,

    /// Red LED channel (header pin 22)
    #[serde(default = "default_red")]
    pub red: u32,

    /// Green LED channel (header pin 18)
    #[serde(default = "default_green")]
    pub green: u32,

    /// Blue LED channel (header pin 16)
    #[serde(default = "default_blue")]
    pub blue: u32,

    /// Push-button (header pin 11)
    #[serde(default = "default_button")]
    pub button: u32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            dc: default_dc(),
            reset: default_reset(),
            backlight: default_backlight(),
            red: default_red(),
            green: default_green(),
            blue: default_blue(),
            button: default_button(),
        }
    }
}

/// Panel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Scan orientation
    #[serde(default)]
    pub orientation: Orientation,

    /// Register table to initialize with
    #[serde(default)]
    pub revision: PanelRevision,
}

/// Backlight and RGB LED configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingConfig {
    /// Backlight control path ("auto" probes the board)
    #[serde(default)]
    pub backlight_mode: BacklightSetting,

    /// Brightness applied once bring-up completes (0-100)
    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// Backlight PWM carrier frequency
    #[serde(default = "default_backlight_hz")]
    pub backlight_pwm_hz: u32,

    /// RGB LED PWM carrier frequency
    #[serde(default = "default_rgb_hz")]
    pub rgb_pwm_hz: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            backlight_mode: BacklightSetting::default(),
            brightness: default_brightness(),
            backlight_pwm_hz: default_backlight_hz(),
            rgb_pwm_hz: default_rgb_hz(),
        }
    }
}

/// Button configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Line level that means "pressed"
    #[serde(default)]
    pub polarity: Polarity,

    /// Debounce window in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::default(),
            debounce_ms: default_debounce(),
        }
    }
}

/// Where hardware probes read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Text containing the board "Model" line
    #[serde(default = "default_cpuinfo")]
    pub cpuinfo: String,

    /// ALSA sound card listing
    #[serde(default = "default_sound_cards")]
    pub sound_cards: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            cpuinfo: default_cpuinfo(),
            sound_cards: default_sound_cards(),
        }
    }
}

// Default value functions
fn default_spi_device() -> String {
    "/dev/spidev0.0".to_string()
}

fn default_speed() -> u32 {
    100_000_000
}

fn default_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_dc() -> u32 {
    27
}

fn default_reset() -> u32 {
    4
}

fn default_backlight() -> u32 {
    22
}

fn default_red() -> u32 {
    25
}

fn default_green() -> u32 {
    24
}

fn default_blue() -> u32 {
    23
}

fn default_button() -> u32 {
    17
}

fn default_brightness() -> u8 {
    50
}

fn default_backlight_hz() -> u32 {
    1000
}

fn default_rgb_hz() -> u32 {
    100
}

fn default_debounce() -> u64 {
    50
}

fn default_cpuinfo() -> String {
    "/proc/cpuinfo".to_string()
}

fn default_sound_cards() -> String {
    "/proc/asound/cards".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
