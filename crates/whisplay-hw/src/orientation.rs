//! Panel orientation support.
//!
//! The controller's framebuffer RAM is taller than the visible glass, so every
//! orientation carries a fixed 20-pixel offset along the panel's long axis.
//! Portrait modes shift row addresses, landscape modes shift column addresses.

use crate::{Error, Result, LCD_HEIGHT, LCD_OFFSET, LCD_WIDTH};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display orientation, numbered as the controller's four scan modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Mode 0: portrait (240x280).
    Portrait,
    /// Mode 1: portrait rotated 180°, the board's native mounting.
    #[default]
    PortraitUpsideDown,
    /// Mode 2: landscape (280x240).
    Landscape,
    /// Mode 3: landscape rotated 180°.
    LandscapeUpsideDown,
}

impl Orientation {
    /// Returns the orientation for a numeric scan mode (0-3).
    pub fn from_mode(mode: u8) -> Result<Self> {
        match mode {
            0 => Ok(Orientation::Portrait),
            1 => Ok(Orientation::PortraitUpsideDown),
            2 => Ok(Orientation::Landscape),
            3 => Ok(Orientation::LandscapeUpsideDown),
            _ => Err(Error::InvalidOrientation(mode.to_string())),
        }
    }

    /// Returns the numeric scan mode (0-3).
    pub fn mode(&self) -> u8 {
        match self {
            Orientation::Portrait => 0,
            Orientation::PortraitUpsideDown => 1,
            Orientation::Landscape => 2,
            Orientation::LandscapeUpsideDown => 3,
        }
    }

    /// Returns the memory-access-control register value.
    pub fn madctl(&self) -> u8 {
        match self {
            Orientation::Portrait => 0x00,
            Orientation::PortraitUpsideDown => 0xC0,
            Orientation::Landscape => 0x70,
            Orientation::LandscapeUpsideDown => 0xA0,
        }
    }

    /// Returns true if this is a portrait orientation.
    pub fn is_portrait(&self) -> bool {
        matches!(
            self,
            Orientation::Portrait | Orientation::PortraitUpsideDown
        )
    }

    /// Returns the visible (width, height) for this orientation.
    pub fn dimensions(&self) -> (u16, u16) {
        if self.is_portrait() {
            (LCD_WIDTH, LCD_HEIGHT)
        } else {
            (LCD_HEIGHT, LCD_WIDTH)
        }
    }

    /// Returns the (column, row) address offsets for this orientation.
    pub fn offsets(&self) -> (u16, u16) {
        if self.is_portrait() {
            (0, LCD_OFFSET)
        } else {
            (LCD_OFFSET, 0)
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "portrait" | "0" => Ok(Orientation::Portrait),
            "portrait-upside-down" | "portrait_upside_down" | "1" => {
                Ok(Orientation::PortraitUpsideDown)
            }
            "landscape" | "2" => Ok(Orientation::Landscape),
            "landscape-upside-down" | "landscape_upside_down" | "3" => {
                Ok(Orientation::LandscapeUpsideDown)
            }
            _ => Err(Error::InvalidOrientation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::PortraitUpsideDown => write!(f, "portrait-upside-down"),
            Orientation::Landscape => write!(f, "landscape"),
            Orientation::LandscapeUpsideDown => write!(f, "landscape-upside-down"),
        }
    }
}
