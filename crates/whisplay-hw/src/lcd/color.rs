//! RGB565 color packing.

use crate::{Error, Result};

/// Black in RGB565.
pub const BLACK: u16 = 0x0000;

/// Converts RGB888 to RGB565, keeping the top 5/6/5 bits of each channel.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r & 0xF8) as u16;
    let g6 = (g & 0xFC) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 8) | (g6 << 3) | b5
}

/// Unpacks RGB565 to the top bits of each RGB888 channel (low bits zero).
#[inline]
pub fn rgb565_to_rgb888(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 8) & 0xF8) as u8;
    let g = ((pixel >> 3) & 0xFC) as u8;
    let b = ((pixel << 3) & 0xF8) as u8;
    (r, g, b)
}

/// Returns the on-wire bytes of a pixel, high byte first.
#[inline]
pub fn rgb565_bytes(pixel: u16) -> [u8; 2] {
    pixel.to_be_bytes()
}

/// Parses a `#RRGGBB` hex color string to RGB565.
pub fn parse_hex_color(hex: &str) -> Result<u16> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(Error::InvalidColor(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| Error::InvalidColor(hex.to_string()))
    };
    Ok(rgb888_to_rgb565(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
