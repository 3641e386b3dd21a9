//! LCD display module.
//!
//! Provides control over the 240x280 RGB565 ST7789 panel via SPI.

pub mod color;
mod panel;
pub mod protocol;
pub mod render;
mod transport;

pub use color::{parse_hex_color, rgb565_to_rgb888, rgb888_to_rgb565};
pub use panel::Panel;
pub use protocol::{Command, PanelRevision};
pub use render::{render, render_rgb, CropPlan};
pub use transport::Transport;
