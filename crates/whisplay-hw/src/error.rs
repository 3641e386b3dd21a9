//! Error types for the Whisplay hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// SPI bus could not be opened. Fatal for the whole driver.
    #[error("SPI transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A GPIO line is already owned or inaccessible.
    #[error("Failed to claim GPIO line {line} ({label}): {reason}")]
    PinClaimFailed {
        line: u32,
        label: &'static str,
        reason: String,
    },

    /// Image blit does not fit on the panel.
    #[error("Image {width}x{height} at ({x}, {y}) exceeds panel bounds")]
    OutOfBounds { x: u16, y: u16, width: u16, height: u16 },

    /// Pixel buffer length does not match the blit dimensions.
    #[error("Image size mismatch: expected {expected} bytes, got {actual}")]
    ImageSize { expected: usize, actual: usize },

    /// SPI write failed after bring-up.
    #[error("SPI bus error: {0}")]
    Spi(embedded_hal::spi::ErrorKind),

    /// GPIO level change failed.
    #[error("GPIO error: {0}")]
    Gpio(embedded_hal::digital::ErrorKind),

    /// PWM channel could not be started or updated.
    #[error("PWM error: {0}")]
    Pwm(String),

    /// Invalid orientation value.
    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),

    /// Invalid backlight brightness (must be 0-100).
    #[error("Invalid brightness (must be 0-100): {0}")]
    InvalidBrightness(u8),

    /// Unknown panel revision name.
    #[error("Unknown panel revision: {0}")]
    InvalidPanelRevision(String),

    /// Unparseable color string.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Configuration could not be parsed or serialized.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image decoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem or device I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps an embedded-hal SPI error into ours.
    pub(crate) fn spi<E: embedded_hal::spi::Error>(err: E) -> Self {
        Error::Spi(err.kind())
    }

    /// Maps an embedded-hal GPIO error into ours.
    pub(crate) fn gpio<E: embedded_hal::digital::Error>(err: E) -> Self {
        Error::Gpio(err.kind())
    }
}
