//! Hardware resource acquisition.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::config::BusConfig;
use crate::input::EdgeSource;
use crate::led::PwmLine;
use crate::Result;

/// Source of the buses, lines and timers the board is built from.
///
/// Each acquisition is independent, so a failed claim only disables the part
/// of the board that needed it.
pub trait Platform {
    type Spi: SpiDevice + Send;
    type Pin: OutputPin + Send;
    type Pwm: PwmLine + Send;
    type Button: EdgeSource;
    type Delay: DelayNs + Send;

    /// Opens and configures the SPI bus.
    fn open_bus(&mut self, bus: &BusConfig) -> Result<Self::Spi>;

    /// Claims an output line with an initial level.
    fn output_pin(&mut self, line: u32, high: bool, label: &'static str) -> Result<Self::Pin>;

    /// Claims a line for level or PWM drive.
    fn pwm_line(&mut self, line: u32, label: &'static str) -> Result<Self::Pwm>;

    /// Claims an input line with edge notification.
    fn button_line(&mut self, line: u32, label: &'static str) -> Result<Self::Button>;

    /// Returns a blocking delay provider.
    fn delay(&mut self) -> Self::Delay;

    /// Raw platform identity text, if readable.
    fn identity(&mut self) -> Option<String>;

    /// Sound card listing, if readable.
    fn sound_cards(&mut self) -> Option<String>;
}
