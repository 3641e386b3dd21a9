//! Command/data framing over the SPI bus.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::trace;

use super::protocol::MAX_CHUNK;
use crate::{Error, Result};

/// SPI bus plus the data/command select line.
pub struct Transport<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> Transport<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self { spi, dc }
    }

    /// Sends one command byte, then its arguments (if any) as data.
    pub fn send_command(&mut self, command: u8, args: &[u8]) -> Result<()> {
        trace!("cmd {:02X} {:02X?}", command, args);
        self.dc.set_low().map_err(Error::gpio)?;
        self.spi.write(&[command]).map_err(Error::spi)?;
        if !args.is_empty() {
            self.send_data(args)?;
        }
        Ok(())
    }

    /// Sends a data payload, split into bus-sized bursts.
    pub fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.dc.set_high().map_err(Error::gpio)?;
        for chunk in data.chunks(MAX_CHUNK) {
            self.spi.write(chunk).map_err(Error::spi)?;
        }
        Ok(())
    }

    /// Releases the bus and the select line.
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }
}
