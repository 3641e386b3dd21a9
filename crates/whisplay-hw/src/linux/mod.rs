//! Raspberry Pi platform over spidev and the GPIO character device.

mod button;
mod pwm;

use linux_embedded_hal::gpio_cdev::{Chip, EventRequestFlags, Line, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use std::fs;
use tracing::{debug, info};

pub use button::CdevEdges;
pub use pwm::SoftPwmLine;

use crate::config::{BusConfig, Config};
use crate::platform::Platform;
use crate::{Error, Result};

/// Linux platform: `/dev/spidev*`, `/dev/gpiochip*` and `/proc` probes.
pub struct LinuxPlatform {
    chip_path: String,
    chip: Option<Chip>,
    cpuinfo: String,
    sound_cards: String,
}

impl LinuxPlatform {
    pub fn new(config: &Config) -> Self {
        Self {
            chip_path: config.pins.chip.clone(),
            chip: None,
            cpuinfo: config.platform.cpuinfo.clone(),
            sound_cards: config.platform.sound_cards.clone(),
        }
    }

    fn line(&mut self, offset: u32, label: &'static str) -> Result<Line> {
        if self.chip.is_none() {
            let chip = Chip::new(&self.chip_path).map_err(|e| {
                claim_error(offset, label, format!("{}: {}", self.chip_path, e))
            })?;
            debug!("Opened {}", self.chip_path);
            self.chip = Some(chip);
        }
        match self.chip.as_mut() {
            Some(chip) => chip
                .get_line(offset)
                .map_err(|e| claim_error(offset, label, e)),
            None => Err(claim_error(offset, label, "GPIO chip unavailable")),
        }
    }
}

fn spi_mode(mode: u8) -> Result<SpiModeFlags> {
    match mode {
        0 => Ok(SpiModeFlags::SPI_MODE_0),
        1 => Ok(SpiModeFlags::SPI_MODE_1),
        2 => Ok(SpiModeFlags::SPI_MODE_2),
        3 => Ok(SpiModeFlags::SPI_MODE_3),
        _ => Err(Error::Config(format!("invalid SPI mode: {}", mode))),
    }
}

fn claim_error(line: u32, label: &'static str, e: impl std::fmt::Display) -> Error {
    Error::PinClaimFailed {
        line,
        label,
        reason: e.to_string(),
    }
}

impl Platform for LinuxPlatform {
    type Spi = SpidevDevice;
    type Pin = CdevPin;
    type Pwm = SoftPwmLine;
    type Button = CdevEdges;
    type Delay = Delay;

    fn open_bus(&mut self, bus: &BusConfig) -> Result<SpidevDevice> {
        let unavailable = |e: &dyn std::fmt::Display| {
            Error::TransportUnavailable(format!("{}: {}", bus.device, e))
        };
        let mut spi = SpidevDevice::open(&bus.device).map_err(|e| unavailable(&e))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(bus.speed_hz)
            .mode(spi_mode(bus.mode)?)
            .build();
        spi.configure(&options).map_err(|e| unavailable(&e))?;
        info!("SPI {} configured (mode {}, {} Hz)", bus.device, bus.mode, bus.speed_hz);
        Ok(spi)
    }

    fn output_pin(&mut self, line: u32, high: bool, label: &'static str) -> Result<CdevPin> {
        let handle = self
            .line(line, label)?
            .request(LineRequestFlags::OUTPUT, u8::from(high), label)
            .map_err(|e| claim_error(line, label, e))?;
        CdevPin::new(handle).map_err(|e| claim_error(line, label, e))
    }

    fn pwm_line(&mut self, line: u32, label: &'static str) -> Result<SoftPwmLine> {
        // Lines idle high: both the backlight and the LED are active low.
        let handle = self
            .line(line, label)?
            .request(LineRequestFlags::OUTPUT, 1, label)
            .map_err(|e| claim_error(line, label, e))?;
        Ok(SoftPwmLine::new(handle, label))
    }

    fn button_line(&mut self, line: u32, label: &'static str) -> Result<CdevEdges> {
        // No bias flags in this ABI; the pull-up comes from the device tree
        // or boot config (see `[input]` in config/default.toml).
        let events = self
            .line(line, label)?
            .events(LineRequestFlags::INPUT, EventRequestFlags::BOTH_EDGES, label)
            .map_err(|e| claim_error(line, label, e))?;
        Ok(CdevEdges::new(events, line))
    }

    fn delay(&mut self) -> Delay {
        Delay {}
    }

    fn identity(&mut self) -> Option<String> {
        read_probe(&self.cpuinfo)
    }

    fn sound_cards(&mut self) -> Option<String> {
        read_probe(&self.sound_cards)
    }
}

fn read_probe(path: &str) -> Option<String> {
    fs::read_to_string(path)
        .map_err(|e| debug!("Cannot read {}: {}", path, e))
        .ok()
}
