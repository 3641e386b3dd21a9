//! Panel controller: reset, init sequence, window addressing and drawing.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::{debug, info};

use super::color::{rgb565_bytes, BLACK};
use super::protocol::{
    address_args, Command, PanelRevision, PIXEL_FORMAT_RGB565, RESET_PULSE_MS, SETTLE_MS,
};
use super::transport::Transport;
use crate::orientation::Orientation;
use crate::{Error, Result};

/// LCD panel controller.
pub struct Panel<SPI, PIN, D> {
    transport: Transport<SPI, PIN>,
    reset: PIN,
    delay: D,
    orientation: Orientation,
    revision: PanelRevision,
}

impl<SPI, PIN, D> Panel<SPI, PIN, D>
where
    SPI: SpiDevice,
    PIN: OutputPin,
    D: DelayNs,
{
    pub fn new(
        transport: Transport<SPI, PIN>,
        reset: PIN,
        delay: D,
        orientation: Orientation,
        revision: PanelRevision,
    ) -> Self {
        Self {
            transport,
            reset,
            delay,
            orientation,
            revision,
        }
    }

    /// Gets the scan orientation programmed at init.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Visible (width, height) in the current orientation.
    pub fn dimensions(&self) -> (u16, u16) {
        self.orientation.dimensions()
    }

    /// Pulses the hardware reset line.
    pub fn reset(&mut self) -> Result<()> {
        self.reset.set_high().map_err(Error::gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.reset.set_low().map_err(Error::gpio)?;
        self.delay.delay_ms(RESET_PULSE_MS);
        self.reset.set_high().map_err(Error::gpio)?;
        self.delay.delay_ms(SETTLE_MS);
        Ok(())
    }

    /// Runs the controller initialization sequence.
    pub fn init(&mut self) -> Result<()> {
        self.command(Command::SleepOut, &[])?;
        self.delay.delay_ms(SETTLE_MS);

        self.command(Command::MemoryAccessControl, &[self.orientation.madctl()])?;
        self.command(Command::PixelFormat, &[PIXEL_FORMAT_RGB565])?;
        for &(register, args) in self.revision.registers() {
            self.transport.send_command(register, args)?;
        }
        self.command(Command::InversionOn, &[])?;
        self.command(Command::DisplayOn, &[])?;

        info!("LCD initialized ({}, {})", self.revision, self.orientation);
        Ok(())
    }

    /// Resets, initializes and blanks the panel.
    pub fn start(&mut self) -> Result<()> {
        self.reset()?;
        self.init()?;
        self.fill(BLACK)
    }

    /// Sets the inclusive address window and primes a memory write.
    ///
    /// The window must lie inside the active orientation's dimensions.
    pub fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<()> {
        let (width, height) = self.dimensions();
        if x0 > x1 || y0 > y1 || x1 >= width || y1 >= height {
            return Err(Error::OutOfBounds {
                x: x0,
                y: y0,
                width: x1.saturating_sub(x0).saturating_add(1),
                height: y1.saturating_sub(y0).saturating_add(1),
            });
        }
        let (dx, dy) = self.orientation.offsets();
        self.command(Command::ColumnAddressSet, &address_args(x0 + dx, x1 + dx))?;
        self.command(Command::RowAddressSet, &address_args(y0 + dy, y1 + dy))?;
        self.command(Command::MemoryWrite, &[])
    }

    /// Draws one pixel; coordinates outside the panel are ignored.
    pub fn draw_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<()> {
        let (width, height) = self.dimensions();
        if x >= width || y >= height {
            return Ok(());
        }
        self.set_window(x, y, x, y)?;
        self.transport.send_data(&rgb565_bytes(color))
    }

    /// Draws a line with Bresenham's algorithm.
    ///
    /// The segment is clipped to the panel first, so far-off endpoints cost
    /// no more than an on-screen line.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16) -> Result<()> {
        let (width, height) = self.dimensions();
        let Some((x0, y0, x1, y1)) = clip_line(x0, y0, x1, y1, width, height) else {
            return Ok(());
        };

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            if let (Ok(px), Ok(py)) = (u16::try_from(x), u16::try_from(y)) {
                self.draw_pixel(px, py, color)?;
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }

    /// Fills the whole panel with a solid color.
    pub fn fill(&mut self, color: u16) -> Result<()> {
        let (width, height) = self.dimensions();
        self.set_window(0, 0, width - 1, height - 1)?;
        let pattern = rgb565_bytes(color);
        let data: Vec<u8> = pattern
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 2)
            .collect();
        self.transport.send_data(&data)?;
        debug!("Filled panel with {:04X}", color);
        Ok(())
    }

    /// Blits pre-packed RGB565 bytes (row-major, big-endian) into a region.
    pub fn draw_image(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        data: &[u8],
    ) -> Result<()> {
        let (panel_width, panel_height) = self.dimensions();
        if x as u32 + width as u32 > panel_width as u32
            || y as u32 + height as u32 > panel_height as u32
        {
            return Err(Error::OutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        let expected = width as usize * height as usize * 2;
        if data.len() != expected {
            return Err(Error::ImageSize {
                expected,
                actual: data.len(),
            });
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.set_window(x, y, x + width - 1, y + height - 1)?;
        self.transport.send_data(data)?;
        debug!("Image {}x{} drawn at ({}, {})", width, height, x, y);
        Ok(())
    }

    fn command(&mut self, command: Command, args: &[u8]) -> Result<()> {
        self.transport.send_command(command as u8, args)
    }
}

/// Liang-Barsky clip of a segment to `[0, width) x [0, height)`.
///
/// Endpoints already inside are returned unchanged.
fn clip_line(
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    width: u16,
    height: u16,
) -> Option<(i64, i64, i64, i64)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (fx0, fy0) = (f64::from(x0), f64::from(y0));
    let (dx, dy) = (f64::from(x1) - fx0, f64::from(y1) - fy0);
    let (x_max, y_max) = (f64::from(width - 1), f64::from(height - 1));

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, fx0), (dx, x_max - fx0), (-dy, fy0), (dy, y_max - fy0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }

    let point = |t: f64| {
        (
            (fx0 + t * dx).round().clamp(0.0, x_max) as i64,
            (fy0 + t * dy).round().clamp(0.0, y_max) as i64,
        )
    };
    let (cx0, cy0) = point(t0);
    let (cx1, cy1) = point(t1);
    Some((cx0, cy0, cx1, cy1))
}
