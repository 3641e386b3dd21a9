//! Board bring-up and the shared device handle.

use image::{DynamicImage, RgbImage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::input::Button;
use crate::lcd::{self, color::BLACK, Panel, Transport};
use crate::led::{fade_steps, BacklightMode, Lighting, Rgb, FADE_STEPS};
use crate::orientation::Orientation;
use crate::platform::Platform;
use crate::probe::{probe_audio_codec, probe_variant, Variant};
use crate::Result;

type BoardPanel<P> = Panel<<P as Platform>::Spi, <P as Platform>::Pin, <P as Platform>::Delay>;

struct Devices<P: Platform> {
    panel: Option<BoardPanel<P>>,
    lighting: Lighting<P::Pwm>,
}

/// Cloneable handle to the panel and lights.
///
/// Every operation takes one lock, so calls from different threads (button
/// callbacks included) never interleave on the bus or the lines. Operations
/// on a subsystem that failed to come up succeed without doing anything.
pub struct Controller<P: Platform> {
    devices: Arc<Mutex<Devices<P>>>,
}

impl<P: Platform> Clone for Controller<P> {
    fn clone(&self) -> Self {
        Self {
            devices: self.devices.clone(),
        }
    }
}

impl<P: Platform> Controller<P> {
    fn new(devices: Devices<P>) -> Self {
        Self {
            devices: Arc::new(Mutex::new(devices)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Devices<P>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_panel<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BoardPanel<P>) -> Result<()>,
    {
        match self.lock().panel.as_mut() {
            Some(panel) => f(panel),
            None => Ok(()),
        }
    }

    fn bring_up(&self, brightness: u8) {
        let mut devices = self.lock();
        if let Err(e) = devices.lighting.set_backlight(0) {
            warn!("Backlight setup failed: {}", e);
        }
        if let Some(panel) = devices.panel.as_mut() {
            match panel.start() {
                Ok(()) => info!("LCD initialized ({})", panel.orientation()),
                Err(e) => warn!("LCD initialization failed: {}", e),
            }
        }
        if let Err(e) = devices.lighting.set_rgb(Rgb::OFF) {
            warn!("RGB LED setup failed: {}", e);
        }
        if let Err(e) = devices.lighting.set_backlight(brightness) {
            warn!("Backlight setup failed: {}", e);
        }
    }

    /// Returns true if the panel came up.
    pub fn has_panel(&self) -> bool {
        self.lock().panel.is_some()
    }

    /// Visible (width, height), or `None` without a panel.
    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.lock().panel.as_ref().map(|panel| panel.dimensions())
    }

    /// Scan orientation, or `None` without a panel.
    pub fn orientation(&self) -> Option<Orientation> {
        self.lock().panel.as_ref().map(|panel| panel.orientation())
    }

    /// Scales, crops and draws an image over the whole screen.
    pub fn render(&self, image: &DynamicImage) -> Result<()> {
        let Some((width, height)) = self.dimensions() else {
            return Ok(());
        };
        // Resampling is the slow part; keep it outside the lock.
        let frame = lcd::render(image, width, height);
        self.with_panel(|panel| panel.draw_image(0, 0, width, height, &frame))
    }

    /// Same as [`Controller::render`] for an already decoded RGB buffer.
    pub fn render_rgb(&self, image: &RgbImage) -> Result<()> {
        let Some((width, height)) = self.dimensions() else {
            return Ok(());
        };
        let frame = lcd::render_rgb(image, width, height);
        self.with_panel(|panel| panel.draw_image(0, 0, width, height, &frame))
    }

    pub fn clear(&self) -> Result<()> {
        self.fill(BLACK)
    }

    pub fn fill(&self, color: u16) -> Result<()> {
        self.with_panel(|panel| panel.fill(color))
    }

    pub fn draw_pixel(&self, x: u16, y: u16, color: u16) -> Result<()> {
        self.with_panel(|panel| panel.draw_pixel(x, y, color))
    }

    pub fn draw_line(&self, x0: i32, y0: i32, x1: i32, y1: i32, color: u16) -> Result<()> {
        self.with_panel(|panel| panel.draw_line(x0, y0, x1, y1, color))
    }

    /// Blits a big-endian RGB565 buffer at (x, y).
    pub fn draw_image(&self, x: u16, y: u16, width: u16, height: u16, data: &[u8]) -> Result<()> {
        self.with_panel(|panel| panel.draw_image(x, y, width, height, data))
    }

    /// Sets backlight brightness (0-100).
    pub fn set_backlight(&self, brightness: u8) -> Result<()> {
        self.lock().lighting.set_backlight(brightness)
    }

    pub fn brightness(&self) -> u8 {
        self.lock().lighting.brightness()
    }

    pub fn set_backlight_mode(&self, mode: BacklightMode) -> Result<()> {
        self.lock().lighting.set_backlight_mode(mode)
    }

    pub fn backlight_mode(&self) -> BacklightMode {
        self.lock().lighting.mode()
    }

    /// Sets the LED color immediately.
    pub fn set_rgb(&self, color: Rgb) -> Result<()> {
        self.lock().lighting.set_rgb(color)
    }

    /// Last color applied to the LED.
    pub fn rgb(&self) -> Rgb {
        self.lock().lighting.current()
    }

    /// Fades the LED from its current color to `target` over `duration`.
    ///
    /// Blocks the caller. The lock is only held for each step, so other
    /// operations may run between steps.
    pub fn fade(&self, target: Rgb, duration: Duration) -> Result<()> {
        let start = {
            let devices = self.lock();
            if !devices.lighting.has_rgb() {
                return Ok(());
            }
            devices.lighting.current()
        };
        debug!("Fading LED {:?} -> {:?} over {:?}", start, target, duration);

        let pause = duration / FADE_STEPS;
        for color in fade_steps(start, target) {
            self.set_rgb(color)?;
            thread::sleep(pause);
        }
        Ok(())
    }

    fn release(&self) {
        let mut devices = self.lock();
        devices.lighting.shutdown();
        if devices.panel.take().is_some() {
            info!("LCD released");
        }
    }
}

fn claimed<T>(result: Result<T>, subsystem: &str) -> Option<T> {
    result
        .map_err(|e| warn!("{}; {} disabled", e, subsystem))
        .ok()
}

/// The Whisplay HAT: panel, backlight, RGB LED and button.
pub struct Whisplay<P: Platform> {
    controller: Controller<P>,
    button: Option<Button>,
    variant: Variant,
    audio_codec: bool,
}

impl<P: Platform> Whisplay<P> {
    /// Probes the board, claims its resources and brings the panel up.
    ///
    /// Only a missing SPI bus is fatal. Any other resource that cannot be
    /// claimed disables its subsystem with a warning.
    pub fn initialize(mut platform: P, config: &Config) -> Result<Self> {
        let variant = match platform.identity() {
            Some(identity) => probe_variant(&identity),
            None => {
                warn!("Board identity unavailable; assuming PWM backlight");
                Variant::default()
            }
        };
        let mode = config.lighting.backlight_mode.resolve(variant.pwm_capable);
        info!(
            "Detected {}, backlight mode {}",
            variant.model.as_deref().unwrap_or("unknown board"),
            mode
        );

        let audio_codec = platform
            .sound_cards()
            .is_some_and(|cards| probe_audio_codec(&cards));
        if audio_codec {
            info!("WM8960 audio codec found");
        } else {
            warn!("WM8960 audio codec not found; install the sound card driver for audio");
        }

        let spi = platform.open_bus(&config.bus)?;
        info!("Opened {} at {} Hz", config.bus.device, config.bus.speed_hz);

        let pins = &config.pins;
        let dc = claimed(platform.output_pin(pins.dc, false, "whisplay-dc"), "LCD");
        let reset = claimed(platform.output_pin(pins.reset, true, "whisplay-reset"), "LCD");
        let panel = match (dc, reset) {
            (Some(dc), Some(reset)) => Some(Panel::new(
                Transport::new(spi, dc),
                reset,
                platform.delay(),
                config.panel.orientation,
                config.panel.revision,
            )),
            _ => None,
        };

        let backlight = claimed(platform.pwm_line(pins.backlight, "whisplay-backlight"), "backlight");
        let red = claimed(platform.pwm_line(pins.red, "whisplay-red"), "RGB LED");
        let green = claimed(platform.pwm_line(pins.green, "whisplay-green"), "RGB LED");
        let blue = claimed(platform.pwm_line(pins.blue, "whisplay-blue"), "RGB LED");
        let rgb = match (red, green, blue) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            _ => None,
        };
        let lighting = Lighting::new(backlight, rgb, mode, &config.lighting);

        let button = claimed(
            platform.button_line(pins.button, "whisplay-button").and_then(|line| {
                Button::spawn(
                    line,
                    config.input.polarity,
                    Duration::from_millis(config.input.debounce_ms),
                )
            }),
            "button",
        );

        let controller = Controller::new(Devices { panel, lighting });
        controller.bring_up(config.lighting.brightness);

        Ok(Self {
            controller,
            button,
            variant,
            audio_codec,
        })
    }

    /// Shared handle for use from other threads and button callbacks.
    pub fn controller(&self) -> Controller<P> {
        self.controller.clone()
    }

    /// Probed hardware variant.
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Whether a WM8960 sound card was listed at bring-up.
    pub fn has_audio_codec(&self) -> bool {
        self.audio_codec
    }

    pub fn has_panel(&self) -> bool {
        self.controller.has_panel()
    }

    pub fn has_button(&self) -> bool {
        self.button.is_some()
    }

    pub fn dimensions(&self) -> Option<(u16, u16)> {
        self.controller.dimensions()
    }

    pub fn render(&self, image: &DynamicImage) -> Result<()> {
        self.controller.render(image)
    }

    pub fn clear(&self) -> Result<()> {
        self.controller.clear()
    }

    pub fn set_backlight(&self, brightness: u8) -> Result<()> {
        self.controller.set_backlight(brightness)
    }

    pub fn set_backlight_mode(&self, mode: BacklightMode) -> Result<()> {
        self.controller.set_backlight_mode(mode)
    }

    pub fn backlight_mode(&self) -> BacklightMode {
        self.controller.backlight_mode()
    }

    pub fn set_rgb(&self, color: Rgb) -> Result<()> {
        self.controller.set_rgb(color)
    }

    pub fn fade(&self, target: Rgb, duration: Duration) -> Result<()> {
        self.controller.fade(target, duration)
    }

    /// Registers the press callback. Ignored without a button.
    pub fn on_press<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Some(button) = &self.button {
            button.on_press(callback);
        }
    }

    /// Registers the release callback. Ignored without a button.
    pub fn on_release<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Some(button) = &self.button {
            button.on_release(callback);
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.button.as_ref().is_some_and(Button::is_pressed)
    }

    /// Stops the button watcher and releases every line.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut button) = self.button.take() {
            button.stop();
        }
        self.controller.release();
    }
}

impl<P: Platform> Drop for Whisplay<P> {
    fn drop(&mut self) {
        self.release();
    }
}
