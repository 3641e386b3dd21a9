//! Backlight and RGB status LED control.
//!
//! Both the backlight and the LED channels are wired active-low: a line held
//! high is dark, so every duty cycle is inverted before it reaches the line.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::LightingConfig;
use crate::{Error, Result};

/// Number of interpolation steps in an RGB fade.
pub const FADE_STEPS: u32 = 20;

/// Initial duty cycle of a freshly started carrier (line high, light off).
const DARK_DUTY: f32 = 100.0;

/// A GPIO line that is driven either as a plain level or as a PWM carrier.
pub trait PwmLine {
    /// Drives a fixed level. Stops the carrier if one is running.
    fn set_level(&mut self, high: bool) -> Result<()>;

    /// Starts a carrier at `frequency_hz` with the line high `duty_percent` of
    /// each period.
    fn start_pwm(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<()>;

    /// Changes the duty cycle of a running carrier.
    fn set_duty(&mut self, duty_percent: f32) -> Result<()>;

    /// Stops the carrier. Idempotent.
    fn stop_pwm(&mut self);
}

/// How the backlight line is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BacklightMode {
    /// Continuous dimming through a PWM carrier.
    Pwm,
    /// On/off only.
    Switch,
}

impl FromStr for BacklightMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pwm" => Ok(BacklightMode::Pwm),
            "switch" => Ok(BacklightMode::Switch),
            _ => Err(Error::Config(format!("invalid backlight mode: {}", s))),
        }
    }
}

impl std::fmt::Display for BacklightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BacklightMode::Pwm => write!(f, "pwm"),
            BacklightMode::Switch => write!(f, "switch"),
        }
    }
}

/// Configured backlight mode: fixed, or chosen by the hardware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BacklightSetting {
    #[default]
    Auto,
    Pwm,
    Switch,
}

impl BacklightSetting {
    /// Resolves the setting against the probed PWM capability.
    pub fn resolve(&self, pwm_capable: bool) -> BacklightMode {
        match self {
            BacklightSetting::Auto if pwm_capable => BacklightMode::Pwm,
            BacklightSetting::Auto => BacklightMode::Switch,
            BacklightSetting::Pwm => BacklightMode::Pwm,
            BacklightSetting::Switch => BacklightMode::Switch,
        }
    }
}

/// An RGB LED color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Duty cycle for a backlight brightness (0-100).
pub fn backlight_duty(brightness: u8) -> f32 {
    100.0 - brightness as f32
}

/// Duty cycle for an LED channel value (0-255).
pub fn channel_duty(value: u8) -> f32 {
    100.0 - (value as f32 / 255.0 * 100.0)
}

/// Yields the 21 colors of a fade from `from` to `to`, both inclusive.
pub fn fade_steps(from: Rgb, to: Rgb) -> impl Iterator<Item = Rgb> {
    // Weighted sums stay inside the endpoints, so no clamping is needed and
    // the last step lands exactly on `to`.
    let lerp = |a: u8, b: u8, step: u32| {
        ((a as u32 * (FADE_STEPS - step) + b as u32 * step) / FADE_STEPS) as u8
    };
    (0..=FADE_STEPS).map(move |step| Rgb {
        r: lerp(from.r, to.r, step),
        g: lerp(from.g, to.g, step),
        b: lerp(from.b, to.b, step),
    })
}

/// Lighting state: backlight path plus the three LED channels.
pub struct Lighting<L> {
    backlight: Option<L>,
    mode: BacklightMode,
    carrier: bool,
    brightness: u8,
    backlight_hz: u32,
    rgb: Option<[L; 3]>,
    current: Rgb,
}

impl<L: PwmLine> Lighting<L> {
    /// Creates the lighting state and starts the LED carriers dark.
    ///
    /// A line that fails to start disables its part of the subsystem.
    pub fn new(
        backlight: Option<L>,
        rgb: Option<[L; 3]>,
        mode: BacklightMode,
        config: &LightingConfig,
    ) -> Self {
        let rgb = rgb.and_then(|mut channels| {
            let started = channels
                .iter_mut()
                .try_for_each(|channel| channel.start_pwm(config.rgb_pwm_hz, DARK_DUTY));
            match started {
                Ok(()) => Some(channels),
                Err(e) => {
                    warn!("RGB LED PWM setup failed: {}; LED disabled", e);
                    channels.iter_mut().for_each(|channel| channel.stop_pwm());
                    None
                }
            }
        });

        info!("Backlight mode: {}", mode);
        Self {
            backlight,
            mode,
            carrier: false,
            brightness: 0,
            backlight_hz: config.backlight_pwm_hz,
            rgb,
            current: Rgb::OFF,
        }
    }

    /// Current backlight mode.
    pub fn mode(&self) -> BacklightMode {
        self.mode
    }

    /// Last requested backlight brightness.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Last color applied to the LED.
    pub fn current(&self) -> Rgb {
        self.current
    }

    /// Returns true if the LED channels are usable.
    pub fn has_rgb(&self) -> bool {
        self.rgb.is_some()
    }

    /// Returns true if the backlight line is usable.
    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    /// Sets backlight brightness (0-100).
    ///
    /// Switch mode only distinguishes zero (off) from non-zero (on).
    pub fn set_backlight(&mut self, brightness: u8) -> Result<()> {
        if brightness > 100 {
            return Err(Error::InvalidBrightness(brightness));
        }
        self.brightness = brightness;

        let Some(line) = self.backlight.as_mut() else {
            return Ok(());
        };
        match self.mode {
            BacklightMode::Pwm => {
                if !self.carrier {
                    line.start_pwm(self.backlight_hz, DARK_DUTY)?;
                    self.carrier = true;
                }
                line.set_duty(backlight_duty(brightness))?;
            }
            BacklightMode::Switch => line.set_level(brightness == 0)?,
        }
        debug!("Backlight set to {} ({})", brightness, self.mode);
        Ok(())
    }

    /// Switches the backlight control path, re-applying the last brightness.
    pub fn set_backlight_mode(&mut self, mode: BacklightMode) -> Result<()> {
        if mode == self.mode {
            return Ok(());
        }
        if let Some(line) = self.backlight.as_mut() {
            if self.carrier {
                line.stop_pwm();
                self.carrier = false;
            }
        }
        self.mode = mode;
        info!("Backlight mode changed to {}", mode);
        self.set_backlight(self.brightness)
    }

    /// Sets the LED color immediately.
    pub fn set_rgb(&mut self, color: Rgb) -> Result<()> {
        let Some([red, green, blue]) = self.rgb.as_mut() else {
            return Ok(());
        };
        red.set_duty(channel_duty(color.r))?;
        green.set_duty(channel_duty(color.g))?;
        blue.set_duty(channel_duty(color.b))?;
        self.current = color;
        Ok(())
    }

    /// Stops every carrier. Further calls are no-ops.
    pub fn shutdown(&mut self) {
        if let Some(mut line) = self.backlight.take() {
            line.stop_pwm();
        }
        if let Some(channels) = self.rgb.take() {
            for mut channel in channels {
                channel.stop_pwm();
            }
        }
        self.carrier = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPwm;

    fn lighting(mode: BacklightMode) -> (Lighting<MockPwm>, MockPwm, [MockPwm; 3]) {
        let backlight = MockPwm::default();
        let rgb = [MockPwm::default(), MockPwm::default(), MockPwm::default()];
        let lighting = Lighting::new(
            Some(backlight.clone()),
            Some(rgb.clone()),
            mode,
            &LightingConfig::default(),
        );
        (lighting, backlight, rgb)
    }

    #[test]
    fn test_duty_mapping() {
        assert_eq!(backlight_duty(0), 100.0);
        assert_eq!(backlight_duty(30), 70.0);
        assert_eq!(backlight_duty(100), 0.0);
        assert_eq!(channel_duty(0), 100.0);
        assert_eq!(channel_duty(255), 0.0);
        assert!((channel_duty(51) - 80.0).abs() < 1e-4);
    }

    #[test]
    fn test_setting_resolve() {
        assert_eq!(BacklightSetting::Auto.resolve(true), BacklightMode::Pwm);
        assert_eq!(BacklightSetting::Auto.resolve(false), BacklightMode::Switch);
        assert_eq!(BacklightSetting::Switch.resolve(true), BacklightMode::Switch);
        assert_eq!(BacklightSetting::Pwm.resolve(false), BacklightMode::Pwm);
    }

    #[test]
    fn test_rgb_carriers_start_dark() {
        let (_lighting, backlight, rgb) = lighting(BacklightMode::Pwm);
        for channel in &rgb {
            assert_eq!(channel.frequency(), Some(100));
            assert_eq!(channel.duty(), Some(100.0));
        }
        assert_eq!(backlight.frequency(), None);
    }

    #[test]
    fn test_pwm_backlight_is_lazy() {
        let (mut lighting, backlight, _) = lighting(BacklightMode::Pwm);
        lighting.set_backlight(30).unwrap();
        assert_eq!(backlight.frequency(), Some(1000));
        assert_eq!(backlight.duty(), Some(70.0));
        assert_eq!(backlight.starts(), 1);

        lighting.set_backlight(100).unwrap();
        assert_eq!(backlight.duty(), Some(0.0));
        assert_eq!(backlight.starts(), 1);
    }

    #[test]
    fn test_switch_backlight() {
        let (mut lighting, backlight, _) = lighting(BacklightMode::Switch);
        lighting.set_backlight(0).unwrap();
        assert_eq!(backlight.level(), Some(true));
        lighting.set_backlight(100).unwrap();
        assert_eq!(backlight.level(), Some(false));
        lighting.set_backlight(1).unwrap();
        assert_eq!(backlight.level(), Some(false));
        assert_eq!(backlight.starts(), 0);
    }

    #[test]
    fn test_brightness_range() {
        let (mut lighting, _, _) = lighting(BacklightMode::Pwm);
        assert!(matches!(
            lighting.set_backlight(101),
            Err(Error::InvalidBrightness(101))
        ));
    }

    #[test]
    fn test_mode_change_tears_down_carrier() {
        let (mut lighting, backlight, _) = lighting(BacklightMode::Pwm);
        lighting.set_backlight(40).unwrap();
        lighting.set_backlight_mode(BacklightMode::Switch).unwrap();
        assert!(!backlight.running());
        assert_eq!(backlight.level(), Some(false));

        lighting.set_backlight_mode(BacklightMode::Pwm).unwrap();
        assert!(backlight.running());
        assert_eq!(backlight.duty(), Some(60.0));
        assert_eq!(backlight.starts(), 2);
    }

    #[test]
    fn test_set_rgb() {
        let (mut lighting, _, [r, g, b]) = lighting(BacklightMode::Pwm);
        lighting.set_rgb(Rgb::new(255, 0, 51)).unwrap();
        assert_eq!(r.duty(), Some(0.0));
        assert_eq!(g.duty(), Some(100.0));
        assert!((b.duty().unwrap() - 80.0).abs() < 1e-4);
        assert_eq!(lighting.current(), Rgb::new(255, 0, 51));
    }

    #[test]
    fn test_failed_carrier_disables_rgb() {
        let red = MockPwm::failing();
        let lighting = Lighting::new(
            None,
            Some([red, MockPwm::default(), MockPwm::default()]),
            BacklightMode::Pwm,
            &LightingConfig::default(),
        );
        assert!(!lighting.has_rgb());
        assert!(!lighting.has_backlight());
    }

    #[test]
    fn test_disabled_lighting_is_noop() {
        let mut lighting: Lighting<MockPwm> =
            Lighting::new(None, None, BacklightMode::Pwm, &LightingConfig::default());
        lighting.set_backlight(50).unwrap();
        lighting.set_rgb(Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(lighting.current(), Rgb::OFF);
    }

    #[test]
    fn test_fade_steps_black_to_white() {
        let steps: Vec<Rgb> = fade_steps(Rgb::OFF, Rgb::new(255, 255, 255)).collect();
        assert_eq!(steps.len(), 21);
        assert_eq!(steps[0], Rgb::OFF);
        assert_eq!(steps[20], Rgb::new(255, 255, 255));
        assert!(steps.windows(2).all(|w| w[0].r <= w[1].r && w[0].g <= w[1].g));
    }

    #[test]
    fn test_fade_steps_down_lands_on_target() {
        let steps: Vec<Rgb> = fade_steps(Rgb::new(10, 250, 3), Rgb::new(0, 7, 200)).collect();
        assert_eq!(steps[0], Rgb::new(10, 250, 3));
        assert_eq!(steps[20], Rgb::new(0, 7, 200));
        assert!(steps.windows(2).all(|w| w[0].g >= w[1].g && w[0].b <= w[1].b));
    }

    #[test]
    fn test_shutdown_stops_carriers() {
        let (mut lighting, backlight, rgb) = lighting(BacklightMode::Pwm);
        lighting.set_backlight(10).unwrap();
        lighting.shutdown();
        assert!(!backlight.running());
        assert!(rgb.iter().all(|c| !c.running()));
        lighting.set_rgb(Rgb::new(9, 9, 9)).unwrap();
        assert!(!lighting.has_rgb());
    }
}
