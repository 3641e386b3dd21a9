//! Lighting module.
//!
//! Provides control over the LCD backlight and the RGB status LED via PWM.

mod lighting;

pub use lighting::{
    backlight_duty, channel_duty, fade_steps, BacklightMode, BacklightSetting, Lighting, PwmLine,
    Rgb, FADE_STEPS,
};
