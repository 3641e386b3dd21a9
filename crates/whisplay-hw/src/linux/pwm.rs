//! Software PWM on a plain GPIO line.

use linux_embedded_hal::gpio_cdev::LineHandle;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::led::PwmLine;
use crate::{Error, Result};

struct Carrier {
    duty: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// GPIO output toggled from a dedicated thread.
///
/// Timing jitter is fine for LEDs and backlight dimming, not for anything
/// that needs an exact waveform.
pub struct SoftPwmLine {
    line: Arc<LineHandle>,
    label: &'static str,
    carrier: Option<Carrier>,
}

impl SoftPwmLine {
    pub fn new(line: LineHandle, label: &'static str) -> Self {
        Self {
            line: Arc::new(line),
            label,
            carrier: None,
        }
    }

    fn write(&self, high: bool) -> Result<()> {
        self.line
            .set_value(u8::from(high))
            .map_err(|e| Error::Pwm(format!("{}: {}", self.label, e)))
    }
}

impl PwmLine for SoftPwmLine {
    fn set_level(&mut self, high: bool) -> Result<()> {
        self.stop_pwm();
        self.write(high)
    }

    fn start_pwm(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<()> {
        if frequency_hz == 0 {
            return Err(Error::Pwm(format!("{}: zero carrier frequency", self.label)));
        }
        self.stop_pwm();

        let duty = Arc::new(AtomicU32::new(duty_percent.to_bits()));
        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs(1) / frequency_hz;
        let worker = {
            let line = self.line.clone();
            let duty = duty.clone();
            let running = running.clone();
            thread::Builder::new()
                .name(format!("pwm-{}", self.label))
                .spawn(move || toggle(&line, period, &duty, &running))?
        };

        debug!("{}: {} Hz carrier at {}%", self.label, frequency_hz, duty_percent);
        self.carrier = Some(Carrier {
            duty,
            running,
            worker,
        });
        Ok(())
    }

    fn set_duty(&mut self, duty_percent: f32) -> Result<()> {
        let carrier = self
            .carrier
            .as_ref()
            .ok_or_else(|| Error::Pwm(format!("{}: carrier not running", self.label)))?;
        carrier
            .duty
            .store(duty_percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn stop_pwm(&mut self) {
        if let Some(carrier) = self.carrier.take() {
            carrier.running.store(false, Ordering::SeqCst);
            if carrier.worker.join().is_err() {
                warn!("{}: PWM thread panicked", self.label);
            }
        }
    }
}

impl Drop for SoftPwmLine {
    fn drop(&mut self) {
        self.stop_pwm();
    }
}

fn toggle(line: &LineHandle, period: Duration, duty: &AtomicU32, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        let percent = f32::from_bits(duty.load(Ordering::Relaxed));
        let high = period.mul_f32(percent / 100.0);

        let result = if high.is_zero() {
            line.set_value(0).map(|()| thread::sleep(period))
        } else if high >= period {
            line.set_value(1).map(|()| thread::sleep(period))
        } else {
            line.set_value(1)
                .map(|()| thread::sleep(high))
                .and_then(|()| line.set_value(0))
                .map(|()| thread::sleep(period - high))
        };
        if let Err(e) = result {
            warn!("PWM line write failed: {}; carrier stopped", e);
            break;
        }
    }
}
