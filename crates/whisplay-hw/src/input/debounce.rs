//! Edge debouncing for the push-button.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which line level means "pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    /// Line reads high while the button is held.
    #[default]
    ActiveHigh,
    /// Line reads low while the button is held (pull-up wiring).
    ActiveLow,
}

impl Polarity {
    /// Maps a raw line level to the logical pressed state.
    pub fn is_pressed(&self, high: bool) -> bool {
        match self {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        }
    }
}

/// Debounced button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Released,
}

/// `Released` ⇄ `Pressed` state machine with a post-edge dead time.
///
/// Timestamps are offsets from any fixed origin chosen by the caller.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pressed: bool,
    last_edge: Option<Duration>,
}

impl Debouncer {
    pub fn new(window: Duration, pressed: bool) -> Self {
        Self {
            window,
            pressed,
            last_edge: None,
        }
    }

    /// Dead time after an accepted edge.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current debounced state.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Handles an edge at `at` after which the button reads `pressed`.
    ///
    /// Edges inside the window of the last accepted edge are dropped.
    pub fn on_edge(&mut self, at: Duration, pressed: bool) -> Option<ButtonEvent> {
        if let Some(last) = self.last_edge {
            if at.saturating_sub(last) < self.window {
                return None;
            }
        }
        self.last_edge = Some(at);
        self.transition(pressed)
    }

    /// Reconciles with the live level once a full window has passed since
    /// the last accepted edge.
    pub fn settle(&mut self, at: Duration, pressed: bool) -> Option<ButtonEvent> {
        match self.last_edge {
            Some(last) if at.saturating_sub(last) < self.window => None,
            _ => self.transition(pressed),
        }
    }

    fn transition(&mut self, pressed: bool) -> Option<ButtonEvent> {
        if pressed == self.pressed {
            return None;
        }
        self.pressed = pressed;
        Some(if pressed {
            ButtonEvent::Pressed
        } else {
            ButtonEvent::Released
        })
    }
}
