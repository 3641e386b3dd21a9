//! Button input module.
//!
//! Turns raw edges on the push-button line into debounced press/release
//! callbacks.

mod button;
mod debounce;

pub use button::{Button, EdgeSource};
pub use debounce::{ButtonEvent, Debouncer, Polarity};
