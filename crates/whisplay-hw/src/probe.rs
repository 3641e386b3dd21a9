//! Board capability probes.
//!
//! These take the raw platform text as input so they can run anywhere; the
//! caller decides where the text comes from.

/// Hardware variant derived from the platform identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Board model name, if one was found.
    pub model: Option<String>,
    /// Whether the backlight line supports continuous PWM dimming.
    pub pwm_capable: bool,
}

impl Default for Variant {
    fn default() -> Self {
        Self {
            model: None,
            pwm_capable: true,
        }
    }
}

/// Extracts the value of the `Model` line from `/proc/cpuinfo` text.
pub fn parse_model(cpuinfo: &str) -> Option<&str> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("Model"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Classifies the board from its identity text.
///
/// Accepts either full `/proc/cpuinfo` text or a bare model string. The
/// first-generation Zero and Zero W lack a usable PWM path on the backlight
/// line; every other model, and any unidentified board, dims through PWM.
pub fn probe_variant(identity: &str) -> Variant {
    let model = parse_model(identity).or_else(|| {
        let trimmed = identity.trim();
        (!trimmed.is_empty() && !trimmed.contains('\n') && !trimmed.contains(':'))
            .then_some(trimmed)
    });

    match model {
        Some(model) => Variant {
            model: Some(model.to_string()),
            pwm_capable: !(model.contains("Zero") && !model.contains('2')),
        },
        None => Variant::default(),
    }
}

/// Returns true if the sound card listing includes a WM8960 codec.
pub fn probe_audio_codec(cards: &str) -> bool {
    cards
        .lines()
        .any(|line| line.to_lowercase().contains("wm8960"))
}
