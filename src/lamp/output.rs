// lamp/output.rs
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::color::RgbColor;

/// Per-channel scale factors. Green and blue emitters look brighter than red
/// at the same duty cycle, so they are dimmed to balance the mix.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Validate)]
pub struct Calibration {
    #[validate(range(min = 0.0, max = 1.0))]
    pub green_compensation: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub blue_compensation: f64,
}

impl Calibration {
    pub const GREEN_COMPENSATION: f64 = 0.2;
    pub const BLUE_COMPENSATION: f64 = 0.3;

    /// Range check that also rejects NaN, which slips past both bounds of `range`.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.validate()?;

        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("green_compensation", self.green_compensation),
            ("blue_compensation", self.blue_compensation),
        ] {
            if !value.is_finite() {
                errors.add(field, ValidationError::new("finite"));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            green_compensation: Self::GREEN_COMPENSATION,
            blue_compensation: Self::BLUE_COMPENSATION,
        }
    }
}

/// Duty cycles for the three output channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelOutput {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ChannelOutput {
    pub const OFF: Self = Self {
        red: 0,
        green: 0,
        blue: 0,
    };

    /// Scale `color` by `brightness` (0..=100) and apply the calibration.
    /// Results are truncated, not rounded.
    pub fn compute(color: RgbColor, brightness: u8, calibration: &Calibration) -> Self {
        let brightness = f64::from(brightness);
        let scale = |value: u8, compensation: f64| -> u8 {
            ((f64::from(value) / 256.0) * brightness * compensation) as u8
        };

        Self {
            red: scale(color.r, 1.0),
            green: scale(color.g, calibration.green_compensation),
            blue: scale(color.b, calibration.blue_compensation),
        }
    }
}
