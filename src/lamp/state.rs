// lamp/state.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::output::{Calibration, ChannelOutput};
use crate::color::RgbColor;
use crate::models::{ColorPayload, StatePayload};

pub const STATE_ON: &str = "ON";
pub const STATE_OFF: &str = "OFF";

/// Coolest color temperature a command may request, in mireds.
pub const MIN_MIREDS: u16 = 153;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    ColorTemp,
    Rgb,
}

/// Power token as received on the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerToken {
    On,
    Off,
    Unrecognized(String),
}

impl From<&str> for PowerToken {
    fn from(token: &str) -> Self {
        match token {
            STATE_ON => Self::On,
            STATE_OFF => Self::Off,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// Partial update of the lamp. Absent fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LampCommand {
    pub state: Option<PowerToken>,
    pub brightness: Option<u8>,
    pub color_temp: Option<u16>,
    pub color: Option<RgbColor>,
}

impl LampCommand {
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.brightness.is_none()
            && self.color_temp.is_none()
            && self.color.is_none()
    }
}

/// What `LampState::apply` skipped.
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Applied {
    pub unrecognized_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LampState {
    pub power: bool,
    pub brightness: u8,
    pub mode: ColorMode,
    pub rgb: RgbColor,
    pub color_temp: u16,
}

impl Default for LampState {
    fn default() -> Self {
        Self {
            power: true,
            brightness: 100,
            mode: ColorMode::ColorTemp,
            rgb: RgbColor::WHITE,
            color_temp: MIN_MIREDS,
        }
    }
}

impl LampState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: LampCommand) -> Applied {
        let mut applied = Applied::default();

        match command.state {
            Some(PowerToken::On) => self.power = true,
            Some(PowerToken::Off) => self.power = false,
            Some(PowerToken::Unrecognized(token)) => applied.unrecognized_state = Some(token),
            None => {}
        }

        if let Some(brightness) = command.brightness {
            self.brightness = brightness;
        }

        // A color temperature wins over an RGB color sent in the same command.
        if let Some(color_temp) = command.color_temp {
            self.color_temp = color_temp;
            self.mode = ColorMode::ColorTemp;
        } else if let Some(color) = command.color {
            self.rgb = color;
            self.mode = ColorMode::Rgb;
        }

        applied
    }

    /// Color currently rendered, before brightness and calibration.
    pub fn active_color(&self) -> RgbColor {
        match self.mode {
            ColorMode::ColorTemp => RgbColor::from_color_temp(self.color_temp),
            ColorMode::Rgb => self.rgb,
        }
    }

    pub fn output(&self, calibration: &Calibration) -> ChannelOutput {
        if !self.power {
            return ChannelOutput::OFF;
        }
        ChannelOutput::compute(self.active_color(), self.brightness, calibration)
    }

    pub fn state_token(&self) -> &'static str {
        if self.power { STATE_ON } else { STATE_OFF }
    }

    pub fn serialize(&self) -> StatePayload {
        StatePayload {
            state: self.state_token().to_string(),
            color_mode: self.mode,
            brightness: self.brightness,
            color_temp: self.color_temp,
            color: ColorPayload::from(self.rgb),
        }
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LampState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lamp: [ On: {}, Brightness: {}, ", self.power, self.brightness)?;
        match self.mode {
            ColorMode::ColorTemp => write!(f, "Color temp: {}", self.color_temp)?,
            ColorMode::Rgb => write!(f, "RGB: {}, Hex: {}", self.rgb, self.rgb.hex())?,
        }
        write!(f, " ]")
    }
}
