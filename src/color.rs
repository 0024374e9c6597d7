// color.rs
use std::fmt;

/// Lowest color temperature the black-body fit is evaluated at.
pub const MIN_KELVIN: u32 = 1_000;
/// Highest color temperature the black-body fit is evaluated at.
pub const MAX_KELVIN: u32 = 40_000;

/// An (r, g, b) color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Approximate the color of a black-body radiator given in mireds.
    pub fn from_color_temp(mired: u16) -> Self {
        kelvin_to_rgb(mired_to_kelvin(mired))
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.r, self.g, self.b)
    }
}

/// Mireds to Kelvin, rounded down. Zero mireds is treated as the hottest supported temperature.
pub fn mired_to_kelvin(mired: u16) -> u32 {
    match mired {
        0 => MAX_KELVIN,
        m => 1_000_000 / u32::from(m),
    }
}

/// Tanner Helland's fit of the black-body locus, valid between 1000K and 40000K.
/// Temperatures outside that range are clamped to the nearest bound.
pub fn kelvin_to_rgb(kelvin: u32) -> RgbColor {
    let temp = f64::from(kelvin.clamp(MIN_KELVIN, MAX_KELVIN)) / 100.0;

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698727446 * (temp - 60.0).powf(-0.1332047592)
    };

    let green = if temp <= 66.0 {
        99.4708025861 * temp.ln() - 161.1195681661
    } else {
        288.1221695283 * (temp - 60.0).powf(-0.0755148492)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.5177312231 * (temp - 10.0).ln() - 305.0447927307
    };

    RgbColor::new(channel(red), channel(green), channel(blue))
}

fn channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_to(actual: RgbColor, expected: RgbColor, epsilon: u8) -> bool {
        actual.r.abs_diff(expected.r) <= epsilon
            && actual.g.abs_diff(expected.g) <= epsilon
            && actual.b.abs_diff(expected.b) <= epsilon
    }

    #[test]
    fn coldest_default_is_near_white() {
        let color = RgbColor::from_color_temp(153);
        assert!(close_to(color, RgbColor::WHITE, 5), "{color}");
        assert_eq!(color, RgbColor::new(255, 255, 251));
    }

    #[test]
    fn warm_white_drops_blue() {
        // 500 mireds = 2000K
        let color = RgbColor::from_color_temp(500);
        assert_eq!(color.r, 255);
        assert!(close_to(color, RgbColor::new(255, 137, 14), 1), "{color}");
    }

    #[test]
    fn hot_temperatures_tint_blue() {
        let color = kelvin_to_rgb(10_000);
        assert!(color.r < 210 && color.g < 230, "{color}");
        assert_eq!(color.b, 255);
    }

    #[test]
    fn very_low_temperature_has_no_blue() {
        assert_eq!(kelvin_to_rgb(1_500).b, 0);
    }

    #[test]
    fn out_of_range_kelvin_clamps() {
        assert_eq!(kelvin_to_rgb(0), kelvin_to_rgb(MIN_KELVIN));
        assert_eq!(kelvin_to_rgb(100_000), kelvin_to_rgb(MAX_KELVIN));
        assert_eq!(RgbColor::from_color_temp(0), kelvin_to_rgb(MAX_KELVIN));
        assert_eq!(RgbColor::from_color_temp(u16::MAX), kelvin_to_rgb(MIN_KELVIN));
    }

    #[test]
    fn mired_conversion_floors() {
        assert_eq!(mired_to_kelvin(153), 6535);
        assert_eq!(mired_to_kelvin(500), 2000);
        assert_eq!(mired_to_kelvin(3), 333_333);
    }

    #[test]
    fn formats_hex_and_tuple() {
        let color = RgbColor::new(255, 10, 0);
        assert_eq!(color.hex(), "#ff0a00");
        assert_eq!(color.to_string(), "(255,10,0)");
    }
}
