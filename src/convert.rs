//! Value conversion between the assistant's units and Home Assistant attributes.
//!
//! Assistant side values are percentages, HSB fractions, Kelvin and a
//! temperature with an explicit scale. The hub stores brightness as 0..=255,
//! volume as 0.0..=1.0, fan speed as a named bucket, colour temperature in
//! mireds and temperatures in whatever unit the entity reports.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::{Error, Result};

// =============================================================================
// Percentages
// =============================================================================

pub fn percent_to_brightness(percent: f64) -> u8 {
    (percent / 100.0 * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn brightness_to_percent(brightness: f64) -> f64 {
    brightness / 255.0 * 100.0
}

pub fn percent_to_volume(percent: f64) -> f64 {
    percent / 100.0
}

pub fn volume_to_percent(volume: f64) -> f64 {
    volume * 100.0
}

/// Slider values are scaled linearly between the entity's own `min` and `max`.
pub fn percent_to_slider(percent: f64, min: f64, max: f64) -> f64 {
    min + percent / 100.0 * (max - min)
}

pub fn slider_to_percent(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    (value - min) / (max - min) * 100.0
}

// =============================================================================
// Fan speed buckets
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FanSpeed {
    Off,
    Low,
    Medium,
    High,
}

impl FanSpeed {
    pub fn percent(self) -> f64 {
        match self {
            FanSpeed::Off => 0.0,
            FanSpeed::Low => 33.0,
            FanSpeed::Medium => 66.0,
            FanSpeed::High => 100.0,
        }
    }

    /// Callers validate `percent <= 100` first; anything above maps to high.
    /// Never yields `Off`; turning a fan off goes through `turn_off`.
    pub fn from_percent(percent: f64) -> Self {
        if percent <= 33.0 {
            FanSpeed::Low
        } else if percent <= 66.0 {
            FanSpeed::Medium
        } else {
            FanSpeed::High
        }
    }
}

// =============================================================================
// Colour
// =============================================================================

/// Hue in degrees, saturation and brightness as fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
}

impl Hsb {
    /// Accepts saturation/brightness given either as fractions or as
    /// percentages; anything above 1 is read as a percentage.
    pub fn normalized(hue: f64, saturation: f64, brightness: f64) -> Self {
        let fraction = |v: f64| if v > 1.0 { v / 100.0 } else { v };
        Self {
            hue: hue.rem_euclid(360.0),
            saturation: fraction(saturation).clamp(0.0, 1.0),
            brightness: fraction(brightness).clamp(0.0, 1.0),
        }
    }

    pub fn to_rgb(self) -> [u8; 3] {
        let h = self.hue.rem_euclid(360.0) / 60.0;
        let s = self.saturation;
        let v = self.brightness;

        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u8 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        let channel = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        [channel(r), channel(g), channel(b)]
    }
}

pub fn kelvin_to_mireds(kelvin: f64) -> f64 {
    1_000_000.0 / kelvin
}

pub fn mireds_to_kelvin(mireds: f64) -> f64 {
    1_000_000.0 / mireds
}

// =============================================================================
// Temperature
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Parses Home Assistant's `unit_of_measurement` (`°C`, `°F`, `C`, `F`).
    pub fn from_hass(unit: &str) -> Option<Self> {
        match unit.trim().trim_start_matches('°') {
            "C" | "c" => Some(TemperatureUnit::Celsius),
            "F" | "f" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub value: f64,
    pub scale: TemperatureUnit,
}

impl Temperature {
    pub fn new(value: f64, scale: TemperatureUnit) -> Self {
        Self { value, scale }
    }

    pub fn celsius(value: f64) -> Self {
        Self::new(value, TemperatureUnit::Celsius)
    }

    pub fn to(self, scale: TemperatureUnit) -> Self {
        Self::new(convert_temperature(self.value, self.scale, scale), scale)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.scale {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        };
        write!(f, "{}{}", self.value, suffix)
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) / 1.8
}

pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => celsius_to_fahrenheit(value),
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => fahrenheit_to_celsius(value),
        _ => value,
    }
}

/// Absent values pass through untouched.
pub fn convert_optional_temperature(
    value: Option<f64>,
    from: TemperatureUnit,
    to: TemperatureUnit,
) -> Option<f64> {
    value.map(|v| convert_temperature(v, from, to))
}

/// A temperature difference has no offset, only the scale factor.
pub fn convert_temperature_delta(delta: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => delta * 1.8,
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => delta / 1.8,
        _ => delta,
    }
}

// =============================================================================
// Relative adjustments
// =============================================================================

/// Applies `delta` to `current` within `[lo, hi]`.
///
/// The result is clamped into range unless `current` already sits on a bound,
/// in which case an overshoot is reported as [`Error::ValueOutOfRange`].
pub fn apply_relative(current: f64, delta: f64, lo: f64, hi: f64) -> Result<f64> {
    let mut new = current + delta;
    let saturated = current <= lo || current >= hi;
    if !saturated {
        new = new.clamp(lo, hi);
    }
    ensure_in_range(new, lo, hi)
}

/// NaN is never in range.
pub fn ensure_in_range(value: f64, lo: f64, hi: f64) -> Result<f64> {
    if !(lo..=hi).contains(&value) {
        return Err(Error::ValueOutOfRange { min: lo, max: hi });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_round_trip_stays_within_one_percent() {
        for p in 0..=100 {
            let p = p as f64;
            let back = brightness_to_percent(percent_to_brightness(p) as f64);
            assert!((back - p).abs() <= 1.0, "{p} came back as {back}");
        }
        assert_eq!(percent_to_brightness(0.0), 0);
        assert_eq!(percent_to_brightness(100.0), 255);
        assert_eq!(percent_to_brightness(50.0), 128);
    }

    #[test]
    fn volume_is_not_rounded() {
        assert_eq!(percent_to_volume(37.0), 0.37);
        assert_eq!(volume_to_percent(0.5), 50.0);
    }

    #[test]
    fn fan_speed_thresholds() {
        assert_eq!(FanSpeed::from_percent(0.0), FanSpeed::Low);
        assert_eq!(FanSpeed::from_percent(1.0), FanSpeed::Low);
        assert_eq!(FanSpeed::from_percent(33.0), FanSpeed::Low);
        assert_eq!(FanSpeed::from_percent(34.0), FanSpeed::Medium);
        assert_eq!(FanSpeed::from_percent(66.0), FanSpeed::Medium);
        assert_eq!(FanSpeed::from_percent(100.0), FanSpeed::High);
        // lossy: 40% is stored as medium and reads back as 66%
        assert_eq!(FanSpeed::from_percent(40.0).percent(), 66.0);
        assert_eq!("medium".parse::<FanSpeed>().unwrap(), FanSpeed::Medium);
    }

    #[test]
    fn hsb_primaries() {
        assert_eq!(Hsb::normalized(0.0, 1.0, 1.0).to_rgb(), [255, 0, 0]);
        assert_eq!(Hsb::normalized(120.0, 1.0, 1.0).to_rgb(), [0, 255, 0]);
        assert_eq!(Hsb::normalized(240.0, 1.0, 1.0).to_rgb(), [0, 0, 255]);
        assert_eq!(Hsb::normalized(0.0, 0.0, 1.0).to_rgb(), [255, 255, 255]);
        assert_eq!(Hsb::normalized(350.0, 0.7138, 0.6524).to_rgb(), [166, 48, 67]);
    }

    #[test]
    fn hsb_accepts_percentages() {
        let hsb = Hsb::normalized(60.0, 100.0, 50.0);
        assert_eq!(hsb.saturation, 1.0);
        assert_eq!(hsb.brightness, 0.5);
        assert_eq!(hsb.to_rgb(), [128, 128, 0]);
    }

    #[test]
    fn temperature_round_trip() {
        for x in [-40.0, -12.5, 0.0, 21.3, 37.0, 100.0] {
            let back = fahrenheit_to_celsius(celsius_to_fahrenheit(x));
            assert!((back - x).abs() < 1e-9);
        }
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(
            convert_optional_temperature(None, TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit),
            None
        );
        assert_eq!(
            convert_temperature(20.0, TemperatureUnit::Celsius, TemperatureUnit::Celsius),
            20.0
        );
        assert!((convert_temperature_delta(1.8, TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hass_units() {
        assert_eq!(TemperatureUnit::from_hass("°C"), Some(TemperatureUnit::Celsius));
        assert_eq!(TemperatureUnit::from_hass("°F"), Some(TemperatureUnit::Fahrenheit));
        assert_eq!(TemperatureUnit::from_hass("K"), None);
    }

    #[test]
    fn relative_adjustment_clamps_when_not_saturated() {
        assert_eq!(apply_relative(80.0, 25.0, 0.0, 100.0).unwrap(), 100.0);
        assert_eq!(apply_relative(10.0, -25.0, 0.0, 100.0).unwrap(), 0.0);
        assert_eq!(apply_relative(50.0, 20.0, 0.0, 100.0).unwrap(), 70.0);
    }

    #[test]
    fn relative_adjustment_fails_when_saturated() {
        match apply_relative(100.0, 25.0, 0.0, 100.0) {
            Err(Error::ValueOutOfRange { min, max }) => {
                assert_eq!((min, max), (0.0, 100.0));
            }
            other => panic!("expected out of range, got {other:?}"),
        }
        assert!(apply_relative(0.0, -25.0, 0.0, 100.0).is_err());
        // moving away from the bound is still fine
        assert_eq!(apply_relative(100.0, -25.0, 0.0, 100.0).unwrap(), 75.0);
    }

    #[test]
    fn absolute_range_check() {
        assert!(ensure_in_range(101.0, 0.0, 100.0).is_err());
        assert!(ensure_in_range(-1.0, 0.0, 100.0).is_err());
        assert_eq!(ensure_in_range(42.0, 0.0, 100.0).unwrap(), 42.0);
        assert!(ensure_in_range(f64::NAN, 0.0, 100.0).is_err());
    }

    #[test]
    fn nan_never_survives_an_adjustment() {
        assert!(apply_relative(50.0, f64::NAN, 0.0, 100.0).is_err());
        assert!(apply_relative(f64::NAN, 10.0, 0.0, 100.0).is_err());
    }
}
