// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decimal wire format for temperatures.

use crate::error::ValueError;

/// Parses a temperature in degrees Celsius from its decimal wire form.
///
/// Surrounding whitespace is ignored. `NaN` and infinities are rejected.
///
/// # Errors
///
/// Returns [`ValueError::InvalidTemperature`] if the text is not a finite
/// decimal number.
///
/// # Examples
///
/// ```
/// use yogurt_sync::types::parse_temperature;
///
/// assert_eq!(parse_temperature("41.8").unwrap(), 41.8);
/// assert!(parse_temperature("warm").is_err());
/// ```
pub fn parse_temperature(text: &str) -> Result<f32, ValueError> {
    match text.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValueError::InvalidTemperature(text.to_string())),
    }
}

/// Formats a temperature for the wire.
///
/// The output never depends on locale and always carries a fractional part,
/// so `45.0` is written as `"45.0"` rather than `"45"`.
///
/// # Examples
///
/// ```
/// use yogurt_sync::types::format_temperature;
///
/// assert_eq!(format_temperature(45.0), "45.0");
/// assert_eq!(format_temperature(41.8), "41.8");
/// ```
#[must_use]
pub fn format_temperature(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_decimal_strings() {
        assert_eq!(parse_temperature("38.5").unwrap(), 38.5);
        assert_eq!(parse_temperature("-4").unwrap(), -4.0);
        assert_eq!(parse_temperature("42").unwrap(), 42.0);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_temperature(" 41.8\n").unwrap(), 41.8);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(matches!(
            parse_temperature("hot"),
            Err(ValueError::InvalidTemperature(_))
        ));
        assert!(parse_temperature("").is_err());
        assert!(parse_temperature("41,8").is_err());
    }

    #[test]
    fn parse_rejects_non_finite() {
        assert!(parse_temperature("NaN").is_err());
        assert!(parse_temperature("inf").is_err());
    }

    #[test]
    fn format_keeps_fraction_for_whole_numbers() {
        assert_eq!(format_temperature(42.0), "42.0");
        assert_eq!(format_temperature(-3.0), "-3.0");
        assert_eq!(format_temperature(0.0), "0.0");
    }

    #[test]
    fn format_shortest_representation() {
        assert_eq!(format_temperature(37.25), "37.25");
        assert_eq!(format_temperature(41.8), "41.8");
    }
}
