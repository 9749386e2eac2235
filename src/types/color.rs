// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color value types: hue, saturation, color temperature, chromaticity.

use std::fmt;

use crate::error::ValueError;

/// Hue angle on the bridge's 0-65535 scale.
///
/// The full `u16` range is valid; the type exists so hue and color
/// temperature cannot be mixed up at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct HueValue(u16);

impl HueValue {
    /// Creates a new hue value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value exceeds 65535.
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(0..=65_535).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 65_535,
                actual: value,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(value as u16))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

/// Color saturation on the bridge's 0-254 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Saturation(u8);

impl Saturation {
    /// Creates a new saturation value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value exceeds 254.
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(0..=254).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 254,
                actual: value,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(value as u8))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

/// Color temperature in mireds.
///
/// The bridge's own gamut limits vary per light model, so no range is
/// enforced here; an unsupported value is rejected by the bridge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ColorTemp(u16);

impl ColorTemp {
    /// Creates a new color temperature.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value does not fit `u16`.
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(0..=i64::from(u16::MAX)).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: i64::from(u16::MAX),
                actual: value,
            });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(value as u16))
    }

    /// Returns the value in mireds.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for ColorTemp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mired", self.0)
    }
}

/// A CIE 1931 chromaticity pair.
///
/// Both coordinates must lie in `[0.0, 1.0]`. Serializes as the two-element
/// array the bridge expects.
///
/// # Examples
///
/// ```
/// use huelink::types::CieXy;
///
/// let xy = CieXy::new(0.409, 0.518).unwrap();
/// assert_eq!(serde_json::to_string(&xy).unwrap(), "[0.409,0.518]");
/// assert!(CieXy::new(1.2, 0.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CieXy {
    x: f64,
    y: f64,
}

impl CieXy {
    /// Creates a chromaticity pair.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidCoordinate` if either coordinate is
    /// outside `[0.0, 1.0]`.
    pub fn new(x: f64, y: f64) -> Result<Self, ValueError> {
        for coord in [x, y] {
            if !(0.0..=1.0).contains(&coord) {
                return Err(ValueError::InvalidCoordinate(coord));
            }
        }
        Ok(Self { x, y })
    }

    /// Returns the x coordinate.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y coordinate.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }
}

impl serde::Serialize for CieXy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x, self.y].serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_full_range() {
        assert_eq!(HueValue::new(0).unwrap().value(), 0);
        assert_eq!(HueValue::new(65_535).unwrap().value(), 65_535);
        assert!(HueValue::new(65_536).is_err());
    }

    #[test]
    fn saturation_range() {
        assert_eq!(Saturation::new(254).unwrap().value(), 254);
        assert!(Saturation::new(255).is_err());
        assert!(Saturation::new(-3).is_err());
    }

    #[test]
    fn color_temp_accepts_bridge_gamut() {
        assert_eq!(ColorTemp::new(153).unwrap().value(), 153);
        assert_eq!(ColorTemp::new(500).unwrap().value(), 500);
        assert!(ColorTemp::new(-1).is_err());
    }

    #[test]
    fn xy_bounds() {
        assert!(CieXy::new(0.0, 1.0).is_ok());
        assert!(CieXy::new(-0.1, 0.5).is_err());
        assert!(CieXy::new(0.5, 1.1).is_err());
    }

    #[test]
    fn xy_serializes_as_pair() {
        let xy = CieXy::new(0.5, 0.25).unwrap();
        assert_eq!(serde_json::to_string(&xy).unwrap(), "[0.5,0.25]");
    }
}
