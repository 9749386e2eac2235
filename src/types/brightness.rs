// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness type for light dimming.

use std::fmt;

use crate::error::ValueError;

/// Brightness level on the bridge's 0-254 scale.
///
/// The bridge treats 1 as the dimmest controllable level; 0 only appears in
/// reported state while a light is off.
///
/// # Examples
///
/// ```
/// use huelink::types::Brightness;
///
/// let bri = Brightness::new(200).unwrap();
/// assert_eq!(bri.value(), 200);
///
/// // Values above 254 are rejected...
/// assert!(Brightness::new(300).is_err());
///
/// // ...or clamped on request.
/// assert_eq!(Brightness::clamped(300).value(), 254);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Brightness(u8);

impl Brightness {
    /// Maximum brightness.
    pub const MAX: Self = Self(254);

    /// Creates a new brightness value.
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
        // Range checked above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self(value as u8))
    }

    /// Creates a brightness value, clamping into `[1, 254]`.
    ///
    /// This is the composite-scalar shorthand behavior: values below 1 are
    /// handled by the caller as "turn off" and never reach this constructor
    /// in practice, but clamping keeps it total.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // Clamped into u8 range.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(1, 254) as u8)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Brightness {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_range() {
        assert_eq!(Brightness::new(0).unwrap().value(), 0);
        assert_eq!(Brightness::new(254).unwrap().value(), 254);
    }

    #[test]
    fn out_of_range() {
        assert!(Brightness::new(255).is_err());
        assert!(Brightness::new(-1).is_err());
    }

    #[test]
    fn clamping() {
        assert_eq!(Brightness::clamped(300).value(), 254);
        assert_eq!(Brightness::clamped(0).value(), 1);
        assert_eq!(Brightness::clamped(120).value(), 120);
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&Brightness::MAX).unwrap();
        assert_eq!(json, "254");
    }
}
