// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transition time type.

use std::fmt;

use crate::error::ValueError;

/// Transition duration in deciseconds (the bridge's unit).
///
/// Without an explicit transition time the bridge applies state changes
/// with its built-in 400 ms fade; the gateway keeps a per-resource sticky
/// value so consumers can set a default once and have it attached to every
/// following mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct TransitionTime(u16);

impl TransitionTime {
    /// Creates a new transition time.
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

    /// Returns the duration in deciseconds.
    #[must_use]
    pub const fn deciseconds(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for TransitionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ds", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_values() {
        assert_eq!(TransitionTime::new(0).unwrap().deciseconds(), 0);
        assert_eq!(TransitionTime::new(20).unwrap().deciseconds(), 20);
    }

    #[test]
    fn out_of_range() {
        assert!(TransitionTime::new(-1).is_err());
        assert!(TransitionTime::new(70_000).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(TransitionTime::new(20).unwrap().to_string(), "20ds");
    }
}
