// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mode vocabularies: alert, effect, and color mode.
//!
//! Each enum carries two mappings:
//!
//! - `from_bridge` maps the bridge's raw tokens (including the SDK-style
//!   prefixed enumerator names some firmware versions report) onto the
//!   wire vocabulary. Unknown tokens normalize to the `none` member so a
//!   firmware quirk never produces a spurious publish.
//! - `from_wire` parses the strict vocabulary accepted in commands and
//!   fails explicitly on anything else.

use std::fmt;

use crate::error::ValueError;

/// Alert state of a light (short or long breathe cycle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// No alert active.
    #[default]
    None,
    /// One breathe cycle.
    Select,
    /// Breathe cycles for 15 seconds.
    LSelect,
}

impl AlertMode {
    /// Maps a bridge-reported token onto the vocabulary.
    ///
    /// Unknown tokens normalize to [`AlertMode::None`].
    #[must_use]
    pub fn from_bridge(token: &str) -> Self {
        match token {
            "select" | "ALERT_SELECT" => Self::Select,
            "lselect" | "ALERT_LSELECT" => Self::LSelect,
            _ => Self::None,
        }
    }

    /// Parses a command token.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidToken` outside `{none, select, lselect}`.
    pub fn from_wire(token: &str) -> Result<Self, ValueError> {
        match token {
            "none" => Ok(Self::None),
            "select" => Ok(Self::Select),
            "lselect" => Ok(Self::LSelect),
            _ => Err(ValueError::InvalidToken {
                field: "alert",
                token: token.to_string(),
            }),
        }
    }

    /// Returns the wire token.
    #[must_use]
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Select => "select",
            Self::LSelect => "lselect",
        }
    }
}

impl fmt::Display for AlertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Dynamic effect state of a light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMode {
    /// No effect active.
    #[default]
    None,
    /// Cycle through all hues at current saturation and brightness.
    Colorloop,
}

impl EffectMode {
    /// Maps a bridge-reported token onto the vocabulary.
    ///
    /// Unknown tokens normalize to [`EffectMode::None`].
    #[must_use]
    pub fn from_bridge(token: &str) -> Self {
        match token {
            "colorloop" | "EFFECT_COLORLOOP" => Self::Colorloop,
            _ => Self::None,
        }
    }

    /// Parses a command token.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidToken` outside `{none, colorloop}`.
    pub fn from_wire(token: &str) -> Result<Self, ValueError> {
        match token {
            "none" => Ok(Self::None),
            "colorloop" => Ok(Self::Colorloop),
            _ => Err(ValueError::InvalidToken {
                field: "effect",
                token: token.to_string(),
            }),
        }
    }

    /// Returns the wire token.
    #[must_use]
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Colorloop => "colorloop",
        }
    }
}

impl fmt::Display for EffectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Which color system produced the light's current color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color temperature.
    Ct,
    /// Hue and saturation. The bridge's long token `hue_saturation` is
    /// shortened to `hs` on the wire.
    Hs,
    /// CIE chromaticity.
    Xy,
    /// Unknown or not a color light.
    #[default]
    None,
}

impl ColorMode {
    /// Maps a bridge-reported token onto the vocabulary.
    ///
    /// Unknown tokens normalize to [`ColorMode::None`].
    #[must_use]
    pub fn from_bridge(token: &str) -> Self {
        match token {
            "ct" | "COLORMODE_CT" => Self::Ct,
            "hs" | "hue_saturation" | "COLORMODE_HUE_SATURATION" => Self::Hs,
            "xy" | "COLORMODE_XY" => Self::Xy,
            _ => Self::None,
        }
    }

    /// Parses a command token.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidToken` outside `{ct, xy, hs}`.
    pub fn from_wire(token: &str) -> Result<Self, ValueError> {
        match token {
            "ct" => Ok(Self::Ct),
            "hs" => Ok(Self::Hs),
            "xy" => Ok(Self::Xy),
            _ => Err(ValueError::InvalidToken {
                field: "colormode",
                token: token.to_string(),
            }),
        }
    }

    /// Returns the wire token.
    #[must_use]
    pub const fn as_wire(&self) -> &'static str {
        match self {
            Self::Ct => "ct",
            Self::Hs => "hs",
            Self::Xy => "xy",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_saturation_shortens_to_hs() {
        assert_eq!(ColorMode::from_bridge("hue_saturation"), ColorMode::Hs);
        assert_eq!(ColorMode::from_bridge("hs"), ColorMode::Hs);
        assert_eq!(ColorMode::Hs.as_wire(), "hs");
    }

    #[test]
    fn unknown_tokens_normalize_to_none() {
        assert_eq!(AlertMode::from_bridge("unknown"), AlertMode::None);
        assert_eq!(EffectMode::from_bridge("EFFECT_UNKNOWN"), EffectMode::None);
        assert_eq!(ColorMode::from_bridge("homeautomation"), ColorMode::None);
    }

    #[test]
    fn sdk_enumerator_names_demangle() {
        assert_eq!(AlertMode::from_bridge("ALERT_LSELECT"), AlertMode::LSelect);
        assert_eq!(
            ColorMode::from_bridge("COLORMODE_HUE_SATURATION"),
            ColorMode::Hs
        );
    }

    #[test]
    fn wire_vocabulary_is_strict() {
        assert!(AlertMode::from_wire("breathe").is_err());
        assert!(EffectMode::from_wire("loop").is_err());
        assert!(ColorMode::from_wire("none").is_err());
        assert_eq!(ColorMode::from_wire("hs").unwrap(), ColorMode::Hs);
    }

    #[test]
    fn serializes_as_wire_token() {
        assert_eq!(
            serde_json::to_string(&AlertMode::LSelect).unwrap(),
            "\"lselect\""
        );
        assert_eq!(serde_json::to_string(&ColorMode::Xy).unwrap(), "\"xy\"");
    }
}
