// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state snapshots.

use serde_json::Value;

use crate::bridge::RawLightState;
use crate::types::{AlertMode, ColorMode, EffectMode};

/// The full set of last-known attribute values for one light.
///
/// Every field is independently optional because the bridge only reports
/// what a given light model supports. Field declaration order is the
/// canonical serialization order; `None` fields are skipped, so two
/// snapshots serialize identically iff they carry the same values - the
/// publish-if-changed comparison relies on this.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LightState {
    /// Whether the light is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Brightness (0-254).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    /// Hue angle (0-65535).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    /// Saturation (0-254).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    /// Color temperature in mireds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    /// CIE x chromaticity coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// CIE y chromaticity coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Alert state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertMode>,
    /// Effect state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectMode>,
    /// Active color system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colormode: Option<ColorMode>,
    /// Whether the bridge can currently reach the light.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

impl LightState {
    /// Builds a snapshot from the bridge's raw state, applying the token
    /// normalization tables.
    #[must_use]
    pub fn from_raw(raw: &RawLightState) -> Self {
        Self {
            on: raw.on,
            bri: raw.bri,
            hue: raw.hue,
            sat: raw.sat,
            ct: raw.ct,
            x: raw.xy.map(|xy| xy[0]),
            y: raw.xy.map(|xy| xy[1]),
            alert: raw.alert.as_deref().map(AlertMode::from_bridge),
            effect: raw.effect.as_deref().map(EffectMode::from_bridge),
            colormode: raw.colormode.as_deref().map(ColorMode::from_bridge),
            reachable: raw.reachable,
        }
    }

    /// Returns `true` if the light is known to be on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on == Some(true)
    }

    /// The `val` convenience value: brightness while on, 0 otherwise.
    #[must_use]
    pub fn val(&self) -> u8 {
        if self.is_on() {
            self.bri.unwrap_or(0)
        } else {
            0
        }
    }

    /// Lists the present fields as `(name, value)` pairs for per-field
    /// publishing, in canonical order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        let mut push = |name, value: Option<Value>| {
            if let Some(v) = value {
                out.push((name, v));
            }
        };
        push("on", self.on.map(Value::from));
        push("bri", self.bri.map(Value::from));
        push("hue", self.hue.map(Value::from));
        push("sat", self.sat.map(Value::from));
        push("ct", self.ct.map(Value::from));
        push("x", self.x.map(Value::from));
        push("y", self.y.map(Value::from));
        push("alert", self.alert.map(|m| Value::from(m.as_wire())));
        push("effect", self.effect.map(|m| Value::from(m.as_wire())));
        push("colormode", self.colormode.map(|m| Value::from(m.as_wire())));
        push("reachable", self.reachable.map(Value::from));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawLightState {
        RawLightState {
            on: Some(true),
            bri: Some(200),
            hue: Some(10_000),
            sat: Some(254),
            ct: Some(366),
            xy: Some([0.4, 0.5]),
            alert: Some("unknown".to_string()),
            effect: Some("colorloop".to_string()),
            colormode: Some("hue_saturation".to_string()),
            reachable: Some(true),
        }
    }

    #[test]
    fn from_raw_normalizes_tokens() {
        let state = LightState::from_raw(&raw());
        assert_eq!(state.alert, Some(AlertMode::None));
        assert_eq!(state.effect, Some(EffectMode::Colorloop));
        assert_eq!(state.colormode, Some(ColorMode::Hs));
        assert_eq!(state.x, Some(0.4));
        assert_eq!(state.y, Some(0.5));
    }

    #[test]
    fn val_is_zero_while_off() {
        let mut state = LightState::from_raw(&raw());
        assert_eq!(state.val(), 200);
        state.on = Some(false);
        assert_eq!(state.val(), 0);
        state.on = None;
        assert_eq!(state.val(), 0);
    }

    #[test]
    fn canonical_serialization_is_stable() {
        let state = LightState::from_raw(&raw());
        let a = serde_json::to_string(&state).unwrap();
        let b = serde_json::to_string(&state.clone()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("{\"on\":true,\"bri\":200"));
    }

    #[test]
    fn none_fields_are_skipped() {
        let state = LightState {
            on: Some(false),
            ..LightState::default()
        };
        assert_eq!(serde_json::to_string(&state).unwrap(), "{\"on\":false}");
        assert_eq!(state.fields(), vec![("on", Value::from(false))]);
    }
}
