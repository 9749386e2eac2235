// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partial state mutation requests.

use crate::types::{
    AlertMode, Brightness, CieXy, ColorMode, ColorTemp, EffectMode, HueValue, Saturation,
    TransitionTime,
};

/// A partial attribute set describing a desired state change for one
/// resource.
///
/// Only the fields to change are set; the struct serializes directly into
/// the body of the bridge's state-mutation request (`None` fields skipped).
/// The `_inc` members are the bridge's relative forms.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LightUpdate {
    /// Turn the light on or off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Absolute brightness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<Brightness>,
    /// Absolute hue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<HueValue>,
    /// Absolute saturation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<Saturation>,
    /// Absolute color temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<ColorTemp>,
    /// Absolute chromaticity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<CieXy>,
    /// Alert mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertMode>,
    /// Effect mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectMode>,
    /// Color mode. The bridge treats this as read-only and rejects it;
    /// forwarded anyway so the rejection is the bridge's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colormode: Option<ColorMode>,
    /// Reachability. Read-only on the bridge, forwarded like `colormode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
    /// Transition time for this mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitiontime: Option<TransitionTime>,
    /// Relative brightness step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri_inc: Option<i16>,
    /// Relative hue step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue_inc: Option<i32>,
    /// Relative saturation step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat_inc: Option<i16>,
    /// Relative color temperature step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct_inc: Option<i32>,
}

impl LightUpdate {
    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_serializes_to_empty_object() {
        let update = LightUpdate::default();
        assert!(update.is_empty());
        assert_eq!(serde_json::to_string(&update).unwrap(), "{}");
    }

    #[test]
    fn set_fields_serialize_with_bridge_names() {
        let update = LightUpdate {
            on: Some(true),
            bri: Some(Brightness::new(200).unwrap()),
            transitiontime: Some(TransitionTime::new(20).unwrap()),
            ..LightUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            "{\"on\":true,\"bri\":200,\"transitiontime\":20}"
        );
    }

    #[test]
    fn relative_fields_serialize_with_inc_suffix() {
        let update = LightUpdate {
            bri_inc: Some(-20),
            ..LightUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), "{\"bri_inc\":-20}");
    }
}
