// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource addressing and name resolution.
//!
//! Bus-side resources are addressed by a two-segment path, `lights/<name>`
//! or `groups/<name-or-id>`. Resolution maps an address onto a concrete
//! bridge resource; the literal group `0` is the synthetic all-lights
//! group, which exists on every bridge without being listed in its group
//! inventory.

use std::collections::BTreeMap;
use std::fmt;

use crate::bridge::{RawGroup, RawLight, RawScene};
use crate::error::ParseError;

/// Which namespace an address refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single light.
    Light,
    /// A group of lights.
    Group,
}

impl ResourceKind {
    /// Returns the plural path segment for this kind.
    #[must_use]
    pub const fn segment(&self) -> &'static str {
        match self {
            Self::Light => "lights",
            Self::Group => "groups",
        }
    }
}

/// A parsed bus-side resource address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    /// The namespace.
    pub kind: ResourceKind,
    /// Display name or raw identifier.
    pub name: String,
}

impl ResourceAddress {
    /// Parses a two-segment path such as `lights/Kitchen` or `groups/0`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::BadTopic` for unknown prefixes, missing names,
    /// or extra segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use huelink::resource::{ResourceAddress, ResourceKind};
    ///
    /// let addr = ResourceAddress::parse("lights/Kitchen").unwrap();
    /// assert_eq!(addr.kind, ResourceKind::Light);
    /// assert_eq!(addr.name, "Kitchen");
    /// assert!(ResourceAddress::parse("sensors/Door").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self, ParseError> {
        let Some((kind, name)) = path.split_once('/') else {
            return Err(ParseError::BadTopic(path.to_string()));
        };
        let kind = match kind {
            "lights" => ResourceKind::Light,
            "groups" => ResourceKind::Group,
            _ => return Err(ParseError::BadTopic(path.to_string())),
        };
        if name.is_empty() || name.contains('/') {
            return Err(ParseError::BadTopic(path.to_string()));
        }
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }

    /// Returns the canonical path form, `<kind>/<name>`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.kind.segment(), self.name)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.segment(), self.name)
    }
}

/// A concrete bridge resource an address resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    /// A single light, by bridge identifier.
    Light(String),
    /// A group, by bridge identifier.
    Group(String),
    /// The synthetic default group: mutations broadcast to all lights.
    AllLights,
}

/// One light known to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct LightEntry {
    /// Bridge identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Raw reported state.
    pub state: crate::bridge::RawLightState,
}

/// One group known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    /// Bridge identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One scene known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEntry {
    /// Bridge identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// The gateway's copy of the bridge resource cache.
///
/// Refreshed by the heartbeat; read by the resolver and the publisher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    /// All known lights, in bridge-id order.
    pub lights: Vec<LightEntry>,
    /// All known groups, in bridge-id order.
    pub groups: Vec<GroupEntry>,
    /// All known scenes, in bridge-id order.
    pub scenes: Vec<SceneEntry>,
}

impl Inventory {
    /// Builds an inventory from the bridge's raw resource maps.
    #[must_use]
    pub fn from_raw(
        lights: &BTreeMap<String, RawLight>,
        groups: &BTreeMap<String, RawGroup>,
        scenes: &BTreeMap<String, RawScene>,
    ) -> Self {
        Self {
            lights: lights
                .iter()
                .map(|(id, light)| LightEntry {
                    id: id.clone(),
                    name: light.name.clone(),
                    state: light.state.clone(),
                })
                .collect(),
            groups: groups
                .iter()
                .map(|(id, group)| GroupEntry {
                    id: id.clone(),
                    name: group.name.clone(),
                })
                .collect(),
            scenes: scenes
                .iter()
                .map(|(id, scene)| SceneEntry {
                    id: id.clone(),
                    name: scene.name.clone(),
                })
                .collect(),
        }
    }

    /// Resolves an address to a bridge resource.
    ///
    /// Display-name matches take precedence over raw-identifier matches,
    /// and `groups/0` is always the synthetic all-lights group, even when
    /// a group is literally named `0`.
    #[must_use]
    pub fn resolve(&self, address: &ResourceAddress) -> Option<ResourceTarget> {
        match address.kind {
            ResourceKind::Light => self
                .lights
                .iter()
                .find(|l| l.name == address.name)
                .or_else(|| self.lights.iter().find(|l| l.id == address.name))
                .map(|l| ResourceTarget::Light(l.id.clone())),
            ResourceKind::Group => {
                if address.name == "0" {
                    return Some(ResourceTarget::AllLights);
                }
                self.groups
                    .iter()
                    .find(|g| g.name == address.name)
                    .or_else(|| self.groups.iter().find(|g| g.id == address.name))
                    .map(|g| ResourceTarget::Group(g.id.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RawLightState;

    fn light(id: &str, name: &str) -> LightEntry {
        LightEntry {
            id: id.to_string(),
            name: name.to_string(),
            state: RawLightState::default(),
        }
    }

    fn group(id: &str, name: &str) -> GroupEntry {
        GroupEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn inventory() -> Inventory {
        Inventory {
            lights: vec![light("1", "Kitchen"), light("2", "1")],
            groups: vec![group("0", "All"), group("7", "Upstairs")],
            scenes: Vec::new(),
        }
    }

    #[test]
    fn parse_accepts_both_kinds() {
        let light = ResourceAddress::parse("lights/Kitchen").unwrap();
        assert_eq!(light.kind, ResourceKind::Light);
        let groups = ResourceAddress::parse("groups/0").unwrap();
        assert_eq!(groups.kind, ResourceKind::Group);
        assert_eq!(groups.path(), "groups/0");
    }

    #[test]
    fn parse_rejects_bad_paths() {
        assert!(ResourceAddress::parse("lights").is_err());
        assert!(ResourceAddress::parse("lights/").is_err());
        assert!(ResourceAddress::parse("sensors/Door").is_err());
        assert!(ResourceAddress::parse("lights/a/b").is_err());
    }

    #[test]
    fn name_match_beats_id_match() {
        // Light id "1" exists, but so does a light NAMED "1"; the name wins.
        let inv = inventory();
        let addr = ResourceAddress::parse("lights/1").unwrap();
        assert_eq!(inv.resolve(&addr), Some(ResourceTarget::Light("2".into())));
    }

    #[test]
    fn falls_back_to_id_match() {
        let inv = inventory();
        let addr = ResourceAddress::parse("groups/7").unwrap();
        assert_eq!(inv.resolve(&addr), Some(ResourceTarget::Group("7".into())));
    }

    #[test]
    fn group_zero_is_always_all_lights() {
        // Even with a real group carrying id "0" in the inventory.
        let inv = inventory();
        let addr = ResourceAddress::parse("groups/0").unwrap();
        assert_eq!(inv.resolve(&addr), Some(ResourceTarget::AllLights));
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let inv = inventory();
        let addr = ResourceAddress::parse("lights/Cellar").unwrap();
        assert_eq!(inv.resolve(&addr), None);
    }
}
