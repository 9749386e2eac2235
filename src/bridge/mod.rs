// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hue bridge side: transport capability, lifecycle events, supervision.
//!
//! The bridge speaks the CLIP v1 REST API. [`BridgeTransport`] is the
//! capability seam: the production implementation is [`HueHttpBridge`],
//! tests substitute mocks. Lifecycle and cache notifications arrive as
//! [`BridgeEvent`]s on a channel consumed by the gateway dispatch loop;
//! the [`ConnectionSupervisor`] turns them into actions.

mod credentials;
mod http;
mod supervisor;

use std::collections::BTreeMap;
use std::future::Future;

pub use credentials::{CredentialStore, PLACEHOLDER_USERNAME};
pub use http::HueHttpBridge;
pub use supervisor::{
    ConnectionState, ConnectionSupervisor, HEARTBEAT_INTERVAL, RECONNECT_DELAY, SETTLE_DELAY,
    SupervisorAction,
};

use crate::error::BridgeError;
use crate::state::LightUpdate;

/// A bridge found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDescriptor {
    /// The bridge's serial-number id, when discovery reports one.
    pub id: Option<String>,
    /// IP address or hostname.
    pub address: String,
}

impl BridgeDescriptor {
    /// Creates a descriptor from an address alone (explicitly configured
    /// bridges have no discovery id).
    #[must_use]
    pub fn from_address(address: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
        }
    }
}

/// Raw state of a light as reported by the bridge.
///
/// Tokens are kept verbatim here; normalization happens when building a
/// [`LightState`](crate::state::LightState) snapshot.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct RawLightState {
    /// Whether the light is on.
    pub on: Option<bool>,
    /// Brightness (0-254).
    pub bri: Option<u8>,
    /// Hue angle (0-65535).
    pub hue: Option<u16>,
    /// Saturation (0-254).
    pub sat: Option<u8>,
    /// Color temperature in mireds.
    pub ct: Option<u16>,
    /// CIE chromaticity pair.
    pub xy: Option<[f64; 2]>,
    /// Raw alert token.
    pub alert: Option<String>,
    /// Raw effect token.
    pub effect: Option<String>,
    /// Raw color mode token.
    pub colormode: Option<String>,
    /// Whether the bridge can reach the light.
    pub reachable: Option<bool>,
}

/// A light as listed by the bridge.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct RawLight {
    /// Display name.
    pub name: String,
    /// Last-known state.
    #[serde(default)]
    pub state: RawLightState,
}

/// A group as listed by the bridge.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct RawGroup {
    /// Display name.
    pub name: String,
}

/// A scene as listed by the bridge.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct RawScene {
    /// Display name.
    pub name: String,
}

/// Which resource-cache categories changed in a heartbeat cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUpdate {
    /// The lights cache changed.
    pub lights: bool,
    /// The groups cache changed.
    pub groups: bool,
    /// The scenes cache changed.
    pub scenes: bool,
}

impl CacheUpdate {
    /// A cache update covering every category (the initial full report).
    pub const ALL: Self = Self {
        lights: true,
        groups: true,
        scenes: true,
    };

    /// Returns `true` if any category changed.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.lights || self.groups || self.scenes
    }
}

/// Lifecycle and cache events delivered to the gateway dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// Discovery finished with these candidates.
    Discovered(Vec<BridgeDescriptor>),
    /// The bridge rejected the stored credential; pushlink is needed.
    AuthenticationRequired,
    /// A connection attempt succeeded with this (possibly newly assigned)
    /// username.
    Connected {
        /// The bridge-assigned application key.
        username: String,
    },
    /// The bridge stopped answering.
    ConnectionLost,
    /// The resource cache changed.
    CacheUpdated(CacheUpdate),
    /// A connection or API error.
    Error {
        /// CLIP error type, when the bridge itself reported the failure.
        code: Option<u16>,
        /// Human-readable description.
        message: String,
    },
}

impl BridgeEvent {
    /// Builds an error event from a transport error.
    #[must_use]
    pub fn from_error(err: &BridgeError) -> Self {
        Self::Error {
            code: err.api_code(),
            message: err.to_string(),
        }
    }
}

/// Capability interface to the lighting bridge.
///
/// Methods are stateless with respect to the connection: the caller passes
/// the bridge address and application key on every call, so a reconnect is
/// nothing more than calling with the remembered descriptor again.
pub trait BridgeTransport: Send + Sync {
    /// Discovers bridges on the local network.
    fn discover(
        &self,
    ) -> impl Future<Output = Result<Vec<BridgeDescriptor>, BridgeError>> + Send;

    /// Asks the bridge to create an application key.
    ///
    /// Fails with CLIP error type 101 while the link button has not been
    /// pressed.
    fn create_user(
        &self,
        address: &str,
        devicetype: &str,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Fetches all lights with their current state.
    fn fetch_lights(
        &self,
        address: &str,
        username: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, RawLight>, BridgeError>> + Send;

    /// Fetches all groups.
    fn fetch_groups(
        &self,
        address: &str,
        username: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, RawGroup>, BridgeError>> + Send;

    /// Fetches all scenes.
    fn fetch_scenes(
        &self,
        address: &str,
        username: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, RawScene>, BridgeError>> + Send;

    /// Applies a partial state mutation to one light.
    fn set_light_state(
        &self,
        address: &str,
        username: &str,
        id: &str,
        update: &LightUpdate,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Applies a partial state mutation to one group.
    ///
    /// Group `0` is the bridge's built-in broadcast group covering every
    /// light.
    fn set_group_action(
        &self,
        address: &str,
        username: &str,
        id: &str,
        update: &LightUpdate,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
