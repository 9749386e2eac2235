// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `huelink` - A gateway daemon mirroring a Philips Hue bridge onto MQTT.
//!
//! The gateway keeps the last-known state of every light on a Hue bridge
//! published (retained) on an MQTT broker, and translates MQTT commands back
//! into bridge state mutations. It is a best-effort, last-value-wins
//! synchronizer: state flows from the bridge cache to the broker with
//! publish-if-changed deduplication, and commands flow from the broker to
//! the bridge without retries or delivery guarantees.
//!
//! # Topic scheme
//!
//! Under a configurable prefix (default `hue/`):
//!
//! ```text
//! hue/status/lights/<name>          <- retained JSON snapshot per light
//! hue/status/lights/<name>/<field>  <- retained {"val": ...} (optional mode)
//! hue/connected                     <- "0" (will) / "1" (bridge down) / "2" (bridge up)
//! hue/set/lights/<name>             -> brightness scalar or JSON object
//! hue/set/lights/<name>/<field>     -> scalar for one field
//! hue/set/groups/<name-or-0>        -> same, for a group ("0" = all lights)
//! ```
//!
//! # Architecture
//!
//! Two independent event sources feed one dispatch loop:
//!
//! ```text
//! Hue bridge (CLIP REST) --- heartbeat poll ---> BridgeEvent ---+
//!                                                               |--> gateway loop
//! MQTT broker (rumqttc) --- event loop task ---> BusEvent ------+       |
//!                                                                       v
//!                     ConnectionSupervisor / StatePublisher / CommandRouter
//! ```
//!
//! The three engine components are pure: the [`bridge::ConnectionSupervisor`]
//! maps bridge lifecycle events to action lists, the [`command::CommandRouter`]
//! maps inbound messages to bridge requests, and the [`publish::StatePublisher`]
//! maps cache updates to outbound messages. Only the gateway loop performs IO.
//!
//! # Running the gateway
//!
//! ```no_run
//! use huelink::Config;
//!
//! #[tokio::main]
//! async fn main() -> huelink::Result<()> {
//!     let config = Config::from_env()?;
//!     huelink::gateway::run(config).await
//! }
//! ```

pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mqtt;
pub mod publish;
pub mod resource;
pub mod state;
pub mod types;

pub use config::Config;
pub use error::{BridgeError, ConfigError, Error, MqttError, ParseError, Result, ValueError};
pub use resource::{Inventory, ResourceAddress, ResourceKind, ResourceTarget};
pub use state::{LightState, LightUpdate, ResourceStore};
