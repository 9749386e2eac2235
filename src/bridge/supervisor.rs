// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge connection supervision.
//!
//! [`ConnectionSupervisor`] owns the lifecycle of the single bridge
//! connection: discovery selection, credential resolution, pushlink,
//! heartbeat start, and reconnect-with-backoff. It is a pure state
//! machine - events in, [`SupervisorAction`]s out - so every transition
//! is testable without a bridge. The gateway dispatch loop executes the
//! actions.

use std::time::Duration;

use super::{BridgeDescriptor, BridgeEvent, CredentialStore, PLACEHOLDER_USERNAME};

/// Fixed delay before a reconnect attempt after a transient error.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Heartbeat period while connected (the bridge SDK's own interval).
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Settle delay between connecting and the first full resource report,
/// giving the first heartbeat time to populate the inventory.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Discovery is running.
    Searching,
    /// A bridge was selected; connecting.
    Found,
    /// Waiting for the link button to be pressed.
    AwaitingAuthentication,
    /// Connected and heartbeating.
    Connected,
    /// The bridge stopped answering.
    Lost,
}

/// Work the gateway loop performs on behalf of the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorAction {
    /// Attempt a connection: validate the credential against the bridge.
    Connect {
        /// Bridge to connect to.
        descriptor: BridgeDescriptor,
        /// Application key to present.
        username: String,
    },
    /// Start polling for pushlink authentication.
    StartPushlink {
        /// Bridge awaiting the link button.
        descriptor: BridgeDescriptor,
    },
    /// Persist a bridge-assigned credential.
    PersistCredential {
        /// Bridge the credential belongs to.
        descriptor: BridgeDescriptor,
        /// The assigned application key.
        username: String,
    },
    /// Start the periodic heartbeat against the connected bridge.
    StartHeartbeat {
        /// Connected bridge.
        descriptor: BridgeDescriptor,
        /// Application key to poll with.
        username: String,
    },
    /// Schedule the initial full resource report after the settle delay.
    ScheduleInitialReport,
    /// Schedule a reconnect attempt.
    ScheduleReconnect {
        /// How long to wait first.
        delay: Duration,
    },
    /// Reflect bridge reachability on the bus `connected` topic.
    SetBridgeState {
        /// `true` once connected, `false` on loss.
        connected: bool,
    },
    /// Unrecoverable startup condition; terminate the process.
    Fail {
        /// Operator-facing explanation.
        message: String,
    },
}

/// State machine governing the single outbound bridge connection.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    bridge_id: Option<String>,
    bridge_addr: Option<String>,
    state: ConnectionState,
    selected: Option<BridgeDescriptor>,
    username: Option<String>,
    reconnect_pending: bool,
}

impl ConnectionSupervisor {
    /// Creates a supervisor with the configured bridge selectors.
    #[must_use]
    pub fn new(bridge_id: Option<String>, bridge_addr: Option<String>) -> Self {
        Self {
            bridge_id,
            bridge_addr,
            state: ConnectionState::Searching,
            selected: None,
            username: None,
            reconnect_pending: false,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Address and application key of the connected bridge, if any.
    ///
    /// Used by the command forwarding path; `None` while not connected
    /// means mutations are dropped with a log line.
    #[must_use]
    pub fn endpoint(&self) -> Option<(String, String)> {
        if self.state != ConnectionState::Connected {
            return None;
        }
        match (&self.selected, &self.username) {
            (Some(descriptor), Some(username)) => {
                Some((descriptor.address.clone(), username.clone()))
            }
            _ => None,
        }
    }

    /// Consumes a bridge event and returns the actions to execute.
    pub fn handle(
        &mut self,
        event: BridgeEvent,
        credentials: &CredentialStore,
    ) -> Vec<SupervisorAction> {
        match event {
            BridgeEvent::Discovered(candidates) => self.on_discovered(&candidates, credentials),
            BridgeEvent::AuthenticationRequired => self.on_authentication_required(),
            BridgeEvent::Connected { username } => self.on_connected(username),
            BridgeEvent::ConnectionLost => self.on_connection_lost(),
            BridgeEvent::Error { code, message } => self.on_error(code, &message),
            // Cache updates go to the publisher, not the supervisor.
            BridgeEvent::CacheUpdated(_) => Vec::new(),
        }
    }

    /// Called when a scheduled reconnect timer fires.
    ///
    /// A timer that outlived its usefulness (connection already up, or a
    /// newer attempt superseded it) is a no-op.
    pub fn reconnect_due(&mut self) -> Vec<SupervisorAction> {
        self.reconnect_pending = false;
        if self.state == ConnectionState::Connected {
            tracing::debug!("Reconnect timer fired while connected, ignoring");
            return Vec::new();
        }
        let Some(descriptor) = self.selected.clone() else {
            return Vec::new();
        };
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_USERNAME.to_string());
        tracing::info!(address = %descriptor.address, "Reconnecting to bridge");
        vec![SupervisorAction::Connect {
            descriptor,
            username,
        }]
    }

    fn on_discovered(
        &mut self,
        candidates: &[BridgeDescriptor],
        credentials: &CredentialStore,
    ) -> Vec<SupervisorAction> {
        let descriptor = match self.select(candidates) {
            Ok(descriptor) => descriptor,
            Err(message) => return vec![SupervisorAction::Fail { message }],
        };
        let username = credentials.lookup(&descriptor);
        tracing::info!(address = %descriptor.address, "Connecting to Hue bridge");
        self.selected = Some(descriptor.clone());
        self.username = Some(username.clone());
        self.state = ConnectionState::Found;
        vec![SupervisorAction::Connect {
            descriptor,
            username,
        }]
    }

    fn on_authentication_required(&mut self) -> Vec<SupervisorAction> {
        let Some(descriptor) = self.selected.clone() else {
            return Vec::new();
        };
        self.state = ConnectionState::AwaitingAuthentication;
        tracing::warn!(
            address = %descriptor.address,
            "AUTHENTICATION REQUIRED - press the button on the Hue bridge within 30s"
        );
        vec![SupervisorAction::StartPushlink { descriptor }]
    }

    fn on_connected(&mut self, username: String) -> Vec<SupervisorAction> {
        let Some(descriptor) = self.selected.clone() else {
            return Vec::new();
        };
        tracing::info!(address = %descriptor.address, "Successfully connected to Hue bridge");
        self.username = Some(username.clone());
        self.state = ConnectionState::Connected;
        self.reconnect_pending = false;
        vec![
            SupervisorAction::PersistCredential {
                descriptor: descriptor.clone(),
                username: username.clone(),
            },
            SupervisorAction::SetBridgeState { connected: true },
            SupervisorAction::StartHeartbeat {
                descriptor,
                username,
            },
            SupervisorAction::ScheduleInitialReport,
        ]
    }

    fn on_connection_lost(&mut self) -> Vec<SupervisorAction> {
        if self.state == ConnectionState::Lost {
            return Vec::new();
        }
        tracing::warn!("Connection to bridge lost");
        self.state = ConnectionState::Lost;
        vec![SupervisorAction::SetBridgeState { connected: false }]
    }

    fn on_error(&mut self, code: Option<u16>, message: &str) -> Vec<SupervisorAction> {
        // Expected while the pushlink window is open; not an error.
        if code == Some(crate::error::BridgeError::PUSHLINK_PENDING) {
            tracing::debug!("Pushlink authentication pending");
            return Vec::new();
        }
        tracing::warn!(code = ?code, message = %message, "Bridge error");
        if self.selected.is_none() {
            return Vec::new();
        }
        if self.reconnect_pending {
            tracing::debug!("Reconnect already pending, not scheduling another");
            return Vec::new();
        }
        self.reconnect_pending = true;
        vec![SupervisorAction::ScheduleReconnect {
            delay: RECONNECT_DELAY,
        }]
    }

    /// Picks the bridge to connect to from the discovery result.
    fn select(&self, candidates: &[BridgeDescriptor]) -> Result<BridgeDescriptor, String> {
        if candidates.is_empty() {
            return Err("no Hue bridge found".to_string());
        }
        if let Some(wanted) = &self.bridge_id {
            return candidates
                .iter()
                .find(|c| {
                    c.id.as_deref()
                        .is_some_and(|id| id.eq_ignore_ascii_case(wanted))
                })
                .cloned()
                .ok_or_else(|| format!("configured bridge id {wanted} matches no discovered bridge"));
        }
        if let Some(wanted) = &self.bridge_addr {
            return candidates
                .iter()
                .find(|c| &c.address == wanted)
                .cloned()
                .ok_or_else(|| {
                    format!("configured bridge address {wanted} matches no discovered bridge")
                });
        }
        if let [sole] = candidates {
            return Ok(sole.clone());
        }
        let addresses: Vec<&str> = candidates.iter().map(|c| c.address.as_str()).collect();
        Err(format!(
            "multiple bridges found ({}); set HUELINK_BRIDGE_ID or HUELINK_BRIDGE_ADDR to disambiguate",
            addresses.join(", ")
        ))
    }
}
