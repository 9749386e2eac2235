// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound state publishing with change deduplication.
//!
//! The publisher turns bridge cache updates into retained status messages,
//! emitting at most one publish per actual state transition: the canonical
//! serialized form of every publish is remembered per topic and compared
//! before the next one goes out.

use std::collections::HashMap;

use rumqttc::QoS;

use crate::resource::Inventory;
use crate::state::{LightState, ResourceStore};

/// A message ready to be published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Full topic.
    pub topic: String,
    /// UTF-8 payload.
    pub payload: String,
    /// Delivery quality of service.
    pub qos: QoS,
    /// Whether the broker should retain the message.
    pub retain: bool,
}

impl OutboundMessage {
    /// A retained status message (QoS 0, the status stream's level).
    #[must_use]
    pub fn status(topic: String, payload: String) -> Self {
        Self {
            topic,
            payload,
            qos: QoS::AtMostOnce,
            retain: true,
        }
    }
}

/// Builds the retained `connected` signal message: `"2"` while the bridge
/// is reachable, `"1"` while it is not. The broker itself publishes `"0"`
/// as the gateway's last will.
#[must_use]
pub fn connected_message(prefix: &str, bridge_connected: bool) -> OutboundMessage {
    OutboundMessage {
        topic: format!("{prefix}connected"),
        payload: (if bridge_connected { "2" } else { "1" }).to_string(),
        qos: QoS::AtLeastOnce,
        retain: true,
    }
}

/// Combined snapshot payload: the `val` convenience member (brightness
/// while on, 0 otherwise) followed by the full state.
#[derive(serde::Serialize)]
struct StatusPayload<'a> {
    val: u8,
    state: &'a LightState,
}

/// Serializes snapshots canonically and emits publishes only on change.
#[derive(Debug)]
pub struct StatePublisher {
    prefix: String,
    publish_combined: bool,
    publish_fields: bool,
    /// Last published form per topic; the publish-if-changed table.
    published: HashMap<String, String>,
}

impl StatePublisher {
    /// Creates a publisher for the given topic prefix and mode toggles.
    #[must_use]
    pub fn new(prefix: impl Into<String>, publish_combined: bool, publish_fields: bool) -> Self {
        Self {
            prefix: prefix.into(),
            publish_combined,
            publish_fields,
            published: HashMap::new(),
        }
    }

    /// Reports the lights category: builds a snapshot per known light,
    /// records it in the store, and returns the messages whose canonical
    /// form differs from the previously published one.
    pub fn report_lights(
        &mut self,
        inventory: &Inventory,
        store: &mut ResourceStore,
    ) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        for entry in &inventory.lights {
            let state = LightState::from_raw(&entry.state);
            let path = format!("lights/{}", entry.name);

            if self.publish_combined {
                let payload = StatusPayload {
                    val: state.val(),
                    state: &state,
                };
                match serde_json::to_string(&payload) {
                    Ok(form) => {
                        let topic = format!("{}status/{path}", self.prefix);
                        self.push_if_changed(topic, form, &mut out);
                    }
                    Err(e) => {
                        tracing::warn!(path, error = %e, "Cannot serialize snapshot, skipping");
                    }
                }
            }

            if self.publish_fields {
                for (field, value) in state.fields() {
                    let topic = format!("{}status/{path}/{field}", self.prefix);
                    let form = serde_json::json!({ "val": value }).to_string();
                    self.push_if_changed(topic, form, &mut out);
                }
            }

            store.record(&path, state);
        }
        out
    }

    /// Reports the groups category: a log-only inventory listing, since
    /// groups carry no independently observable state here.
    pub fn report_groups(&self, inventory: &Inventory) {
        let listing: Vec<String> = inventory
            .groups
            .iter()
            .map(|g| format!("{}={}", g.id, g.name))
            .collect();
        tracing::info!(count = listing.len(), groups = %listing.join(", "), "Groups available");
    }

    /// Reports the scenes category, log-only like groups.
    pub fn report_scenes(&self, inventory: &Inventory) {
        let listing: Vec<String> = inventory
            .scenes
            .iter()
            .map(|s| format!("{}={}", s.id, s.name))
            .collect();
        tracing::info!(count = listing.len(), scenes = %listing.join(", "), "Scenes available");
    }

    fn push_if_changed(&mut self, topic: String, form: String, out: &mut Vec<OutboundMessage>) {
        if self.published.get(&topic) == Some(&form) {
            tracing::trace!(topic, "Unchanged, not publishing");
            return;
        }
        self.published.insert(topic.clone(), form.clone());
        out.push(OutboundMessage::status(topic, form));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RawLightState;
    use crate::resource::{GroupEntry, LightEntry};

    fn kitchen(bri: u8) -> LightEntry {
        LightEntry {
            id: "1".to_string(),
            name: "Kitchen".to_string(),
            state: RawLightState {
                on: Some(true),
                bri: Some(bri),
                colormode: Some("hue_saturation".to_string()),
                reachable: Some(true),
                ..RawLightState::default()
            },
        }
    }

    fn inventory(bri: u8) -> Inventory {
        Inventory {
            lights: vec![kitchen(bri)],
            groups: vec![GroupEntry {
                id: "0".to_string(),
                name: "All".to_string(),
            }],
            scenes: Vec::new(),
        }
    }

    #[test]
    fn identical_snapshots_publish_once() {
        let mut publisher = StatePublisher::new("hue/", true, false);
        let mut store = ResourceStore::new();

        let first = publisher.report_lights(&inventory(200), &mut store);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].topic, "hue/status/lights/Kitchen");
        assert!(first[0].retain);

        let second = publisher.report_lights(&inventory(200), &mut store);
        assert!(second.is_empty());
    }

    #[test]
    fn single_field_change_triggers_republish() {
        let mut publisher = StatePublisher::new("hue/", true, false);
        let mut store = ResourceStore::new();

        publisher.report_lights(&inventory(200), &mut store);
        let changed = publisher.report_lights(&inventory(201), &mut store);
        assert_eq!(changed.len(), 1);
        assert!(changed[0].payload.contains("\"bri\":201"));
    }

    #[test]
    fn payload_carries_val_and_normalized_state() {
        let mut publisher = StatePublisher::new("hue/", true, false);
        let mut store = ResourceStore::new();

        let messages = publisher.report_lights(&inventory(200), &mut store);
        let payload = &messages[0].payload;
        assert!(payload.starts_with("{\"val\":200,\"state\":{\"on\":true"));
        assert!(payload.contains("\"colormode\":\"hs\""));
    }

    #[test]
    fn per_field_mode_deduplicates_per_field() {
        let mut publisher = StatePublisher::new("hue/", false, true);
        let mut store = ResourceStore::new();

        let first = publisher.report_lights(&inventory(200), &mut store);
        // on, bri, colormode, reachable are present.
        assert_eq!(first.len(), 4);
        assert!(
            first
                .iter()
                .any(|m| m.topic == "hue/status/lights/Kitchen/bri" && m.payload == "{\"val\":200}")
        );

        // Only the changed field publishes again.
        let second = publisher.report_lights(&inventory(150), &mut store);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].topic, "hue/status/lights/Kitchen/bri");
        assert_eq!(second[0].payload, "{\"val\":150}");
    }

    #[test]
    fn snapshots_are_recorded_in_the_store() {
        let mut publisher = StatePublisher::new("hue/", true, false);
        let mut store = ResourceStore::new();
        publisher.report_lights(&inventory(200), &mut store);

        let snapshot = store.get("lights/Kitchen").unwrap();
        assert_eq!(snapshot.state.bri, Some(200));
    }

    #[test]
    fn connected_message_values() {
        let up = connected_message("hue/", true);
        assert_eq!(up.topic, "hue/connected");
        assert_eq!(up.payload, "2");
        assert!(up.retain);
        assert_eq!(connected_message("hue/", false).payload, "1");
    }
}
