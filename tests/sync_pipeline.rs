// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests across the synchronization pipeline: bridge cache in,
//! retained publishes out, bus commands in, bridge mutation bodies out.

use std::collections::BTreeMap;

use serde_json::json;

use huelink::bridge::{
    BridgeDescriptor, BridgeEvent, ConnectionSupervisor, CredentialStore, PLACEHOLDER_USERNAME,
    RawGroup, RawLight, RawScene, SupervisorAction,
};
use huelink::command::CommandRouter;
use huelink::publish::StatePublisher;
use huelink::resource::{Inventory, ResourceTarget};
use huelink::state::{ResourceStore, TransitionCache};

fn raw_light(name: &str, on: bool, bri: u8) -> RawLight {
    serde_json::from_value(json!({
        "name": name,
        "state": {
            "on": on,
            "bri": bri,
            "alert": "none",
            "effect": "none",
            "colormode": "hue_saturation",
            "reachable": true
        }
    }))
    .unwrap()
}

fn raw_maps(bri: u8) -> (
    BTreeMap<String, RawLight>,
    BTreeMap<String, RawGroup>,
    BTreeMap<String, RawScene>,
) {
    let mut lights = BTreeMap::new();
    lights.insert("1".to_string(), raw_light("Kitchen", true, bri));
    lights.insert("2".to_string(), raw_light("Hallway", false, 0));
    let mut groups = BTreeMap::new();
    groups.insert(
        "7".to_string(),
        serde_json::from_value(json!({ "name": "Upstairs" })).unwrap(),
    );
    (lights, groups, BTreeMap::new())
}

#[test]
fn cache_change_produces_exactly_one_publish_per_transition() {
    let mut publisher = StatePublisher::new("hue/", true, false);
    let mut store = ResourceStore::new();

    let (lights, groups, scenes) = raw_maps(200);
    let inventory = Inventory::from_raw(&lights, &groups, &scenes);

    let first = publisher.report_lights(&inventory, &mut store);
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|m| m.retain));

    // The same cache content again: nothing to say.
    let repeat = publisher.report_lights(&inventory, &mut store);
    assert!(repeat.is_empty());

    // One light's brightness changes: exactly one new publish.
    let (lights, groups, scenes) = raw_maps(150);
    let inventory = Inventory::from_raw(&lights, &groups, &scenes);
    let changed = publisher.report_lights(&inventory, &mut store);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].topic, "hue/status/lights/Kitchen");
    assert!(changed[0].payload.contains("\"bri\":150"));
    assert!(changed[0].payload.contains("\"colormode\":\"hs\""));
}

#[test]
fn routed_command_serializes_into_the_bridge_mutation_body() {
    let router = CommandRouter::new("hue/");
    let store = ResourceStore::new();
    let mut transitions = TransitionCache::new();

    // Seed the sticky transition time, then send the brightness shorthand.
    router
        .route(
            "hue/set/lights/Kitchen/transitiontime",
            b"20",
            false,
            &store,
            &mut transitions,
        )
        .unwrap();
    let command = router
        .route(
            "hue/set/lights/Kitchen",
            b"100",
            false,
            &store,
            &mut transitions,
        )
        .unwrap()
        .unwrap();

    let body = serde_json::to_value(&command.update).unwrap();
    assert_eq!(body, json!({ "on": true, "bri": 100, "transitiontime": 20 }));
}

#[test]
fn routed_command_resolves_against_the_inventory() {
    let (lights, groups, scenes) = raw_maps(200);
    let inventory = Inventory::from_raw(&lights, &groups, &scenes);

    let router = CommandRouter::new("hue/");
    let store = ResourceStore::new();
    let mut transitions = TransitionCache::new();

    let by_name = router
        .route(
            "hue/set/lights/Hallway",
            br#"{"on":true}"#,
            false,
            &store,
            &mut transitions,
        )
        .unwrap()
        .unwrap();
    assert_eq!(
        inventory.resolve(&by_name.address),
        Some(ResourceTarget::Light("2".to_string()))
    );

    let broadcast = router
        .route(
            "hue/set/groups/0",
            br#"{"on":false}"#,
            false,
            &store,
            &mut transitions,
        )
        .unwrap()
        .unwrap();
    assert_eq!(
        inventory.resolve(&broadcast.address),
        Some(ResourceTarget::AllLights)
    );

    let unknown = router
        .route(
            "hue/set/lights/Cellar",
            br#"{"on":true}"#,
            false,
            &store,
            &mut transitions,
        )
        .unwrap()
        .unwrap();
    assert_eq!(inventory.resolve(&unknown.address), None);
}

#[test]
fn assigned_credential_survives_for_the_next_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let candidates = vec![BridgeDescriptor {
        id: Some("001788fffe23f618".to_string()),
        address: "192.168.1.40".to_string(),
    }];

    // First run: no stored credential, the placeholder goes out.
    let mut credentials = CredentialStore::load(&path);
    let mut supervisor = ConnectionSupervisor::new(None, None);
    let actions = supervisor.handle(BridgeEvent::Discovered(candidates.clone()), &credentials);
    match &actions[..] {
        [SupervisorAction::Connect { username, .. }] => {
            assert_eq!(username, PLACEHOLDER_USERNAME);
        }
        other => panic!("expected Connect, got {other:?}"),
    }

    // Pushlink assigns a username; the supervisor asks for persistence.
    let actions = supervisor.handle(
        BridgeEvent::Connected {
            username: "assigned-user".to_string(),
        },
        &credentials,
    );
    for action in actions {
        if let SupervisorAction::PersistCredential {
            descriptor,
            username,
        } = action
        {
            credentials.remember(&descriptor, &username).unwrap();
        }
    }

    // Second run, fresh process: the stored credential is used directly.
    let credentials = CredentialStore::load(&path);
    let mut supervisor = ConnectionSupervisor::new(None, None);
    let actions = supervisor.handle(BridgeEvent::Discovered(candidates), &credentials);
    match &actions[..] {
        [SupervisorAction::Connect { username, .. }] => {
            assert_eq!(username, "assigned-user");
        }
        other => panic!("expected Connect, got {other:?}"),
    }
}

#[test]
fn per_field_stream_tracks_individual_fields() {
    let mut publisher = StatePublisher::new("hue/", true, true);
    let mut store = ResourceStore::new();

    let (lights, groups, scenes) = raw_maps(200);
    let inventory = Inventory::from_raw(&lights, &groups, &scenes);
    publisher.report_lights(&inventory, &mut store);

    // A brightness change republishes the combined snapshot and only the
    // bri field message.
    let (lights, groups, scenes) = raw_maps(150);
    let inventory = Inventory::from_raw(&lights, &groups, &scenes);
    let changed = publisher.report_lights(&inventory, &mut store);

    let topics: Vec<&str> = changed.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec![
            "hue/status/lights/Kitchen",
            "hue/status/lights/Kitchen/bri",
        ]
    );
    assert_eq!(changed[1].payload, "{\"val\":150}");
}
