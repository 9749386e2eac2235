// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-known snapshots and sticky transition times, keyed by resource path.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::LightState;
use crate::types::TransitionTime;

/// One resource's last observed state and when it was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    /// The last-known state.
    pub state: LightState,
    /// When the gateway recorded it.
    pub observed_at: DateTime<Utc>,
}

/// In-memory mapping from resource path (e.g. `lights/Kitchen`) to the
/// last-known snapshot.
///
/// Written only by the publish pipeline on bridge notifications; read by
/// the command router to complete partial chromaticity commands.
#[derive(Debug, Default)]
pub struct ResourceStore {
    snapshots: HashMap<String, ResourceSnapshot>,
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new snapshot for a resource, stamping the current time.
    pub fn record(&mut self, path: &str, state: LightState) {
        self.snapshots.insert(
            path.to_string(),
            ResourceSnapshot {
                state,
                observed_at: Utc::now(),
            },
        );
    }

    /// Returns the last snapshot for a resource, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ResourceSnapshot> {
        self.snapshots.get(path)
    }

    /// Number of resources with a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if no snapshot has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Sticky per-resource transition times.
///
/// Set by `transitiontime` datapoint messages and attached to later
/// mutations for the same resource, since the bridge otherwise applies its
/// built-in default fade.
#[derive(Debug, Default)]
pub struct TransitionCache {
    entries: HashMap<String, TransitionTime>,
}

impl TransitionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers the transition time for a resource.
    pub fn set(&mut self, path: &str, value: TransitionTime) {
        self.entries.insert(path.to_string(), value);
    }

    /// Returns the cached transition time for a resource.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<TransitionTime> {
        self.entries.get(path).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_get() {
        let mut store = ResourceStore::new();
        assert!(store.is_empty());

        let state = LightState {
            on: Some(true),
            ..LightState::default()
        };
        store.record("lights/Kitchen", state.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("lights/Kitchen").unwrap().state, state);
        assert!(store.get("lights/Hallway").is_none());
    }

    #[test]
    fn record_replaces_previous_snapshot() {
        let mut store = ResourceStore::new();
        store.record("lights/Kitchen", LightState::default());
        let on = LightState {
            on: Some(true),
            ..LightState::default()
        };
        store.record("lights/Kitchen", on.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("lights/Kitchen").unwrap().state, on);
    }

    #[test]
    fn transition_cache_round_trip() {
        let mut cache = TransitionCache::new();
        assert!(cache.get("lights/Kitchen").is_none());

        cache.set("lights/Kitchen", TransitionTime::new(20).unwrap());
        assert_eq!(
            cache.get("lights/Kitchen"),
            Some(TransitionTime::new(20).unwrap())
        );
    }
}
