// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted bridge credentials.
//!
//! The bridge assigns an application key ("username") on pushlink; it must
//! be presented on every later connection. One key is stored per bridge,
//! keyed by the bridge id when discovery reported one, else by its address.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::BridgeDescriptor;

/// Username presented before the bridge has assigned one.
///
/// The bridge rejects it as unauthorized, which is what routes a fresh
/// installation into the pushlink flow.
pub const PLACEHOLDER_USERNAME: &str = "huelinkuser";

/// Credential store persisted as a JSON object mapping bridge id (or
/// address) to the assigned username.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Loads the store from `path`.
    ///
    /// A missing file yields an empty store; an unreadable or malformed
    /// file is logged and treated as empty (the worst case is one more
    /// pushlink).
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Malformed credentials file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read credentials file, starting empty");
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Resolves the username for a bridge: by id first, by address as
    /// fallback, defaulting to [`PLACEHOLDER_USERNAME`].
    #[must_use]
    pub fn lookup(&self, descriptor: &BridgeDescriptor) -> String {
        descriptor
            .id
            .as_ref()
            .and_then(|id| self.entries.get(id))
            .or_else(|| self.entries.get(&descriptor.address))
            .cloned()
            .unwrap_or_else(|| PLACEHOLDER_USERNAME.to_string())
    }

    /// Persists the username assigned for a bridge.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be written; the in-memory
    /// entry is kept either way so the running session stays authenticated.
    pub fn remember(
        &mut self,
        descriptor: &BridgeDescriptor,
        username: &str,
    ) -> io::Result<()> {
        let key = descriptor
            .id
            .clone()
            .unwrap_or_else(|| descriptor.address.clone());
        self.entries.insert(key, username.to_string());
        self.save()
    }

    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: Option<&str>, address: &str) -> BridgeDescriptor {
        BridgeDescriptor {
            id: id.map(ToString::to_string),
            address: address.to_string(),
        }
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(&dir.path().join("credentials.json"));
        let user = store.lookup(&descriptor(Some("abc"), "192.168.1.40"));
        assert_eq!(user, PLACEHOLDER_USERNAME);
    }

    #[test]
    fn remember_then_lookup_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let desc = descriptor(Some("abc"), "192.168.1.40");

        let mut store = CredentialStore::load(&path);
        store.remember(&desc, "assigned-user").unwrap();

        // A fresh load sees the persisted entry.
        let store = CredentialStore::load(&path);
        assert_eq!(store.lookup(&desc), "assigned-user");
    }

    #[test]
    fn id_hit_beats_address_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let mut store = CredentialStore::load(&path);
        store
            .remember(&descriptor(None, "192.168.1.40"), "by-address")
            .unwrap();
        store
            .remember(&descriptor(Some("abc"), "192.168.1.40"), "by-id")
            .unwrap();

        assert_eq!(
            store.lookup(&descriptor(Some("abc"), "192.168.1.40")),
            "by-id"
        );
        // Without an id the address entry still answers.
        assert_eq!(
            store.lookup(&descriptor(None, "192.168.1.40")),
            "by-address"
        );
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let store = CredentialStore::load(&path);
        assert_eq!(
            store.lookup(&descriptor(Some("abc"), "192.168.1.40")),
            PLACEHOLDER_USERNAME
        );
    }
}
