// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLIP v1 REST transport for the Hue bridge.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::{BridgeDescriptor, BridgeTransport, RawGroup, RawLight, RawScene};
use crate::error::BridgeError;
use crate::state::LightUpdate;

/// The N-UPnP discovery endpoint operated by the bridge vendor.
const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of the N-UPnP discovery response.
#[derive(Debug, serde::Deserialize)]
struct DiscoveryEntry {
    id: String,
    #[serde(rename = "internalipaddress")]
    internal_ip_address: String,
}

/// HTTP transport implementing [`BridgeTransport`] against CLIP v1.
#[derive(Debug, Clone)]
pub struct HueHttpBridge {
    client: Client,
    discovery_url: String,
}

impl HueHttpBridge {
    /// Creates a transport with the default discovery endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, BridgeError> {
        Self::with_discovery_url(DISCOVERY_URL)
    }

    /// Creates a transport against a custom discovery endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn with_discovery_url(discovery_url: impl Into<String>) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(BridgeError::Http)?;
        Ok(Self {
            client,
            discovery_url: discovery_url.into(),
        })
    }

    async fn fetch_resource_map<T: serde::de::DeserializeOwned>(
        &self,
        address: &str,
        username: &str,
        category: &str,
    ) -> Result<BTreeMap<String, T>, BridgeError> {
        let url = format!("http://{address}/api/{username}/{category}");
        let value: Value = self.client.get(&url).send().await?.json().await?;
        if let Some(err) = first_api_error(&value) {
            return Err(err);
        }
        serde_json::from_value(value)
            .map_err(|e| BridgeError::UnexpectedResponse(format!("{category}: {e}")))
    }

    async fn put_state(&self, url: &str, update: &LightUpdate) -> Result<(), BridgeError> {
        let value: Value = self
            .client
            .put(url)
            .json(update)
            .send()
            .await?
            .json()
            .await?;
        if let Some(err) = first_api_error(&value) {
            return Err(err);
        }
        Ok(())
    }
}

impl BridgeTransport for HueHttpBridge {
    async fn discover(&self) -> Result<Vec<BridgeDescriptor>, BridgeError> {
        let entries: Vec<DiscoveryEntry> = self
            .client
            .get(&self.discovery_url)
            .send()
            .await
            .map_err(|e| BridgeError::Discovery(e.to_string()))?
            .json()
            .await
            .map_err(|e| BridgeError::Discovery(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| BridgeDescriptor {
                id: Some(entry.id),
                address: entry.internal_ip_address,
            })
            .collect())
    }

    async fn create_user(&self, address: &str, devicetype: &str) -> Result<String, BridgeError> {
        let url = format!("http://{address}/api");
        let body = serde_json::json!({ "devicetype": devicetype });
        let value: Value = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = first_api_error(&value) {
            return Err(err);
        }
        value
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.pointer("/success/username"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| BridgeError::UnexpectedResponse(format!("create_user: {value}")))
    }

    async fn fetch_lights(
        &self,
        address: &str,
        username: &str,
    ) -> Result<BTreeMap<String, RawLight>, BridgeError> {
        self.fetch_resource_map(address, username, "lights").await
    }

    async fn fetch_groups(
        &self,
        address: &str,
        username: &str,
    ) -> Result<BTreeMap<String, RawGroup>, BridgeError> {
        self.fetch_resource_map(address, username, "groups").await
    }

    async fn fetch_scenes(
        &self,
        address: &str,
        username: &str,
    ) -> Result<BTreeMap<String, RawScene>, BridgeError> {
        self.fetch_resource_map(address, username, "scenes").await
    }

    async fn set_light_state(
        &self,
        address: &str,
        username: &str,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), BridgeError> {
        let url = format!("http://{address}/api/{username}/lights/{id}/state");
        tracing::debug!(url = %url, "Sending light state mutation");
        self.put_state(&url, update).await
    }

    async fn set_group_action(
        &self,
        address: &str,
        username: &str,
        id: &str,
        update: &LightUpdate,
    ) -> Result<(), BridgeError> {
        let url = format!("http://{address}/api/{username}/groups/{id}/action");
        tracing::debug!(url = %url, "Sending group action mutation");
        self.put_state(&url, update).await
    }
}

/// Extracts the first CLIP error object from a response, if any.
///
/// CLIP wraps mutation and creation results in an array of
/// `{"success": ...}` / `{"error": {...}}` items; resource GETs answer
/// with a plain object on success and the same error array on failure.
fn first_api_error(value: &Value) -> Option<BridgeError> {
    let items = value.as_array()?;
    for item in items {
        if let Some(error) = item.get("error") {
            let code = error
                .get("type")
                .and_then(Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or_default();
            let message = error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown bridge error")
                .to_string();
            return Some(BridgeError::Api { code, message });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_api_error_reads_clip_error_array() {
        let value: Value = serde_json::from_str(
            r#"[{"error":{"type":101,"address":"","description":"link button not pressed"}}]"#,
        )
        .unwrap();
        let err = first_api_error(&value).unwrap();
        assert_eq!(err.api_code(), Some(101));
    }

    #[test]
    fn first_api_error_ignores_success_items() {
        let value: Value =
            serde_json::from_str(r#"[{"success":{"/lights/1/state/on":true}}]"#).unwrap();
        assert!(first_api_error(&value).is_none());
    }

    #[test]
    fn first_api_error_ignores_plain_objects() {
        let value: Value = serde_json::from_str(r#"{"1":{"name":"Kitchen"}}"#).unwrap();
        assert!(first_api_error(&value).is_none());
    }

    #[test]
    fn discovery_entry_field_mapping() {
        let entry: DiscoveryEntry = serde_json::from_str(
            r#"{"id":"001788fffe23f618","internalipaddress":"192.168.1.40","port":443}"#,
        )
        .unwrap();
        assert_eq!(entry.internal_ip_address, "192.168.1.40");
        assert_eq!(entry.id, "001788fffe23f618");
    }
}
