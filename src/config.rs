// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway configuration.
//!
//! All settings come from `HUELINK_*` environment variables, property
//! style. Bad values are fatal at startup; unset values fall back to
//! defaults that suit a single-bridge, local-broker installation.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime configuration of the gateway.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bridge selector by discovery id (`HUELINK_BRIDGE_ID`).
    pub bridge_id: Option<String>,
    /// Bridge selector by IP/hostname (`HUELINK_BRIDGE_ADDR`). When set
    /// without an id selector, discovery is skipped entirely.
    pub bridge_addr: Option<String>,
    /// MQTT broker URL (`HUELINK_MQTT_URL`).
    pub mqtt_url: String,
    /// MQTT client identifier (`HUELINK_MQTT_CLIENT_ID`).
    pub mqtt_client_id: String,
    /// Topic prefix with trailing slash (`HUELINK_TOPIC_PREFIX`).
    pub topic_prefix: String,
    /// Publish one retained message per field (`HUELINK_PUBLISH_FIELDS`).
    pub publish_fields: bool,
    /// Publish the combined snapshot (`HUELINK_PUBLISH_COMBINED`).
    pub publish_combined: bool,
    /// Credential store location (`HUELINK_CREDENTIALS_FILE`).
    pub credentials_file: PathBuf,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns error for malformed boolean values, or when no credentials
    /// file location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        let topic_prefix = normalize_prefix(&var_or("HUELINK_TOPIC_PREFIX", "hue"));
        let publish_fields = parse_bool(
            "HUELINK_PUBLISH_FIELDS",
            &var_or("HUELINK_PUBLISH_FIELDS", "false"),
        )?;
        let publish_combined = parse_bool(
            "HUELINK_PUBLISH_COMBINED",
            &var_or("HUELINK_PUBLISH_COMBINED", "true"),
        )?;
        let credentials_file = match env::var_os("HUELINK_CREDENTIALS_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_credentials_path()?,
        };

        Ok(Self {
            bridge_id: non_empty_var("HUELINK_BRIDGE_ID"),
            bridge_addr: non_empty_var("HUELINK_BRIDGE_ADDR"),
            mqtt_url: var_or("HUELINK_MQTT_URL", "mqtt://localhost:1883"),
            mqtt_client_id: var_or("HUELINK_MQTT_CLIENT_ID", "huelink"),
            topic_prefix,
            publish_fields,
            publish_combined,
            credentials_file,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

/// Appends the trailing slash the topic scheme expects.
fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn default_credentials_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("huelink").join("credentials.json"))
        .ok_or(ConfigError::NoCredentialsPath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gets_trailing_slash() {
        assert_eq!(normalize_prefix("hue"), "hue/");
        assert_eq!(normalize_prefix("hue/"), "hue/");
        assert_eq!(normalize_prefix("home/hue"), "home/hue/");
    }

    #[test]
    fn booleans_parse_loosely_but_fail_on_garbage() {
        assert!(parse_bool("X", "1").unwrap());
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(parse_bool("X", "yes").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(matches!(
            parse_bool("X", "maybe"),
            Err(ConfigError::InvalidBool { .. })
        ));
    }
}
