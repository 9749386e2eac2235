// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `huelink` gateway.
//!
//! This module provides the error hierarchy for failures across the gateway:
//! value validation, command parsing, bridge communication, MQTT transport,
//! and configuration. Fatal startup errors carry their own variant because
//! they terminate the process rather than being retried.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while parsing a command topic or payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred while talking to the Hue bridge.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Error occurred on the MQTT link.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] MqttError),

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Unrecoverable startup error; the process must exit.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An enum field received a token outside its vocabulary.
    #[error("invalid {field} token: {token:?}")]
    InvalidToken {
        /// The field the token was meant for.
        field: &'static str,
        /// The rejected token.
        token: String,
    },

    /// A CIE chromaticity coordinate is outside [0, 1].
    #[error("chromaticity coordinate {0} is out of range [0, 1]")]
    InvalidCoordinate(f64),
}

/// Errors related to parsing command topics and payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A command topic does not follow the expected grammar.
    #[error("unparsable command topic: {0}")]
    BadTopic(String),

    /// A composite payload contained a field name outside the datapoint
    /// vocabulary.
    #[error("unknown datapoint: {0}")]
    UnknownDatapoint(String),

    /// The `_inc` suffix was used on a datapoint with no relative form.
    #[error("datapoint {0} has no _inc form")]
    RelativeUnsupported(String),

    /// A payload value has the wrong type or is not a valid number.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// The datapoint that failed to parse.
        field: String,
        /// Description of the failure.
        message: String,
    },
}

/// Errors related to Hue bridge communication.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The bridge reported an API error.
    ///
    /// Error type 101 is the pushlink-pending code ("link button not
    /// pressed") and type 1 is "unauthorized user".
    #[error("bridge error {code}: {message}")]
    Api {
        /// The CLIP error type.
        code: u16,
        /// The bridge's own description.
        message: String,
    },

    /// Bridge discovery failed.
    #[error("bridge discovery failed: {0}")]
    Discovery(String),

    /// The bridge answered with something unexpected.
    #[error("unexpected bridge response: {0}")]
    UnexpectedResponse(String),
}

impl BridgeError {
    /// CLIP error type for "unauthorized user".
    pub const UNAUTHORIZED: u16 = 1;

    /// CLIP error type for "link button not pressed".
    pub const PUSHLINK_PENDING: u16 = 101;

    /// Returns the CLIP error type, if this is a bridge-reported error.
    #[must_use]
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors related to the MQTT link.
#[derive(Debug, Error)]
pub enum MqttError {
    /// MQTT connection or communication failed.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Invalid broker URL.
    #[error("invalid broker address: {0}")]
    InvalidAddress(String),
}

/// Errors related to configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable holds an unrecognized value.
    #[error("{name} is not a boolean: {value:?}")]
    InvalidBool {
        /// The variable name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// No usable location for the credentials file.
    #[error("cannot determine a credentials file location; set HUELINK_CREDENTIALS_FILE")]
    NoCredentialsPath,
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 254,
            actual: 300,
        };
        assert_eq!(err.to_string(), "value 300 is out of range [0, 254]");
    }

    #[test]
    fn error_from_value_error() {
        let err: Error = ValueError::InvalidCoordinate(1.5).into();
        assert!(matches!(err, Error::Value(ValueError::InvalidCoordinate(_))));
    }

    #[test]
    fn bridge_api_code() {
        let err = BridgeError::Api {
            code: 101,
            message: "link button not pressed".to_string(),
        };
        assert_eq!(err.api_code(), Some(BridgeError::PUSHLINK_PENDING));
        assert_eq!(err.to_string(), "bridge error 101: link button not pressed");
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::UnknownDatapoint("brightness".to_string());
        assert_eq!(err.to_string(), "unknown datapoint: brightness");
    }
}
