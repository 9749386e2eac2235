// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT bus link.
//!
//! Wraps the rumqttc async client: packets from the broker become
//! [`BusEvent`]s on an mpsc channel consumed by the gateway loop, keeping
//! the bus-side event source single-consumer like the bridge side. The
//! gateway's last will is registered at connect time so the broker itself
//! reports `connected = 0` if the link drops for good.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::error::MqttError;
use crate::publish::OutboundMessage;

/// Fixed delay before retrying after a connection error.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Period of the are-we-actually-connected check.
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Broker keep-alive.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Capacity of the rumqttc request queue and the event channel.
const CHANNEL_CAPACITY: usize = 64;

/// Events delivered by the bus link to the gateway loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// The broker acknowledged our connection (initial or re-established).
    Connected,
    /// An inbound message on a subscribed topic.
    Message {
        /// Full topic.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
        /// Whether this is a broker-retained replay.
        retained: bool,
    },
    /// The connection dropped; the link keeps retrying on its own.
    Disconnected,
}

/// Handle to the MQTT connection.
#[derive(Debug)]
pub struct MqttLink {
    client: AsyncClient,
    prefix: String,
    connected: Arc<AtomicBool>,
}

impl MqttLink {
    /// Connects to the broker and spawns the event loop task.
    ///
    /// Returns the link handle and the event channel. The actual TCP
    /// connection is established asynchronously; a [`BusEvent::Connected`]
    /// arrives once the broker acknowledges.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL cannot be parsed.
    pub fn connect(
        url: &str,
        client_id: &str,
        prefix: &str,
    ) -> Result<(Self, mpsc::Receiver<BusEvent>), MqttError> {
        let (host, port) = parse_mqtt_url(url)?;
        tracing::info!(
            host = %host,
            port,
            client_id = %client_id,
            prefix = %prefix,
            "Connecting to MQTT broker"
        );

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        options.set_last_will(LastWill::new(
            format!("{prefix}connected"),
            "0",
            QoS::AtLeastOnce,
            true,
        ));

        let (client, event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_event_loop(
            event_loop,
            event_tx,
            Arc::clone(&connected),
        ));

        Ok((
            Self {
                client,
                prefix: prefix.to_string(),
                connected,
            },
            event_rx,
        ))
    }

    /// Returns whether the broker connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Subscribes to the command hierarchy, `PREFIX set/#`.
    ///
    /// # Errors
    ///
    /// Returns error if the subscribe request cannot be queued.
    pub async fn subscribe_commands(&self) -> Result<(), MqttError> {
        let filter = format!("{}set/#", self.prefix);
        tracing::info!(filter = %filter, "Subscribing to command topics");
        self.client
            .subscribe(&filter, QoS::AtLeastOnce)
            .await
            .map_err(MqttError::Client)
    }

    /// Publishes one outbound message, fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns error if the publish request cannot be queued.
    pub async fn publish(&self, message: OutboundMessage) -> Result<(), MqttError> {
        tracing::debug!(
            topic = %message.topic,
            payload = %message.payload,
            retain = message.retain,
            "Publishing"
        );
        self.client
            .publish(message.topic, message.qos, message.retain, message.payload)
            .await
            .map_err(MqttError::Client)
    }
}

/// Drives the rumqttc event loop, converting packets into [`BusEvent`]s.
///
/// Poll errors are retried after a fixed delay; rumqttc re-establishes the
/// session on the next poll, so the loop never gives up on its own.
async fn run_event_loop(
    mut event_loop: EventLoop,
    events: mpsc::Sender<BusEvent>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("Connected to MQTT broker");
                connected.store(true, Ordering::Release);
                if events.send(BusEvent::Connected).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = BusEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                    retained: publish.retain,
                };
                if events.send(message).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                let was_connected = connected.swap(false, Ordering::AcqRel);
                tracing::warn!(
                    error = %e,
                    retry_in = ?RETRY_DELAY,
                    "MQTT connection error, will retry"
                );
                if was_connected && events.send(BusEvent::Disconnected).await.is_err() {
                    break;
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
    tracing::debug!("MQTT event loop stopped");
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), MqttError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| MqttError::InvalidAddress(format!("invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    if host.is_empty() {
        return Err(MqttError::InvalidAddress(url.to_string()));
    }
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mqtt_url_with_port() {
        let (host, port) = parse_mqtt_url("mqtt://192.168.1.50:1883").unwrap();
        assert_eq!(host, "192.168.1.50");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_mqtt_url_default_port() {
        let (host, port) = parse_mqtt_url("localhost").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 1883);
    }

    #[test]
    fn parse_mqtt_url_tcp_scheme() {
        let (host, port) = parse_mqtt_url("tcp://broker.local:8883").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 8883);
    }

    #[test]
    fn parse_mqtt_url_rejects_garbage() {
        assert!(parse_mqtt_url("mqtt://host:notaport").is_err());
        assert!(parse_mqtt_url("").is_err());
    }
}
