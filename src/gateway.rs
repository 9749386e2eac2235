// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The gateway dispatch loop.
//!
//! One `tokio::select!` loop consumes three channels - bridge events, bus
//! events, and timer wakeups - and is the only place IO happens. The pure
//! components (supervisor, router, publisher) run inside it; bridge HTTP
//! calls and timers run as spawned tasks feeding events back in.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval, interval_at, sleep};

use crate::bridge::{
    BridgeDescriptor, BridgeEvent, BridgeTransport, CacheUpdate, ConnectionSupervisor,
    CredentialStore, HueHttpBridge, HEARTBEAT_INTERVAL, RawGroup, RawLight, RawScene, SETTLE_DELAY,
    SupervisorAction,
};
use crate::command::{Command, CommandRouter};
use crate::config::Config;
use crate::error::{BridgeError, Error};
use crate::mqtt::{BusEvent, LIVENESS_INTERVAL, MqttLink};
use crate::publish::{OutboundMessage, StatePublisher, connected_message};
use crate::resource::{Inventory, ResourceTarget};
use crate::state::{ResourceStore, TransitionCache};

/// Device type presented when creating an application key.
const DEVICE_TYPE: &str = "huelink#gateway";

/// How often the pushlink poll retries within the window.
const PUSHLINK_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long pushlink polling continues before giving up. Matches the
/// bridge's own link-button window.
const PUSHLINK_WINDOW: Duration = Duration::from_secs(30);

/// Event channel capacity for bridge events and timers.
const CHANNEL_CAPACITY: usize = 64;

/// Shared caches owned by the gateway, one lock per structure.
#[derive(Debug, Default)]
pub struct GatewayContext {
    /// The bridge resource inventory (lights, groups, scenes).
    pub inventory: RwLock<Inventory>,
    /// Last-known snapshots per resource.
    pub store: Mutex<ResourceStore>,
    /// Sticky per-resource transition times.
    pub transitions: Mutex<TransitionCache>,
}

/// Wakeups from the delayed-task timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    /// A reconnect delay elapsed; carries the generation it was scheduled
    /// under so superseded timers are no-ops.
    ReconnectDue(u64),
    /// The post-connect settle delay elapsed.
    InitialReport,
}

/// One iteration's input, selected before dispatch so the event futures
/// are released by the time a handler borrows the gateway.
enum Step {
    Bridge(Option<BridgeEvent>),
    Bus(Option<BusEvent>),
    Timer(Option<TimerEvent>),
    Liveness,
}

/// Runs the gateway against the production HTTP bridge transport until a
/// fatal error occurs.
///
/// # Errors
///
/// Returns `Error::Fatal` for unrecoverable startup conditions (no bridge,
/// ambiguous selection, unmatched selector) and transport errors raised
/// during setup.
pub async fn run(config: Config) -> Result<(), Error> {
    let transport = HueHttpBridge::new()?;
    Gateway::new(config, transport)?.run().await
}

/// The gateway: pure components plus the IO shell around them.
pub struct Gateway<B: BridgeTransport + 'static> {
    config: Config,
    transport: Arc<B>,
    context: Arc<GatewayContext>,
    supervisor: ConnectionSupervisor,
    credentials: CredentialStore,
    publisher: StatePublisher,
    router: CommandRouter,
    mqtt: MqttLink,
    bus_rx: mpsc::Receiver<BusEvent>,
    bridge_tx: mpsc::Sender<BridgeEvent>,
    bridge_rx: mpsc::Receiver<BridgeEvent>,
    timer_tx: mpsc::Sender<TimerEvent>,
    timer_rx: mpsc::Receiver<TimerEvent>,
    reconnect_generation: u64,
    heartbeat: Option<JoinHandle<()>>,
    bridge_connected: bool,
}

impl<B: BridgeTransport + 'static> Gateway<B> {
    /// Builds the gateway and opens the bus link.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn new(config: Config, transport: B) -> Result<Self, Error> {
        let credentials = CredentialStore::load(&config.credentials_file);
        let (mqtt, bus_rx) = MqttLink::connect(
            &config.mqtt_url,
            &config.mqtt_client_id,
            &config.topic_prefix,
        )?;
        let (bridge_tx, bridge_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (timer_tx, timer_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let supervisor =
            ConnectionSupervisor::new(config.bridge_id.clone(), config.bridge_addr.clone());
        let publisher = StatePublisher::new(
            config.topic_prefix.clone(),
            config.publish_combined,
            config.publish_fields,
        );
        let router = CommandRouter::new(config.topic_prefix.clone());

        Ok(Self {
            config,
            transport: Arc::new(transport),
            context: Arc::new(GatewayContext::default()),
            supervisor,
            credentials,
            publisher,
            router,
            mqtt,
            bus_rx,
            bridge_tx,
            bridge_rx,
            timer_tx,
            timer_rx,
            reconnect_generation: 0,
            heartbeat: None,
            bridge_connected: false,
        })
    }

    /// Runs the dispatch loop until a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fatal` for unrecoverable startup conditions.
    pub async fn run(mut self) -> Result<(), Error> {
        self.start_discovery();
        let mut liveness = interval_at(Instant::now() + LIVENESS_INTERVAL, LIVENESS_INTERVAL);

        loop {
            let step = tokio::select! {
                event = self.bridge_rx.recv() => Step::Bridge(event),
                event = self.bus_rx.recv() => Step::Bus(event),
                event = self.timer_rx.recv() => Step::Timer(event),
                _ = liveness.tick() => Step::Liveness,
            };
            match step {
                Step::Bridge(Some(event)) => self.on_bridge_event(event).await?,
                Step::Bus(Some(event)) => self.on_bus_event(event).await,
                Step::Timer(Some(event)) => self.on_timer_event(event).await?,
                Step::Liveness => self.check_liveness(),
                // The senders live in this struct, so a closed channel
                // means the process is tearing down.
                Step::Bridge(None) | Step::Bus(None) | Step::Timer(None) => {
                    tracing::warn!("Event channel closed, stopping dispatch loop");
                    return Ok(());
                }
            }
        }
    }

    /// Kicks off bridge discovery, or synthesizes the result when the
    /// bridge address is configured explicitly.
    fn start_discovery(&self) {
        let events = self.bridge_tx.clone();
        if self.config.bridge_id.is_none()
            && let Some(address) = self.config.bridge_addr.clone()
        {
            tracing::info!(address = %address, "Using configured bridge address, skipping discovery");
            tokio::spawn(async move {
                let descriptor = BridgeDescriptor::from_address(address);
                let _ = events.send(BridgeEvent::Discovered(vec![descriptor])).await;
            });
            return;
        }

        tracing::info!("Searching for Hue bridges");
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.discover().await {
                Ok(candidates) => {
                    let _ = events.send(BridgeEvent::Discovered(candidates)).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Bridge discovery failed");
                    let _ = events.send(BridgeEvent::Discovered(Vec::new())).await;
                }
            }
        });
    }

    async fn on_bridge_event(&mut self, event: BridgeEvent) -> Result<(), Error> {
        if let BridgeEvent::CacheUpdated(update) = event {
            self.on_cache_updated(update).await;
            return Ok(());
        }
        let actions = self.supervisor.handle(event, &self.credentials);
        self.apply_actions(actions).await
    }

    async fn apply_actions(&mut self, actions: Vec<SupervisorAction>) -> Result<(), Error> {
        for action in actions {
            match action {
                SupervisorAction::Connect {
                    descriptor,
                    username,
                } => {
                    // A fresh attempt supersedes the heartbeat whose
                    // failures drove us here.
                    self.stop_heartbeat();
                    let transport = Arc::clone(&self.transport);
                    let events = self.bridge_tx.clone();
                    tokio::spawn(attempt_connect(transport, descriptor, username, events));
                }
                SupervisorAction::StartPushlink { descriptor } => {
                    let transport = Arc::clone(&self.transport);
                    let events = self.bridge_tx.clone();
                    tokio::spawn(run_pushlink(transport, descriptor.address, events));
                }
                SupervisorAction::PersistCredential {
                    descriptor,
                    username,
                } => {
                    if let Err(e) = self.credentials.remember(&descriptor, &username) {
                        tracing::warn!(error = %e, "Cannot persist bridge credential");
                    }
                }
                SupervisorAction::StartHeartbeat {
                    descriptor,
                    username,
                } => {
                    self.stop_heartbeat();
                    self.heartbeat = Some(tokio::spawn(run_heartbeat(
                        Arc::clone(&self.transport),
                        descriptor,
                        username,
                        Arc::clone(&self.context),
                        self.bridge_tx.clone(),
                    )));
                }
                SupervisorAction::ScheduleInitialReport => {
                    let timers = self.timer_tx.clone();
                    tokio::spawn(async move {
                        sleep(SETTLE_DELAY).await;
                        let _ = timers.send(TimerEvent::InitialReport).await;
                    });
                }
                SupervisorAction::ScheduleReconnect { delay } => {
                    self.reconnect_generation += 1;
                    let generation = self.reconnect_generation;
                    let timers = self.timer_tx.clone();
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = timers.send(TimerEvent::ReconnectDue(generation)).await;
                    });
                }
                SupervisorAction::SetBridgeState { connected } => {
                    self.bridge_connected = connected;
                    let message = connected_message(&self.config.topic_prefix, connected);
                    self.publish(message).await;
                }
                SupervisorAction::Fail { message } => {
                    return Err(Error::Fatal(message));
                }
            }
        }
        Ok(())
    }

    fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }

    async fn on_timer_event(&mut self, event: TimerEvent) -> Result<(), Error> {
        match event {
            TimerEvent::ReconnectDue(generation) => {
                if generation != self.reconnect_generation {
                    tracing::debug!(generation, "Stale reconnect timer, ignoring");
                    return Ok(());
                }
                let actions = self.supervisor.reconnect_due();
                self.apply_actions(actions).await
            }
            TimerEvent::InitialReport => {
                tracing::debug!("Settle delay elapsed, running initial full report");
                self.on_cache_updated(CacheUpdate::ALL).await;
                Ok(())
            }
        }
    }

    async fn on_cache_updated(&mut self, update: CacheUpdate) {
        tracing::debug!(?update, "Bridge cache updated");
        let inventory = self.context.inventory.read().clone();
        if update.lights {
            let messages = {
                let mut store = self.context.store.lock();
                self.publisher.report_lights(&inventory, &mut store)
            };
            for message in messages {
                self.publish(message).await;
            }
        }
        if update.groups {
            self.publisher.report_groups(&inventory);
        }
        if update.scenes {
            self.publisher.report_scenes(&inventory);
        }
    }

    async fn on_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected => {
                if let Err(e) = self.mqtt.subscribe_commands().await {
                    tracing::warn!(error = %e, "Cannot subscribe to command topics");
                }
                // Fresh subscribers see "bridge unreachable" until the
                // bridge lifecycle says otherwise.
                self.publish(connected_message(&self.config.topic_prefix, false))
                    .await;
                if self.bridge_connected {
                    self.publish(connected_message(&self.config.topic_prefix, true))
                        .await;
                }
            }
            BusEvent::Message {
                topic,
                payload,
                retained,
            } => self.on_bus_message(&topic, &payload, retained).await,
            BusEvent::Disconnected => {
                tracing::warn!("MQTT link lost, relying on automatic reconnect");
            }
        }
    }

    async fn on_bus_message(&mut self, topic: &str, payload: &[u8], retained: bool) {
        let routed = {
            let store = self.context.store.lock();
            let mut transitions = self.context.transitions.lock();
            self.router
                .route(topic, payload, retained, &store, &mut transitions)
        };
        match routed {
            Ok(Some(command)) => self.forward(command),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(topic, error = %e, "Dropping unparsable command");
            }
        }
    }

    /// Resolves a command's target and forwards the mutation to the
    /// bridge, fire-and-forget. Failures are logged, never retried: the
    /// next cache update is the source of truth.
    fn forward(&self, command: Command) {
        let Some((address, username)) = self.supervisor.endpoint() else {
            tracing::warn!(resource = %command.address, "Bridge not connected, dropping command");
            return;
        };
        let target = self.context.inventory.read().resolve(&command.address);
        let Some(target) = target else {
            tracing::warn!(resource = %command.address, "Unknown resource, dropping command");
            return;
        };

        let transport = Arc::clone(&self.transport);
        let update = command.update;
        let resource = command.address.path();
        tokio::spawn(async move {
            let result = match &target {
                ResourceTarget::Light(id) => {
                    transport
                        .set_light_state(&address, &username, id, &update)
                        .await
                }
                ResourceTarget::Group(id) => {
                    transport
                        .set_group_action(&address, &username, id, &update)
                        .await
                }
                ResourceTarget::AllLights => {
                    transport
                        .set_group_action(&address, &username, "0", &update)
                        .await
                }
            };
            match result {
                Ok(()) => tracing::debug!(resource, "Mutation accepted"),
                Err(e) => {
                    tracing::warn!(resource, error = %e, "Bridge rejected mutation, not retrying");
                }
            }
        });
    }

    fn check_liveness(&self) {
        if !self.mqtt.is_connected() {
            tracing::warn!("Should be connected to the MQTT broker but aren't, reconnecting");
        }
    }

    async fn publish(&self, message: OutboundMessage) {
        if let Err(e) = self.mqtt.publish(message).await {
            tracing::warn!(error = %e, "Publish failed");
        }
    }
}

/// Validates a credential against the bridge by fetching the lights list.
///
/// An unauthorized answer routes into the pushlink flow; anything else is
/// either success or a transient error for the supervisor to handle.
async fn attempt_connect<B: BridgeTransport>(
    transport: Arc<B>,
    descriptor: BridgeDescriptor,
    username: String,
    events: mpsc::Sender<BridgeEvent>,
) {
    match transport.fetch_lights(&descriptor.address, &username).await {
        Ok(_) => {
            let _ = events.send(BridgeEvent::Connected { username }).await;
        }
        Err(e) if e.api_code() == Some(BridgeError::UNAUTHORIZED) => {
            let _ = events.send(BridgeEvent::AuthenticationRequired).await;
        }
        Err(e) => {
            let _ = events.send(BridgeEvent::from_error(&e)).await;
        }
    }
}

/// Polls `create_user` for the duration of the pushlink window.
async fn run_pushlink<B: BridgeTransport>(
    transport: Arc<B>,
    address: String,
    events: mpsc::Sender<BridgeEvent>,
) {
    let deadline = Instant::now() + PUSHLINK_WINDOW;
    loop {
        match transport.create_user(&address, DEVICE_TYPE).await {
            Ok(username) => {
                let _ = events.send(BridgeEvent::Connected { username }).await;
                return;
            }
            Err(e) if e.api_code() == Some(BridgeError::PUSHLINK_PENDING) => {
                // Suppressed by the supervisor; sent anyway for the trace.
                let _ = events.send(BridgeEvent::from_error(&e)).await;
            }
            Err(e) => {
                let _ = events.send(BridgeEvent::from_error(&e)).await;
                return;
            }
        }
        if Instant::now() + PUSHLINK_POLL_INTERVAL >= deadline {
            let _ = events
                .send(BridgeEvent::Error {
                    code: None,
                    message: "pushlink window expired without button press".to_string(),
                })
                .await;
            return;
        }
        sleep(PUSHLINK_POLL_INTERVAL).await;
    }
}

/// The heartbeat: polls all resource categories, refreshes the shared
/// inventory, and emits a cache-updated event naming the categories whose
/// content actually changed. Poll failures surface as connection loss plus
/// an error event; the supervisor decides on the reconnect.
async fn run_heartbeat<B: BridgeTransport>(
    transport: Arc<B>,
    descriptor: BridgeDescriptor,
    username: String,
    context: Arc<GatewayContext>,
    events: mpsc::Sender<BridgeEvent>,
) {
    let mut ticker = interval(HEARTBEAT_INTERVAL);
    let mut last: Option<ResourceMaps> = None;
    let mut healthy = true;

    loop {
        ticker.tick().await;
        match fetch_all(transport.as_ref(), &descriptor.address, &username).await {
            Ok(current) => {
                healthy = true;
                let update = CacheUpdate {
                    lights: last.as_ref().is_none_or(|l| l.lights != current.lights),
                    groups: last.as_ref().is_none_or(|l| l.groups != current.groups),
                    scenes: last.as_ref().is_none_or(|l| l.scenes != current.scenes),
                };
                *context.inventory.write() =
                    Inventory::from_raw(&current.lights, &current.groups, &current.scenes);
                last = Some(current);
                if update.any() && events.send(BridgeEvent::CacheUpdated(update)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                if healthy {
                    healthy = false;
                    if events.send(BridgeEvent::ConnectionLost).await.is_err() {
                        return;
                    }
                }
                if events.send(BridgeEvent::from_error(&e)).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// One heartbeat's worth of raw resource maps.
struct ResourceMaps {
    lights: BTreeMap<String, RawLight>,
    groups: BTreeMap<String, RawGroup>,
    scenes: BTreeMap<String, RawScene>,
}

async fn fetch_all<B: BridgeTransport>(
    transport: &B,
    address: &str,
    username: &str,
) -> Result<ResourceMaps, BridgeError> {
    Ok(ResourceMaps {
        lights: transport.fetch_lights(address, username).await?,
        groups: transport.fetch_groups(address, username).await?,
        scenes: transport.fetch_scenes(address, username).await?,
    })
}
