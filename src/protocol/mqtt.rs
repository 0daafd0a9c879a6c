// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport built on `rumqttc`.
//!
//! # Examples
//!
//! ```no_run
//! use yogurt_sync::protocol::{MqttConfig, MqttTransport};
//!
//! # fn example() -> Result<(), yogurt_sync::ProtocolError> {
//! let config = MqttConfig::builder()
//!     .broker("tcp://192.168.1.50:1883")
//!     .client_id("kitchen_display")
//!     .credentials("user", "password")
//!     .build()?;
//!
//! let transport = MqttTransport::new(config);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ProtocolError;
use crate::protocol::{RawMessage, Subscription, SubscriptionSender, Transport, TransportHandle};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Default MQTT port.
const DEFAULT_PORT: u16 = 1883;

/// Capacity of the rumqttc request channel.
const REQUEST_CAPACITY: usize = 10;

/// How long `disconnect` waits for the event loop to flush the DISCONNECT packet.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Subscriptions by exact topic.
type Routes = Arc<RwLock<HashMap<String, SubscriptionSender>>>;

/// Outcome of the connection handshake, sent once by the event loop.
type ConnAckSender = oneshot::Sender<Result<(), String>>;

/// Event-loop task of one connection; aborted when dropped.
#[derive(Debug)]
struct EventTask(JoinHandle<()>);

impl Drop for EventTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Connection parameters for an MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    host: String,
    port: u16,
    client_id: String,
    clean_session: bool,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl MqttConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> MqttConfigBuilder {
        MqttConfigBuilder::default()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the client identifier presented to the broker.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns whether the broker is asked for a clean session.
    #[must_use]
    pub fn clean_session(&self) -> bool {
        self.clean_session
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns how long `connect` waits for the broker's acknowledgment.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(self.clean_session);

        if let Some((ref username, ref password)) = self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Builder for [`MqttConfig`].
///
/// The broker is given either as a URL with [`broker`](Self::broker) or as
/// [`host`](Self::host) and [`port`](Self::port). A URL wins when both are set.
#[derive(Debug)]
pub struct MqttConfigBuilder {
    broker: Option<String>,
    host: String,
    port: u16,
    client_id: Option<String>,
    clean_session: bool,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttConfigBuilder {
    fn default() -> Self {
        Self {
            broker: None,
            host: String::new(),
            port: DEFAULT_PORT,
            client_id: None,
            clean_session: true,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl MqttConfigBuilder {
    /// Sets the broker URL (`mqtt://host:port`, `tcp://host:port` or `host[:port]`).
    #[must_use]
    pub fn broker(mut self, url: impl Into<String>) -> Self {
        self.broker = Some(url.into());
        self
    }

    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the client identifier (default: generated per process).
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the clean-session flag (default: `true`).
    #[must_use]
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.connection_timeout = duration;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns error if no broker is given or the URL port is invalid.
    pub fn build(self) -> Result<MqttConfig, ProtocolError> {
        let (host, port) = match self.broker {
            Some(ref url) => parse_mqtt_url(url)?,
            None => (self.host, self.port),
        };

        if host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = self.client_id.unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("yogurt_sync_{}_{}", std::process::id(), counter)
        });

        Ok(MqttConfig {
            host,
            port,
            client_id,
            clean_session: self.clean_session,
            credentials: self.credentials,
            keep_alive: self.keep_alive,
            connection_timeout: self.connection_timeout,
        })
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), DEFAULT_PORT)
    };

    Ok((host, port))
}

/// MQTT transport.
///
/// Every [`connect`](Transport::connect) opens a new broker connection with
/// the stored configuration.
#[derive(Debug, Clone)]
pub struct MqttTransport {
    config: MqttConfig,
}

impl MqttTransport {
    /// Creates a transport for the given broker.
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    /// Returns the broker configuration.
    #[must_use]
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

impl Transport for MqttTransport {
    type Handle = MqttHandle;

    async fn connect(&self) -> Result<MqttHandle, ProtocolError> {
        let config = &self.config;
        let (client, event_loop) = AsyncClient::new(config.mqtt_options(), REQUEST_CAPACITY);

        let routes: Routes = Arc::default();
        let connected = Arc::new(AtomicBool::new(false));
        let (connack_tx, connack_rx) = oneshot::channel();

        // Owned from here, so a cancelled connect does not leave the loop running.
        let event_task = EventTask(tokio::spawn(handle_mqtt_events(
            event_loop,
            Arc::clone(&routes),
            Arc::clone(&connected),
            connack_tx,
        )));

        let timeout = config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    host = %config.host,
                    port = %config.port,
                    client_id = %config.client_id,
                    "Connected to MQTT broker"
                );
            }
            Ok(Ok(Err(reason))) => {
                return Err(ProtocolError::ConnectionFailed(reason));
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(host = %config.host, port = %config.port, "MQTT connection timed out");
                return Err(ProtocolError::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
        }

        Ok(MqttHandle {
            client,
            routes,
            connected,
            released: AtomicBool::new(false),
            event_task: Mutex::new(Some(event_task)),
        })
    }
}

/// An open MQTT session.
#[derive(Debug)]
pub struct MqttHandle {
    client: AsyncClient,
    routes: Routes,
    connected: Arc<AtomicBool>,
    released: AtomicBool,
    event_task: Mutex<Option<EventTask>>,
}

impl MqttHandle {
    /// Returns whether the broker connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.released.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.released.load(Ordering::Acquire) {
            return Err(ProtocolError::ChannelClosed("MQTT session released".to_string()));
        }
        Ok(())
    }
}

impl TransportHandle for MqttHandle {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, ProtocolError> {
        self.ensure_open()?;

        // Route before subscribing so a retained message is not lost.
        let (tx, subscription) = Subscription::channel(topic);
        self.routes.write().insert(topic.to_string(), tx);

        if let Err(e) = self.client.subscribe(topic, QoS::AtLeastOnce).await {
            self.routes.write().remove(topic);
            return Err(ProtocolError::Mqtt(e));
        }

        tracing::debug!(topic = %topic, "Subscribed to MQTT topic");
        Ok(subscription)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        self.ensure_open()?;

        tracing::debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(&payload),
            "Publishing MQTT message"
        );

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(ProtocolError::Mqtt)
    }

    async fn disconnect(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!("Disconnecting from MQTT broker");

        // Dropping the senders ends every subscription.
        self.routes.write().clear();

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!(error = %e, "MQTT disconnect request failed");
        }

        let task = self.event_task.lock().take();
        if let Some(mut task) = task
            && tokio::time::timeout(DISCONNECT_GRACE, &mut task.0).await.is_err()
        {
            tracing::warn!("MQTT event loop did not stop, aborting it");
        }
        self.connected.store(false, Ordering::Release);
    }
}

/// Handles MQTT events for one connection.
async fn handle_mqtt_events(
    mut event_loop: EventLoop,
    routes: Routes,
    connected: Arc<AtomicBool>,
    connack_tx: ConnAckSender,
) {
    use rumqttc::{Event, Outgoing, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let tx = routes.read().get(&publish.topic).cloned();
                let Some(tx) = tx else {
                    tracing::trace!(topic = %publish.topic, "No subscription for topic");
                    continue;
                };

                tracing::debug!(
                    topic = %publish.topic,
                    payload = %String::from_utf8_lossy(&publish.payload),
                    "MQTT message received"
                );

                let message = RawMessage::new(publish.topic.clone(), publish.payload.to_vec());
                if tx.send(Ok(message)).await.is_err() {
                    routes.write().remove(&publish.topic);
                }
            }
            Ok(Event::Incoming(Packet::Disconnect) | Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!("MQTT connection closed");
                connected.store(false, Ordering::Release);
                routes.write().clear();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                connected.store(false, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(e.to_string()));
                }
                fail_subscriptions(&routes, &e.to_string()).await;
                break;
            }
        }
    }
}

/// Delivers a terminal error to every open subscription.
async fn fail_subscriptions(routes: &Routes, message: &str) {
    let drained: Vec<(String, SubscriptionSender)> = routes.write().drain().collect();

    for (topic, tx) in drained {
        let _ = tx
            .send(Err(ProtocolError::SubscribeFailed {
                topic,
                message: message.to_string(),
            }))
            .await;
    }
}
