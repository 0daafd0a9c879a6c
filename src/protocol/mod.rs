// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transports.
//!
//! The synchronization client only needs four operations from a transport:
//! connect, subscribe to a topic, publish bytes on a topic and disconnect.
//! [`Transport`] opens a session and [`TransportHandle`] operates on it.
//!
//! # Transports
//!
//! - [`MqttTransport`]: MQTT via `rumqttc` (feature `mqtt`, enabled by default)
//! - [`MemoryTransport`]: in-process loopback, for tests and simulations
//!
//! # Subscriptions
//!
//! A [`Subscription`] is a lazy, push-driven sequence of [`RawMessage`]s for
//! one topic. It never ends on its own while the session is alive. A failure
//! after subscribing is delivered as a single `Err` item, after which the
//! sequence is finished.

mod memory;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use memory::{MemoryHandle, MemoryTransport};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttConfigBuilder, MqttHandle, MqttTransport};

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::ProtocolError;

/// Buffer size of a subscription channel.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

/// Sending half of a [`Subscription`], held by transport implementations.
pub type SubscriptionSender = mpsc::Sender<Result<RawMessage, ProtocolError>>;

/// A message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    topic: String,
    payload: Vec<u8>,
}

impl RawMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the topic the message arrived on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Stream of messages for one subscribed topic.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<Result<RawMessage, ProtocolError>>,
    finished: bool,
}

impl Subscription {
    /// Creates a subscription and the sender that feeds it.
    #[must_use]
    pub fn channel(topic: impl Into<String>) -> (SubscriptionSender, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let subscription = Self {
            topic: topic.into(),
            rx,
            finished: false,
        };
        (tx, subscription)
    }

    /// Returns the subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once the transport dropped the subscription, and after
    /// an error has been yielded.
    pub async fn next(&mut self) -> Option<Result<RawMessage, ProtocolError>> {
        if self.finished {
            return None;
        }

        let item = self.rx.recv().await;
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
            self.rx.close();
        }
        item
    }
}

/// A transport that can open a session.
pub trait Transport: Send + Sync + 'static {
    /// The session handle returned by [`connect`](Self::connect).
    type Handle: TransportHandle;

    /// Establishes a session.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the session cannot be established.
    fn connect(&self) -> impl Future<Output = Result<Self::Handle, ProtocolError>> + Send;
}

/// An open transport session.
pub trait TransportHandle: Send + Sync + 'static {
    /// Subscribes to a topic.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription request fails.
    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Subscription, ProtocolError>> + Send;

    /// Publishes a payload on a topic.
    ///
    /// Best effort: no ordering is guaranteed relative to other publishers.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be handed to the transport.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Releases the session. Calling it again is a no-op.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_yields_messages_in_order() {
        let (tx, mut sub) = Subscription::channel("yogurt/status");
        tx.send(Ok(RawMessage::new("yogurt/status", "IDLE")))
            .await
            .unwrap();
        tx.send(Ok(RawMessage::new("yogurt/status", "RUNNING")))
            .await
            .unwrap();

        assert_eq!(sub.next().await.unwrap().unwrap().payload(), b"IDLE");
        assert_eq!(sub.next().await.unwrap().unwrap().payload(), b"RUNNING");
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_dropped() {
        let (tx, mut sub) = Subscription::channel("yogurt/status");
        drop(tx);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn subscription_error_is_terminal() {
        let (tx, mut sub) = Subscription::channel("yogurt/temperature");
        tx.send(Err(ProtocolError::ChannelClosed("gone".to_string())))
            .await
            .unwrap();
        let _ = tx.send(Ok(RawMessage::new("yogurt/temperature", "40"))).await;

        assert!(matches!(sub.next().await, Some(Err(_))));
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn raw_message_accessors() {
        let msg = RawMessage::new("yogurt/temperature", "41.8");
        assert_eq!(msg.topic(), "yogurt/temperature");
        assert_eq!(msg.payload(), b"41.8");
    }
}
