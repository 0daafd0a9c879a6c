// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process loopback transport.
//!
//! [`MemoryTransport`] behaves like a broker living inside the process:
//! messages injected with [`MemoryTransport::inject`] reach every matching
//! subscription, and everything published through a handle is recorded and
//! looped back to subscribers of the same topic. Failures can be scripted to
//! exercise connect, subscribe and publish error paths.
//!
//! # Examples
//!
//! ```
//! use yogurt_sync::protocol::{MemoryTransport, Transport, TransportHandle};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = MemoryTransport::new();
//! let handle = transport.connect().await.unwrap();
//! let mut sub = handle.subscribe("yogurt/status").await.unwrap();
//!
//! transport.inject("yogurt/status", "RUNNING").await;
//! let msg = sub.next().await.unwrap().unwrap();
//! assert_eq!(msg.payload(), b"RUNNING");
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::error::ProtocolError;
use crate::protocol::{RawMessage, Subscription, SubscriptionSender, Transport, TransportHandle};

/// Loopback transport, cheaply cloneable.
///
/// All clones share the same broker state, so a test can keep one clone to
/// drive messages while the client owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemoryBroker>,
}

#[derive(Debug, Default)]
struct MemoryBroker {
    routes: RwLock<HashMap<String, Vec<SubscriptionSender>>>,
    published: Mutex<Vec<RawMessage>>,
    connect_failure: Mutex<Option<String>>,
    subscribe_failure: Mutex<Option<String>>,
    publish_failure: Mutex<Option<String>>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
    subscribe_stalled: AtomicBool,
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MemoryTransport {
    /// Creates an empty loopback broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `connect` fail with the given reason.
    pub fn fail_connect(&self, reason: impl Into<String>) {
        *self.inner.connect_failure.lock() = Some(reason.into());
    }

    /// Makes every following `subscribe` request fail with the given reason.
    pub fn fail_subscribe(&self, reason: impl Into<String>) {
        *self.inner.subscribe_failure.lock() = Some(reason.into());
    }

    /// Makes every following `publish` fail with the given reason.
    pub fn fail_publish(&self, reason: impl Into<String>) {
        *self.inner.publish_failure.lock() = Some(reason.into());
    }

    /// Holds the next `connect` until the returned gate is notified.
    #[must_use]
    pub fn hold_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inner.connect_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Makes every following `subscribe` request wait forever, like a broker
    /// that never acknowledges.
    pub fn stall_subscribe(&self) {
        self.inner.subscribe_stalled.store(true, Ordering::Release);
    }

    /// Delivers a message to every subscription on `topic`.
    ///
    /// Returns the number of subscriptions that received it.
    pub async fn inject(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.inner.deliver(RawMessage::new(topic, payload)).await
    }

    /// Terminates every open subscription with an error, as a broker dropping
    /// the connection would.
    pub async fn break_subscriptions(&self, reason: &str) {
        let routes: Vec<(String, Vec<SubscriptionSender>)> =
            self.inner.routes.write().drain().collect();

        for (topic, senders) in routes {
            for tx in senders {
                let _ = tx
                    .send(Err(ProtocolError::SubscribeFailed {
                        topic: topic.clone(),
                        message: reason.to_string(),
                    }))
                    .await;
            }
        }
    }

    /// Returns every message published through a handle, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<RawMessage> {
        self.inner.published.lock().clone()
    }

    /// Returns the number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .routes
            .read()
            .get(topic)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Returns whether a session is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns how many sessions were opened.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::Acquire)
    }

    /// Returns how many times `disconnect` was called on any handle.
    #[must_use]
    pub fn disconnect_calls(&self) -> usize {
        self.inner.disconnect_calls.load(Ordering::Acquire)
    }
}

impl MemoryBroker {
    async fn deliver(&self, message: RawMessage) -> usize {
        let senders = self
            .routes
            .read()
            .get(message.topic())
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for tx in senders {
            if tx.send(Ok(message.clone())).await.is_ok() {
                delivered += 1;
            }
        }

        if let Some(senders) = self.routes.write().get_mut(message.topic()) {
            senders.retain(|tx| !tx.is_closed());
        }

        tracing::trace!(topic = %message.topic(), delivered, "Loopback message delivered");
        delivered
    }
}

impl Transport for MemoryTransport {
    type Handle = MemoryHandle;

    async fn connect(&self) -> Result<MemoryHandle, ProtocolError> {
        let gate = self.inner.connect_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(reason) = self.inner.connect_failure.lock().clone() {
            return Err(ProtocolError::ConnectionFailed(reason));
        }

        self.inner.connects.fetch_add(1, Ordering::AcqRel);
        self.inner.connected.store(true, Ordering::Release);

        Ok(MemoryHandle {
            broker: Arc::clone(&self.inner),
            released: AtomicBool::new(false),
        })
    }
}

/// Session on a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryHandle {
    broker: Arc<MemoryBroker>,
    released: AtomicBool,
}

impl MemoryHandle {
    fn ensure_open(&self) -> Result<(), ProtocolError> {
        if self.released.load(Ordering::Acquire) {
            return Err(ProtocolError::ChannelClosed("session released".to_string()));
        }
        Ok(())
    }
}

impl TransportHandle for MemoryHandle {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, ProtocolError> {
        self.ensure_open()?;
        if self.broker.subscribe_stalled.load(Ordering::Acquire) {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = self.broker.subscribe_failure.lock().clone() {
            return Err(ProtocolError::SubscribeFailed {
                topic: topic.to_string(),
                message: reason,
            });
        }

        let (tx, subscription) = Subscription::channel(topic);
        self.broker
            .routes
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(subscription)
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        self.ensure_open()?;
        if let Some(reason) = self.broker.publish_failure.lock().clone() {
            return Err(ProtocolError::ConnectionFailed(reason));
        }

        let message = RawMessage::new(topic, payload);
        self.broker.published.lock().push(message.clone());
        self.broker.deliver(message).await;
        Ok(())
    }

    async fn disconnect(&self) {
        self.broker.disconnect_calls.fetch_add(1, Ordering::AcqRel);
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        self.broker.routes.write().clear();
        self.broker.connected.store(false, Ordering::Release);
    }
}
