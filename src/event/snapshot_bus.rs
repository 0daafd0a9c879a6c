// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for device snapshots.

use tokio::sync::broadcast;

use crate::state::DeviceState;

/// Default channel capacity for the snapshot bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Bus broadcasting snapshots to any number of consumers.
///
/// # Capacity
///
/// A consumer that falls more than `capacity` snapshots behind loses the
/// oldest ones and receives `RecvError::Lagged`. The stream ends with
/// `RecvError::Closed` once every clone of the bus has been dropped.
#[derive(Debug, Clone)]
pub struct SnapshotBus {
    sender: broadcast::Sender<DeviceState>,
}

impl SnapshotBus {
    /// Creates a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new bus with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns a receiver for every snapshot published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceState> {
        self.sender.subscribe()
    }

    /// Returns a receiver whose stream has already ended.
    ///
    /// Handed out to consumers that attach after the session was closed.
    #[must_use]
    pub fn closed_receiver() -> broadcast::Receiver<DeviceState> {
        let (_, receiver) = broadcast::channel(1);
        receiver
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes a snapshot to all subscribers.
    ///
    /// Returns the number of subscribers that received it; a snapshot
    /// published with nobody listening is discarded.
    pub fn publish(&self, snapshot: DeviceState) -> usize {
        self.sender.send(snapshot).unwrap_or(0)
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use crate::types::StatusCode;

    #[test]
    fn new_bus_has_no_subscribers() {
        assert_eq!(SnapshotBus::new().subscriber_count(), 0);
    }

    #[test]
    fn drop_subscriber_decrements_count() {
        let bus = SnapshotBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn publish_delivers_to_every_subscriber_in_order() {
        let bus = SnapshotBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let first = DeviceState::new().with_current_temperature(38.5);
        let second = first.with_status(StatusCode::Running);
        assert_eq!(bus.publish(first), 2);
        assert_eq!(bus.publish(second), 2);

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap(), first);
            assert_eq!(rx.recv().await.unwrap(), second);
        }
    }

    #[test]
    fn publish_without_subscribers_returns_zero() {
        assert_eq!(SnapshotBus::new().publish(DeviceState::new()), 0);
    }

    #[tokio::test]
    async fn dropping_every_clone_closes_stream() {
        let bus = SnapshotBus::new();
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        drop(bus);
        clone.publish(DeviceState::new());
        drop(clone);

        assert_eq!(rx.recv().await.unwrap(), DeviceState::new());
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn closed_receiver_ends_immediately() {
        let mut rx = SnapshotBus::closed_receiver();
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = SnapshotBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for hour in 0..4 {
            bus.publish(DeviceState::new().with_fermentation_time(hour));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
    }
}
