// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consumer end of the snapshot stream.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::watch;

use crate::state::DeviceState;

use super::SessionState;

/// Receives every snapshot emitted by a [`SyncClient`](super::SyncClient).
///
/// Behaves like a `broadcast::Receiver` except that the stream ends as soon
/// as the session ends: snapshots still buffered when the session stops are
/// discarded and `recv` reports `RecvError::Closed`.
#[derive(Debug)]
pub struct SnapshotReceiver {
    rx: broadcast::Receiver<DeviceState>,
    session: watch::Receiver<SessionState>,
}

impl SnapshotReceiver {
    pub(crate) fn new(
        rx: broadcast::Receiver<DeviceState>,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        Self { rx, session }
    }

    /// Waits for the next snapshot.
    ///
    /// # Errors
    ///
    /// - `RecvError::Lagged(n)` if this receiver fell `n` snapshots behind;
    ///   the next call returns the oldest snapshot still buffered
    /// - `RecvError::Closed` once the session has ended
    pub async fn recv(&mut self) -> Result<DeviceState, RecvError> {
        let item = self.rx.recv().await;
        if self.is_closed() {
            return Err(RecvError::Closed);
        }
        item
    }

    /// Returns the next snapshot if one is already buffered.
    ///
    /// # Errors
    ///
    /// Same as [`recv`](Self::recv), plus `TryRecvError::Empty` when nothing
    /// is buffered.
    pub fn try_recv(&mut self) -> Result<DeviceState, TryRecvError> {
        let item = self.rx.try_recv();
        if self.is_closed() {
            return Err(TryRecvError::Closed);
        }
        item
    }

    /// Returns `true` once the session has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.session.borrow().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SnapshotBus;

    fn receiver() -> (SnapshotBus, watch::Sender<SessionState>, SnapshotReceiver) {
        let bus = SnapshotBus::new();
        let (session, session_rx) = watch::channel(SessionState::Connected);
        let rx = SnapshotReceiver::new(bus.subscribe(), session_rx);
        (bus, session, rx)
    }

    #[tokio::test]
    async fn yields_snapshots_while_session_runs() {
        let (bus, _session, mut rx) = receiver();
        let state = DeviceState::new().with_current_temperature(40.5);

        bus.publish(state);

        assert_eq!(rx.recv().await.unwrap(), state);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn buffered_snapshots_are_dropped_once_session_ends() {
        let (bus, session, mut rx) = receiver();
        bus.publish(DeviceState::new());
        bus.publish(DeviceState::new().with_fermentation_time(10));

        session.send_replace(SessionState::Disconnected { error: None });

        assert!(rx.is_closed());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }
}
