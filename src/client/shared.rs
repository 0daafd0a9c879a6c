// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared between the client and its background task.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::event::{SessionId, SnapshotBus};
use crate::protocol::{RawMessage, TransportHandle};
use crate::state::DeviceState;
use crate::telemetry;

use super::{SessionState, SnapshotReceiver};

/// Session resources shared by [`SyncClient`](super::SyncClient) and its worker.
///
/// The worker is the only writer of the snapshot. Closing empties the bus and
/// the snapshot sender: no snapshot is published afterwards and every
/// consumer stream ends, while `latest` keeps the last value readable.
pub(crate) struct Shared<H: TransportHandle> {
    pub(crate) session_id: SessionId,
    handle: Mutex<Option<Arc<H>>>,
    bus: Mutex<Option<SnapshotBus>>,
    snapshot: Mutex<Option<watch::Sender<DeviceState>>>,
    latest: watch::Receiver<DeviceState>,
    session: watch::Sender<SessionState>,
}

impl<H: TransportHandle> Shared<H> {
    pub(crate) fn new(session_id: SessionId, bus: SnapshotBus) -> Self {
        let (snapshot, latest) = watch::channel(DeviceState::new());
        let (session, _) = watch::channel(SessionState::Idle);
        Self {
            session_id,
            handle: Mutex::new(None),
            bus: Mutex::new(Some(bus)),
            snapshot: Mutex::new(Some(snapshot)),
            latest,
            session,
        }
    }

    pub(crate) fn state(&self) -> DeviceState {
        *self.latest.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<DeviceState> {
        match &*self.snapshot.lock() {
            Some(sender) => sender.subscribe(),
            None => {
                let mut rx = self.latest.clone();
                let _ = rx.borrow_and_update();
                rx
            }
        }
    }

    pub(crate) fn session_state(&self) -> SessionState {
        self.session.borrow().clone()
    }

    pub(crate) fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub(crate) fn subscribe(&self) -> SnapshotReceiver {
        let rx = self
            .bus
            .lock()
            .as_ref()
            .map_or_else(SnapshotBus::closed_receiver, SnapshotBus::subscribe);
        SnapshotReceiver::new(rx, self.session.subscribe())
    }

    /// Moves the session from `from` to `to`.
    ///
    /// Returns `false`, leaving the state untouched, if the session was not in
    /// `from`.
    pub(crate) fn transition(&self, from: &SessionState, to: SessionState) -> bool {
        self.session.send_if_modified(|state| {
            if *state == *from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn attach(&self, handle: Arc<H>) {
        *self.handle.lock() = Some(handle);
    }

    /// Returns the transport handle if commands may be published.
    pub(crate) fn connected_handle(&self) -> Option<Arc<H>> {
        if !self.session.borrow().is_connected() {
            return None;
        }
        self.handle.lock().clone()
    }

    /// Decodes a message and, if it carries state, emits the next snapshot.
    pub(crate) fn apply(&self, message: &RawMessage) -> Option<DeviceState> {
        let delta = telemetry::decode(message.topic(), message.payload());
        if !delta.is_recognized() {
            return None;
        }

        // Hold the bus slot so closing cannot interleave with an emission.
        let bus = self.bus.lock();
        let bus = bus.as_ref()?;
        if self.session.borrow().is_terminal() {
            return None;
        }

        let next = {
            let snapshot = self.snapshot.lock();
            let sender = snapshot.as_ref()?;
            let mut next = DeviceState::new();
            sender.send_modify(|state| {
                *state = state.apply(&delta);
                next = *state;
            });
            next
        };

        let receivers = bus.publish(next);
        tracing::debug!(
            session = %self.session_id,
            topic = %message.topic(),
            ?delta,
            receivers,
            "Snapshot updated"
        );
        Some(next)
    }

    /// Ends the session and closes every consumer stream.
    ///
    /// The first recorded error wins; later calls only make sure the streams
    /// are closed.
    pub(crate) fn close(&self, error: Option<String>) {
        let changed = self.session.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = SessionState::Disconnected {
                    error: error.clone(),
                };
                true
            }
        });

        drop(self.bus.lock().take());
        drop(self.snapshot.lock().take());

        if changed {
            match &error {
                Some(e) => tracing::warn!(session = %self.session_id, error = %e, "Session ended"),
                None => tracing::info!(session = %self.session_id, "Session stopped"),
            }
        }
    }

    /// Releases the transport handle. Only the first call reaches the transport.
    pub(crate) async fn release(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.disconnect().await;
            tracing::debug!(session = %self.session_id, "Transport handle released");
        }
    }

    /// Releases the transport handle from a context that cannot await.
    ///
    /// The disconnect runs on a spawned task.
    pub(crate) fn release_detached(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let session = self.session_id;
                runtime.spawn(async move {
                    handle.disconnect().await;
                    tracing::debug!(session = %session, "Transport handle released");
                });
            }
            Err(_) => {
                tracing::warn!(
                    session = %self.session_id,
                    "No runtime to release transport handle, dropping it"
                );
            }
        }
    }
}

impl<H: TransportHandle> Drop for Shared<H> {
    fn drop(&mut self) {
        self.release_detached();
    }
}
