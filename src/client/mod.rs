// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-state synchronization client.
//!
//! A [`SyncClient`] owns one session with the yogurt maker: it connects the
//! transport, subscribes to the temperature and status topics, folds every
//! decoded message into the current [`DeviceState`] and broadcasts each new
//! snapshot. It also publishes start and stop commands.
//!
//! # Consuming snapshots
//!
//! - [`SyncClient::subscribe`] - every snapshot, in emission order, until the
//!   session ends
//! - [`SyncClient::watch_state`] / [`SyncClient::state`] - latest snapshot only
//! - [`SyncClient::watch_session`] - lifecycle, including the error that ended
//!   the session
//!
//! # Examples
//!
//! ```no_run
//! use yogurt_sync::SyncClient;
//! use yogurt_sync::protocol::{MqttConfig, MqttTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MqttConfig::builder()
//!     .broker("tcp://192.168.1.50:1883")
//!     .build()?;
//!
//! let client = SyncClient::new(MqttTransport::new(config));
//! let mut snapshots = client.subscribe();
//! client.start().await?;
//!
//! client.start_process(42.0, 8).await?;
//! while let Ok(state) = snapshots.recv().await {
//!     println!("{:.1} °C, {}", state.current_temperature(), state.status());
//! }
//! # Ok(())
//! # }
//! ```

mod receiver;
mod session;
mod shared;
mod worker;

pub use receiver::SnapshotReceiver;
pub use session::SessionState;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::command::Command;
use crate::error::{Error, ProtocolError, Result, ValueError};
use crate::event::{DEFAULT_CHANNEL_CAPACITY, SessionId, SnapshotBus};
use crate::protocol::{Subscription, Transport, TransportHandle};
use crate::state::DeviceState;
use crate::topic;

use shared::Shared;
use worker::Worker;

/// Synchronization client for one device session.
///
/// The client is an explicit object owned by its creator; share it behind an
/// `Arc` when several tasks need it. All methods take `&self`.
pub struct SyncClient<T: Transport> {
    transport: T,
    shared: Arc<Shared<T::Handle>>,
    worker: Mutex<Option<Worker>>,
}

impl<T: Transport> SyncClient<T> {
    /// Creates a client with default settings.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    /// Creates a builder for a client using `transport`.
    #[must_use]
    pub fn builder(transport: T) -> SyncClientBuilder<T> {
        SyncClientBuilder::new(transport)
    }

    /// Returns the session identifier used in log records.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.shared.state()
    }

    /// Returns a receiver that always holds the latest snapshot.
    ///
    /// Its `changed()` fails once the session has ended; `borrow()` still
    /// returns the last snapshot.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.shared.watch_state()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.shared.session_state()
    }

    /// Returns a receiver for lifecycle changes.
    #[must_use]
    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.shared.watch_session()
    }

    /// Subscribes to snapshots.
    ///
    /// The receiver gets every snapshot emitted after this call and reports
    /// `RecvError::Closed` once the session has ended, including for snapshots
    /// it had not read yet. A receiver obtained after the session ended is
    /// closed from the start.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.shared.subscribe()
    }

    /// Starts the session.
    ///
    /// Connects the transport, subscribes to the temperature and status
    /// topics and spawns the task that applies incoming updates. Can only be
    /// called once; the client never reconnects on its own.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the session was already started or stopped
    /// - [`Error::Connect`] if the transport cannot establish a session
    /// - [`Error::Subscribe`] if a topic subscription is refused
    ///
    /// On error the session is `Disconnected` and any acquired transport
    /// handle has been released. The same holds if the returned future is
    /// dropped before it completes.
    pub async fn start(&self) -> Result<()> {
        if !self
            .shared
            .transition(&SessionState::Idle, SessionState::Connecting)
        {
            return Err(Error::InvalidState(self.session_state()));
        }
        let guard = StartGuard::new(&self.shared);

        let session = self.shared.session_id;
        tracing::info!(session = %session, "Connecting session");

        let handle = match self.transport.connect().await {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                tracing::error!(session = %session, error = %e, "Connection failed");
                self.shared.close(Some(e.to_string()));
                return Err(Error::Connect(e));
            }
        };

        // From here on `stop()` can see and release the handle.
        self.shared.attach(Arc::clone(&handle));

        let (temperature, status) = match subscribe_inbound(&*handle).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                self.shared.close(Some(e.to_string()));
                self.shared.release().await;
                return Err(Error::Subscribe(e));
            }
        };

        let started = {
            let mut worker = self.worker.lock();
            let connected = self
                .shared
                .transition(&SessionState::Connecting, SessionState::Connected);
            if connected {
                *worker = Some(Worker::spawn(Arc::clone(&self.shared), temperature, status));
            }
            connected
        };

        if !started {
            // Stopped while connecting.
            self.shared.release().await;
            return Err(Error::InvalidState(self.session_state()));
        }

        guard.disarm();
        tracing::info!(session = %session, "Session connected");
        Ok(())
    }

    /// Asks the device to start fermenting.
    ///
    /// Publishes `START,<target_temperature>,<fermentation_hours>` on the
    /// command topic. The local snapshot is left alone: it only changes when
    /// the device reports its new status.
    ///
    /// # Errors
    ///
    /// - [`Error::Value`] if `target_temperature` is not finite
    /// - [`Error::NotConnected`] if the session is not connected
    /// - [`Error::Publish`] if the transport rejects the message
    pub async fn start_process(&self, target_temperature: f32, fermentation_hours: u32) -> Result<()> {
        self.send_command(Command::start(target_temperature, fermentation_hours))
            .await
    }

    /// Asks the device to stop.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not connected
    /// - [`Error::Publish`] if the transport rejects the message
    pub async fn stop_process(&self) -> Result<()> {
        self.send_command(Command::Stop).await
    }

    /// Publishes a command on the command topic.
    ///
    /// Failed publishes are not retried.
    ///
    /// # Errors
    ///
    /// See [`start_process`](Self::start_process).
    pub async fn send_command(&self, command: Command) -> Result<()> {
        if let Command::Start {
            target_temperature, ..
        } = command
            && !target_temperature.is_finite()
        {
            return Err(ValueError::InvalidTemperature(target_temperature.to_string()).into());
        }

        let handle = self.shared.connected_handle().ok_or(Error::NotConnected)?;
        let payload = command.payload();

        handle
            .publish(command.topic(), payload.clone().into_bytes())
            .await
            .map_err(|e| {
                tracing::warn!(
                    session = %self.shared.session_id,
                    command = %payload,
                    error = %e,
                    "Command not sent"
                );
                Error::Publish(e)
            })?;

        tracing::debug!(session = %self.shared.session_id, command = %payload, "Command sent");
        Ok(())
    }

    /// Stops the session.
    ///
    /// Ends every snapshot stream, stops the background task and releases the
    /// transport handle. Reachable from any state; calling it again does
    /// nothing.
    pub async fn stop(&self) {
        self.shared.close(None);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.shutdown().await;
        }

        self.shared.release().await;
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for SyncClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("session_id", &self.shared.session_id)
            .field("transport", &self.transport)
            .field("session", &self.shared.session_state())
            .finish_non_exhaustive()
    }
}

/// Ends the session if `start()` is dropped before reaching `Connected`.
///
/// Error paths inside `start()` close and release on their own, which leaves
/// nothing for the guard to do.
struct StartGuard<'a, H: TransportHandle> {
    shared: &'a Shared<H>,
    armed: bool,
}

impl<'a, H: TransportHandle> StartGuard<'a, H> {
    fn new(shared: &'a Shared<H>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<H: TransportHandle> Drop for StartGuard<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.close(Some("start cancelled".to_string()));
            self.shared.release_detached();
        }
    }
}

/// Subscribes to both inbound topics.
async fn subscribe_inbound<H: TransportHandle>(
    handle: &H,
) -> std::result::Result<(Subscription, Subscription), ProtocolError> {
    let temperature = handle.subscribe(topic::TEMPERATURE).await?;
    let status = handle.subscribe(topic::STATUS).await?;
    Ok((temperature, status))
}

/// Builder for [`SyncClient`].
#[derive(Debug)]
pub struct SyncClientBuilder<T> {
    transport: T,
    channel_capacity: usize,
}

impl<T: Transport> SyncClientBuilder<T> {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Sets how many snapshots a slow consumer may fall behind before it
    /// starts losing the oldest ones (default: 64, minimum: 1).
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Builds the client. Nothing is connected until [`SyncClient::start`].
    #[must_use]
    pub fn build(self) -> SyncClient<T> {
        let bus = SnapshotBus::with_capacity(self.channel_capacity);
        SyncClient {
            transport: self.transport,
            shared: Arc::new(Shared::new(SessionId::new(), bus)),
            worker: Mutex::new(None),
        }
    }
}
