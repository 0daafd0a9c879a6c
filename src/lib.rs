// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `yogurt_sync` - keeps a local copy of a yogurt maker's state in sync over
//! publish/subscribe messaging.
//!
//! The device reports its temperature and status on two topics and accepts
//! start/stop commands on a third. A [`SyncClient`] subscribes to the inbound
//! topics, folds every message into an immutable [`DeviceState`] snapshot and
//! broadcasts each new snapshot to any number of consumers.
//!
//! # Topics
//!
//! | Topic                | Direction | Payload                          |
//! |----------------------|-----------|----------------------------------|
//! | `yogurt/temperature` | inbound   | decimal number, e.g. `38.5`      |
//! | `yogurt/status`      | inbound   | status code, e.g. `RUNNING`      |
//! | `yogurt/command`     | outbound  | `START,<target>,<hours>` or `STOP` |
//!
//! # Transports
//!
//! - [`protocol::MqttTransport`] (feature `mqtt`, enabled by default)
//! - [`protocol::MemoryTransport`] - in-process loopback for tests and demos
//!
//! # Quick Start
//!
//! ```no_run
//! use yogurt_sync::SyncClient;
//! use yogurt_sync::protocol::{MqttConfig, MqttTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MqttConfig::builder()
//!         .broker("mqtt://192.168.1.50:1883")
//!         .build()?;
//!
//!     let client = SyncClient::new(MqttTransport::new(config));
//!     let mut snapshots = client.subscribe();
//!     client.start().await?;
//!
//!     client.start_process(42.0, 8).await?;
//!
//!     while let Ok(state) = snapshots.recv().await {
//!         println!("{state:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Without a broker
//!
//! ```
//! use yogurt_sync::{StatusCode, SyncClient, topic};
//! use yogurt_sync::protocol::MemoryTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> yogurt_sync::Result<()> {
//! let transport = MemoryTransport::new();
//! let client = SyncClient::new(transport.clone());
//! let mut snapshots = client.subscribe();
//! client.start().await?;
//!
//! transport.inject(topic::STATUS, "RUNNING").await;
//! let state = snapshots.recv().await.unwrap();
//! assert_eq!(state.status(), StatusCode::Running);
//!
//! client.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod telemetry;
pub mod topic;
pub mod types;

pub use client::{SessionState, SnapshotReceiver, SyncClient, SyncClientBuilder};
pub use command::Command;
pub use error::{Error, ProtocolError, Result, ValueError};
pub use event::{SessionId, SnapshotBus};
pub use protocol::{MemoryTransport, RawMessage, Subscription, Transport, TransportHandle};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttConfig, MqttConfigBuilder, MqttTransport};
pub use state::{DeviceState, StateDelta};
pub use types::StatusCode;
