// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot distribution to consumers.
//!
//! The [`SnapshotBus`] uses tokio's broadcast channel so every consumer gets
//! every snapshot in the order the client emitted it. [`SessionId`] tags a
//! client session in logs.
//!
//! # Examples
//!
//! ```
//! use yogurt_sync::event::SnapshotBus;
//! use yogurt_sync::state::DeviceState;
//!
//! let bus = SnapshotBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DeviceState::new().with_current_temperature(38.5));
//! ```

mod session_id;
mod snapshot_bus;

pub use session_id::SessionId;
pub use snapshot_bus::{DEFAULT_CHANNEL_CAPACITY, SnapshotBus};
