// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshots and the deltas that replace them.
//!
//! A [`DeviceState`] is an immutable, fully populated snapshot. Each decoded
//! inbound message becomes a [`StateDelta`], and applying a delta yields a new
//! snapshot that differs from the previous one only in the field the delta
//! names.
//!
//! # Examples
//!
//! ```
//! use yogurt_sync::state::{DeviceState, StateDelta};
//! use yogurt_sync::types::StatusCode;
//!
//! let state = DeviceState::new();
//! let next = state.apply(&StateDelta::TemperatureUpdate(38.5));
//! let next = next.apply(&StateDelta::StatusUpdate(StatusCode::Running));
//!
//! assert_eq!(next.current_temperature(), 38.5);
//! assert_eq!(next.status(), StatusCode::Running);
//! assert_eq!(state, DeviceState::default());
//! ```

mod device_state;
mod state_delta;

pub use device_state::DeviceState;
pub use state_delta::StateDelta;
